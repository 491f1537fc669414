use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-side public metadata. Also the shape of the `metadata` session claim.
///
/// Keys this service does not know about are not retained; writing this object back
/// replaces the provider's copy wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_synced: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
    pub verified: bool,
}

impl EmailAddress {
    pub fn verified(address: impl Into<String>) -> Self {
        Self {
            email_address: address.into(),
            verified: true,
        }
    }

    pub fn unverified(address: impl Into<String>) -> Self {
        Self {
            email_address: address.into(),
            verified: false,
        }
    }
}

/// The signed-in user as the provider knows them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email_addresses: Vec<EmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub public_metadata: PublicMetadata,
}

/// Used when neither first nor last name is set
pub const PLACEHOLDER_NAME: &str = "User";

impl Identity {
    /// First verified address, or "" when there is none
    pub fn primary_email(&self) -> &str {
        self.email_addresses
            .iter()
            .find(|e| e.verified)
            .map(|e| e.email_address.as_str())
            .unwrap_or("")
    }

    /// "first last" trimmed, falling back to [`PLACEHOLDER_NAME`]
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let trimmed = full.trim();
        if trimmed.is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected identity provider payload: {0}")]
    Decode(String),
}

/// Pass-through to the hosted identity provider. No retries, no caching.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the provider does not know the subject
    async fn current_identity(&self, user_id: &str) -> Result<Option<Identity>, IdentityError>;

    /// Replace the user's public metadata object with `metadata`
    async fn set_public_metadata(
        &self,
        user_id: &str,
        metadata: &PublicMetadata,
    ) -> Result<(), IdentityError>;

    /// Role from public metadata, verbatim
    async fn read_role(&self, user_id: &str) -> Result<Option<String>, IdentityError> {
        Ok(self
            .current_identity(user_id)
            .await?
            .and_then(|identity| identity.public_metadata.role))
    }
}
