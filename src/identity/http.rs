use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::identity::provider::{EmailAddress, Identity, IdentityError, IdentityProvider, PublicMetadata};

/// Identity provider reached over its backend REST API
pub struct HttpIdentityProvider {
    client: Client,
    api_url: url::Url,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ProviderEmail>,
    #[serde(default)]
    public_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ProviderEmail {
    email_address: String,
    #[serde(default)]
    verification: Option<ProviderVerification>,
}

#[derive(Debug, Deserialize)]
struct ProviderVerification {
    status: String,
}

impl TryFrom<ProviderUser> for Identity {
    type Error = IdentityError;

    fn try_from(user: ProviderUser) -> Result<Self, Self::Error> {
        let public_metadata = if user.public_metadata.is_null() {
            PublicMetadata::default()
        } else {
            serde_json::from_value(user.public_metadata)
                .map_err(|e| IdentityError::Decode(format!("public_metadata: {}", e)))?
        };

        Ok(Identity {
            id: user.id,
            email_addresses: user
                .email_addresses
                .into_iter()
                .map(|e| EmailAddress {
                    // No verification object means the provider did not require one
                    verified: e.verification.map_or(true, |v| v.status == "verified"),
                    email_address: e.email_address,
                })
                .collect(),
            first_name: user.first_name,
            last_name: user.last_name,
            image_url: user.image_url.unwrap_or_default(),
            public_metadata,
        })
    }
}

/// Decode a provider user object, as carried by the REST API and webhook events
pub fn identity_from_payload(payload: serde_json::Value) -> Result<Identity, IdentityError> {
    let user: ProviderUser =
        serde_json::from_value(payload).map_err(|e| IdentityError::Decode(e.to_string()))?;
    Identity::try_from(user)
}

impl HttpIdentityProvider {
    pub fn new(api_url: &str, secret_key: Option<String>) -> Result<Self, IdentityError> {
        let api_url = url::Url::parse(api_url).map_err(|_| IdentityError::NotConfigured("IDENTITY_API_URL"))?;
        if api_url.cannot_be_a_base() {
            return Err(IdentityError::NotConfigured("IDENTITY_API_URL"));
        }
        Ok(Self {
            client: Client::new(),
            api_url,
            secret_key,
        })
    }

    fn user_url(&self, user_id: &str) -> url::Url {
        let mut url = self.api_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("users").push(user_id);
        }
        url
    }

    fn secret_key(&self) -> Result<&str, IdentityError> {
        self.secret_key
            .as_deref()
            .ok_or(IdentityError::NotConfigured("IDENTITY_SECRET_KEY"))
    }

    async fn error_for(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        IdentityError::Status { status, body }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_identity(&self, user_id: &str) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .get(self.user_url(user_id))
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: ProviderUser = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Decode(e.to_string()))?;
                Identity::try_from(user).map(Some)
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn set_public_metadata(
        &self,
        user_id: &str,
        metadata: &PublicMetadata,
    ) -> Result<(), IdentityError> {
        let response = self
            .client
            .patch(self.user_url(user_id))
            .bearer_auth(self.secret_key()?)
            .json(&json!({ "public_metadata": metadata }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }
}
