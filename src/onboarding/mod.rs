//! One-time onboarding: mirror the provider's user into `users`, then flag
//! completion in the provider's public metadata.

pub mod revalidate;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::database::{NewUser, StoreError, UserStore};
use crate::identity::{Identity, IdentityError, IdentityProvider, PublicMetadata, Session};
use crate::logging::{error_data, Logger};

pub use revalidate::{PathGenerations, Revalidator};

/// What the caller learns about a failed onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingError {
    NotAuthenticated,
    Internal,
}

impl OnboardingError {
    pub fn message(&self) -> &'static str {
        match self {
            OnboardingError::NotAuthenticated => "Not authenticated",
            OnboardingError::Internal => "Internal server error",
        }
    }
}

pub type OnboardingResult = Result<(), OnboardingError>;

/// Wire shape: `{"success": true}` or `{"success": false, "error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<OnboardingResult> for OnboardingResponse {
    fn from(result: OnboardingResult) -> Self {
        match result {
            Ok(()) => Self { success: true, error: None },
            Err(e) => Self {
                success: false,
                error: Some(e.message().to_string()),
            },
        }
    }
}

/// Internal causes; logged, never returned
#[derive(Debug, Error)]
enum StepError {
    #[error("identity not found")]
    UnknownIdentity,

    #[error("Failed to sync user to database: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to update identity metadata: {0}")]
    Identity(#[from] IdentityError),
}

/// Local row for an identity, stamped now
pub fn user_record(identity: &Identity) -> NewUser {
    NewUser::new(
        identity.id.clone(),
        identity.primary_email(),
        identity.display_name(),
        &identity.image_url,
        Utc::now(),
    )
}

pub struct OnboardingService {
    store: Arc<dyn UserStore>,
    identity: Arc<dyn IdentityProvider>,
    revalidator: Arc<dyn Revalidator>,
    logger: Arc<dyn Logger>,
    dashboard_path: String,
}

impl OnboardingService {
    pub fn new(
        store: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        revalidator: Arc<dyn Revalidator>,
        logger: Arc<dyn Logger>,
        dashboard_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            revalidator,
            logger,
            dashboard_path: dashboard_path.into(),
        }
    }

    /// Sync the session's user, flag metadata, revalidate the dashboard.
    ///
    /// Steps run strictly in order with no rollback: a metadata failure leaves the
    /// synced row in place. Repeating the call converges on the same state.
    pub async fn complete_onboarding(&self, session: Option<&Session>) -> OnboardingResult {
        let Some(session) = session else {
            return Err(OnboardingError::NotAuthenticated);
        };

        match self.run(session).await {
            Ok(()) => {
                self.logger.info(
                    "Onboarding completed successfully",
                    Some(&json!({ "userId": session.user_id })),
                );
                Ok(())
            }
            Err(StepError::UnknownIdentity) => {
                self.logger.warn(
                    "Onboarding requested for unknown identity",
                    Some(&json!({ "userId": session.user_id })),
                );
                Err(OnboardingError::NotAuthenticated)
            }
            Err(e) => {
                self.logger.error("Error during onboarding completion", Some(&error_data(&e)));
                Err(OnboardingError::Internal)
            }
        }
    }

    async fn run(&self, session: &Session) -> Result<(), StepError> {
        let identity = self
            .identity
            .current_identity(&session.user_id)
            .await?
            .ok_or(StepError::UnknownIdentity)?;

        self.store.sync_user(&user_record(&identity)).await?;

        // Replace semantics: only the keys below survive, so the role is carried forward
        let metadata = PublicMetadata {
            role: identity.public_metadata.role.clone(),
            onboarding_complete: Some(true),
            db_synced: Some(true),
        };
        self.identity.set_public_metadata(&identity.id, &metadata).await?;

        self.revalidator.revalidate_path(&self.dashboard_path);
        self.logger.debug(
            "Revalidated path",
            Some(&json!({ "path": self.dashboard_path })),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::identity::EmailAddress;
    use crate::database::UserRecord;
    use crate::testing::{session_for, FailingUserStore, FakeIdentityProvider, RecordingLogger};
    use crate::types::SyncOutcome;

    /// Every sync loses a race with a concurrent insert of the same id
    struct ConflictingUserStore;

    #[async_trait::async_trait]
    impl UserStore for ConflictingUserStore {
        async fn sync_user(&self, _user: &NewUser) -> Result<SyncOutcome, StoreError> {
            Err(StoreError::Conflict(
                "duplicate key value violates unique constraint \"users_pkey\"".to_string(),
            ))
        }

        async fn delete_user(&self, _id: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn find_user(&self, _id: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(None)
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Harness {
        store: Arc<MemoryUserStore>,
        identity: Arc<FakeIdentityProvider>,
        revalidator: Arc<PathGenerations>,
        logger: Arc<RecordingLogger>,
    }

    impl Harness {
        fn new() -> Self {
            let logger = Arc::new(RecordingLogger::default());
            Self {
                store: Arc::new(MemoryUserStore::new(logger.clone())),
                identity: Arc::new(FakeIdentityProvider::default()),
                revalidator: Arc::new(PathGenerations::new()),
                logger,
            }
        }

        fn service(&self) -> OnboardingService {
            self.service_with_store(self.store.clone())
        }

        fn service_with_store(&self, store: Arc<dyn UserStore>) -> OnboardingService {
            OnboardingService::new(
                store,
                self.identity.clone(),
                self.revalidator.clone(),
                self.logger.clone(),
                "/dashboard",
            )
        }
    }

    fn ann() -> Identity {
        Identity {
            id: "u1".to_string(),
            email_addresses: vec![EmailAddress::verified("a@x.com")],
            first_name: Some("Ann".to_string()),
            last_name: Some(String::new()),
            image_url: "https://img.example.com/u1.png".to_string(),
            public_metadata: PublicMetadata::default(),
        }
    }

    #[tokio::test]
    async fn first_onboarding_creates_viewer_and_flags_metadata() {
        let h = Harness::new();
        h.identity.add(ann()).await;

        let result = h.service().complete_onboarding(Some(&session_for("u1", None))).await;
        assert_eq!(result, Ok(()));

        let user = h.store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert_eq!(user.name.as_deref(), Some("Ann"));
        assert_eq!(user.role, "viewer");
        assert_eq!(h.store.len().await, 1);

        assert_eq!(
            h.identity.metadata_writes().await,
            vec![(
                "u1".to_string(),
                PublicMetadata {
                    role: None,
                    onboarding_complete: Some(true),
                    db_synced: Some(true),
                }
            )]
        );
        assert_eq!(h.revalidator.generation("/dashboard"), 1);
    }

    #[tokio::test]
    async fn blank_names_become_placeholder() {
        let h = Harness::new();
        let mut identity = ann();
        identity.first_name = None;
        identity.last_name = Some(String::new());
        h.identity.add(identity).await;

        h.service().complete_onboarding(Some(&session_for("u1", None))).await.unwrap();

        let user = h.store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("User"));
    }

    #[tokio::test]
    async fn repeat_onboarding_refreshes_updated_at_and_keeps_role() {
        let h = Harness::new();
        h.identity.add(ann()).await;
        let service = h.service();
        let session = session_for("u1", None);

        service.complete_onboarding(Some(&session)).await.unwrap();
        let first = h.store.find_user("u1").await.unwrap().unwrap();

        let mut promoted = first.clone();
        promoted.role = "contributor".to_string();
        h.store.insert(promoted).await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.complete_onboarding(Some(&session)).await.unwrap();

        let second = h.store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(second.role, "contributor");
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(h.store.len().await, 1);
        assert_eq!(h.identity.metadata_writes().await.len(), 2);
    }

    #[tokio::test]
    async fn existing_role_is_carried_into_metadata() {
        let h = Harness::new();
        let mut identity = ann();
        identity.public_metadata.role = Some("admin".to_string());
        h.identity.add(identity).await;

        h.service().complete_onboarding(Some(&session_for("u1", Some("admin")))).await.unwrap();

        let (_, written) = h.identity.metadata_writes().await.pop().unwrap();
        assert_eq!(written.role.as_deref(), Some("admin"));
        assert_eq!(written.onboarding_complete, Some(true));
    }

    #[tokio::test]
    async fn store_failure_skips_metadata_write() {
        let h = Harness::new();
        h.identity.add(ann()).await;
        let service = h.service_with_store(Arc::new(FailingUserStore));

        let result = service.complete_onboarding(Some(&session_for("u1", None))).await;

        assert_eq!(result, Err(OnboardingError::Internal));
        assert_eq!(
            OnboardingResponse::from(result),
            OnboardingResponse {
                success: false,
                error: Some("Internal server error".to_string()),
            }
        );
        assert!(h.identity.metadata_writes().await.is_empty());
        assert_eq!(h.revalidator.generation("/dashboard"), 0);
        assert!(h
            .logger
            .entries()
            .iter()
            .any(|e| e.level == "error" && e.message == "Error during onboarding completion"));
    }

    #[tokio::test]
    async fn racing_insert_conflict_is_internal_error() {
        let h = Harness::new();
        h.identity.add(ann()).await;
        let service = h.service_with_store(Arc::new(ConflictingUserStore));

        let result = service.complete_onboarding(Some(&session_for("u1", None))).await;

        assert_eq!(result, Err(OnboardingError::Internal));
        assert_eq!(
            OnboardingResponse::from(result).error.as_deref(),
            Some("Internal server error")
        );
        assert!(h.identity.metadata_writes().await.is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_is_internal_error() {
        let h = Harness::new();
        h.identity.add(ann()).await;
        h.identity.fail_metadata_writes(true);

        let result = h.service().complete_onboarding(Some(&session_for("u1", None))).await;

        assert_eq!(result, Err(OnboardingError::Internal));
        // No rollback of the local row
        assert!(h.store.find_user("u1").await.unwrap().is_some());
        assert_eq!(h.revalidator.generation("/dashboard"), 0);
    }

    #[tokio::test]
    async fn missing_session_is_not_authenticated() {
        let h = Harness::new();
        h.identity.add(ann()).await;

        let result = h.service().complete_onboarding(None).await;

        assert_eq!(result, Err(OnboardingError::NotAuthenticated));
        assert_eq!(
            serde_json::to_value(OnboardingResponse::from(result)).unwrap(),
            json!({ "success": false, "error": "Not authenticated" })
        );
        assert!(h.store.is_empty().await);
        assert!(h.identity.metadata_writes().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_identity_is_not_authenticated() {
        let h = Harness::new();

        let result = h.service().complete_onboarding(Some(&session_for("ghost", None))).await;

        assert_eq!(result, Err(OnboardingError::NotAuthenticated));
        assert!(h.store.is_empty().await);
    }

    #[test]
    fn success_serializes_without_error_key() {
        assert_eq!(
            serde_json::to_value(OnboardingResponse::from(Ok(()))).unwrap(),
            json!({ "success": true })
        );
    }
}
