//! Test doubles and fixtures shared by unit and integration tests

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::{MemoryUserStore, NewUser, StoreError, UserRecord, UserStore};
use crate::identity::{
    Identity, IdentityError, IdentityProvider, PublicMetadata, Session, SessionClaims,
    SessionVerifier,
};
use crate::logging::Logger;
use crate::types::SyncOutcome;

pub const TEST_SESSION_SECRET: &str = "test-session-secret";
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
    pub data: Option<Value>,
}

/// Keeps every log call for assertions
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, level: &str, message: &str, data: Option<&Value>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level: level.to_string(),
                message: message.to_string(),
                data: data.cloned(),
            });
        }
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str, data: Option<&Value>) {
        self.record("info", message, data);
    }

    fn warn(&self, message: &str, data: Option<&Value>) {
        self.record("warn", message, data);
    }

    fn error(&self, message: &str, data: Option<&Value>) {
        self.record("error", message, data);
    }

    fn debug(&self, message: &str, data: Option<&Value>) {
        self.record("debug", message, data);
    }
}

/// In-memory identity provider. Metadata writes replace the stored identity's
/// public metadata, matching the real provider.
#[derive(Debug, Default)]
pub struct FakeIdentityProvider {
    identities: RwLock<HashMap<String, Identity>>,
    writes: RwLock<Vec<(String, PublicMetadata)>>,
    fail_writes: AtomicBool,
}

impl FakeIdentityProvider {
    pub async fn add(&self, identity: Identity) {
        self.identities.write().await.insert(identity.id.clone(), identity);
    }

    pub async fn metadata_writes(&self) -> Vec<(String, PublicMetadata)> {
        self.writes.read().await.clone()
    }

    pub fn fail_metadata_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn current_identity(&self, user_id: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.identities.read().await.get(user_id).cloned())
    }

    async fn set_public_metadata(
        &self,
        user_id: &str,
        metadata: &PublicMetadata,
    ) -> Result<(), IdentityError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(IdentityError::Status {
                status: 500,
                body: "metadata write failed".to_string(),
            });
        }

        let mut identities = self.identities.write().await;
        let identity = identities.get_mut(user_id).ok_or_else(|| IdentityError::Status {
            status: 404,
            body: format!("no user {}", user_id),
        })?;
        identity.public_metadata = metadata.clone();

        self.writes
            .write()
            .await
            .push((user_id.to_string(), metadata.clone()));
        Ok(())
    }
}

/// Store whose every call fails as if the database were down
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingUserStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl UserStore for FailingUserStore {
    async fn sync_user(&self, _user: &NewUser) -> Result<SyncOutcome, StoreError> {
        Err(unavailable())
    }

    async fn delete_user(&self, _id: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn find_user(&self, _id: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(unavailable())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

/// Claims valid for an hour
pub fn claims_for(user_id: &str, role: Option<&str>, onboarding_complete: bool) -> SessionClaims {
    let now = chrono::Utc::now().timestamp();
    SessionClaims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
        metadata: PublicMetadata {
            role: role.map(str::to_string),
            onboarding_complete: onboarding_complete.then_some(true),
            db_synced: onboarding_complete.then_some(true),
        },
    }
}

pub fn session_for(user_id: &str, role: Option<&str>) -> Session {
    Session::from(claims_for(user_id, role, false))
}

/// HS256 token under [`TEST_SESSION_SECRET`]
pub fn mint_token(claims: &SessionClaims) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes()),
    )
    .unwrap_or_default()
}

/// Development config with test session and webhook secrets
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.identity.jwt_secret = Some(TEST_SESSION_SECRET.to_string());
    config.identity.webhook_secret = Some(TEST_WEBHOOK_SECRET.to_string());
    config
}

pub fn identity(id: &str, email: &str, first_name: &str, role: Option<&str>) -> Identity {
    Identity {
        id: id.to_string(),
        email_addresses: vec![crate::identity::EmailAddress::verified(email)],
        first_name: Some(first_name.to_string()),
        last_name: None,
        image_url: format!("https://img.example.com/{}.png", id),
        public_metadata: PublicMetadata {
            role: role.map(str::to_string),
            ..Default::default()
        },
    }
}

/// Full application over in-memory collaborators
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryUserStore>,
    pub identity: Arc<FakeIdentityProvider>,
    pub logger: Arc<RecordingLogger>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let logger = Arc::new(RecordingLogger::default());
        let store = Arc::new(MemoryUserStore::new(logger.clone()));
        let identity = Arc::new(FakeIdentityProvider::default());
        let sessions = SessionVerifier::hs256(
            TEST_SESSION_SECRET.as_bytes(),
            &config.identity.session_cookie,
        );

        let state = AppState::new(config, store.clone(), identity.clone(), sessions, logger.clone());

        Self {
            state,
            store,
            identity,
            logger,
        }
    }

    /// Same app, but every store call fails
    pub fn with_failing_store() -> Self {
        let app = Self::new();
        let state = AppState::new(
            (*app.state.config).clone(),
            Arc::new(FailingUserStore),
            app.identity.clone(),
            (*app.state.sessions).clone(),
            app.logger.clone(),
        );
        Self { state, ..app }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
