use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use crate::database::models::user::{NewUser, UserRecord};
use crate::logging::{error_data, Logger};
use crate::types::{Role, SyncOutcome};

/// Failures at the user-store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; typically a racing insert for the same id
    #[error("Conflicting user record: {0}")]
    Conflict(String),

    #[error("User store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

/// Persistence boundary for the local mirror of identity-provider users
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Update `email/name/avatar/updated_at` when the id exists, otherwise insert
    /// a full row with the default role. Never touches `role` on update.
    async fn sync_user(&self, user: &NewUser) -> Result<SyncOutcome, StoreError>;

    /// Remove the row; a missing row is not an error
    async fn delete_user(&self, id: &str) -> Result<(), StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Shared log lines for every store implementation
pub(crate) fn log_sync(logger: &dyn Logger, id: &str, result: &Result<SyncOutcome, StoreError>) {
    match result {
        Ok(SyncOutcome::Updated) => logger.info("User updated from sync", Some(&json!({ "id": id }))),
        Ok(SyncOutcome::Created) => logger.info("User created from sync", Some(&json!({ "id": id }))),
        Err(e) => logger.error("Error syncing user", Some(&error_data(e))),
    }
}

pub(crate) fn log_delete(logger: &dyn Logger, id: &str, result: &Result<(), StoreError>) {
    match result {
        Ok(()) => logger.info("User deleted from sync", Some(&json!({ "id": id }))),
        Err(e) => logger.error("Error deleting user", Some(&error_data(e))),
    }
}

/// PostgreSQL-backed store over the `users` table
pub struct PgUserStore {
    pool: PgPool,
    logger: Arc<dyn Logger>,
}

impl PgUserStore {
    pub fn new(pool: PgPool, logger: Arc<dyn Logger>) -> Self {
        Self { pool, logger }
    }

    // Existence check and write are separate statements; racing syncs for one id
    // end as last-write-wins or a Conflict from the primary key.
    async fn try_sync(&self, user: &NewUser) -> Result<SyncOutcome, StoreError> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 LIMIT 1")
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            sqlx::query(
                "UPDATE users SET email = $2, name = $3, avatar = $4, updated_at = $5 WHERE id = $1",
            )
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.avatar)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

            Ok(SyncOutcome::Updated)
        } else {
            sqlx::query(
                r#"
                INSERT INTO users (id, email, name, avatar, role, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                "#,
            )
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.avatar)
            .bind(Role::default().as_str())
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

            Ok(SyncOutcome::Created)
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn sync_user(&self, user: &NewUser) -> Result<SyncOutcome, StoreError> {
        let result = self.try_sync(user).await;
        log_sync(self.logger.as_ref(), &user.id, &result);
        result
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::from);
        log_delete(self.logger.as_ref(), id, &result);
        result
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, name, avatar, role, created_at, updated_at
             FROM users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLogger;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;

    /// Database error as Postgres reports a duplicate primary key
    #[derive(Debug)]
    struct UniqueViolation;

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message())
        }
    }

    impl StdError for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"users_pkey\""
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = StoreError::from(sqlx::Error::Database(Box::new(UniqueViolation)));
        match err {
            StoreError::Conflict(msg) => assert!(msg.contains("users_pkey")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn pool_exhaustion_maps_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Sqlx(_)
        ));
    }

    #[test]
    fn sync_failures_log_the_cause() {
        let logger = RecordingLogger::default();
        let result = Err(StoreError::Conflict("users_email_key".to_string()));
        log_sync(&logger, "u1", &result);

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "error");
        assert_eq!(entries[0].message, "Error syncing user");
        let data = entries[0].data.as_ref().unwrap();
        assert!(data["message"].as_str().unwrap().contains("users_email_key"));
    }

    #[test]
    fn sync_success_logs_outcome() {
        let logger = RecordingLogger::default();
        log_sync(&logger, "u1", &Ok(SyncOutcome::Created));
        log_sync(&logger, "u1", &Ok(SyncOutcome::Updated));

        let messages: Vec<_> = logger.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["User created from sync", "User updated from sync"]);
    }
}
