use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::models::user::{NewUser, UserRecord};
use crate::database::users::{log_delete, log_sync, StoreError, UserStore};
use crate::logging::Logger;
use crate::types::{Role, SyncOutcome};

/// In-process store with the same constraints as the `users` table.
///
/// Used when no `DATABASE_URL` is configured in development, and by tests.
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
    logger: Arc<dyn Logger>,
}

impl MemoryUserStore {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            logger,
        }
    }

    /// Seed a row directly, bypassing sync (e.g. an admin with a non-default role)
    pub async fn insert(&self, record: UserRecord) {
        self.users.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    fn email_taken(users: &HashMap<String, UserRecord>, id: &str, email: Option<&str>) -> bool {
        match email {
            Some(email) => users
                .values()
                .any(|u| u.id != id && u.email.as_deref() == Some(email)),
            None => false,
        }
    }

    async fn try_sync(&self, user: &NewUser) -> Result<SyncOutcome, StoreError> {
        let mut users = self.users.write().await;

        if Self::email_taken(&users, &user.id, user.email.as_deref()) {
            return Err(StoreError::Conflict(format!(
                "email already belongs to another user (id {})",
                user.id
            )));
        }

        match users.get_mut(&user.id) {
            Some(existing) => {
                existing.email = user.email.clone();
                existing.name = Some(user.name.clone());
                existing.avatar = user.avatar.clone();
                existing.updated_at = user.updated_at;
                Ok(SyncOutcome::Updated)
            }
            None => {
                users.insert(
                    user.id.clone(),
                    UserRecord {
                        id: user.id.clone(),
                        email: user.email.clone(),
                        name: Some(user.name.clone()),
                        avatar: user.avatar.clone(),
                        role: Role::default().as_str().to_string(),
                        created_at: user.updated_at,
                        updated_at: user.updated_at,
                    },
                );
                Ok(SyncOutcome::Created)
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn sync_user(&self, user: &NewUser) -> Result<SyncOutcome, StoreError> {
        let result = self.try_sync(user).await;
        log_sync(self.logger.as_ref(), &user.id, &result);
        result
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.users.write().await.remove(id);
        let result = Ok(());
        log_delete(self.logger.as_ref(), id, &result);
        result
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
