use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row in the local `users` mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    /// Identity-provider subject id
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a sync. `role` is applied on insert only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub avatar: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl NewUser {
    /// Empty strings are stored as NULL so `email UNIQUE` only binds real addresses
    pub fn new(
        id: impl Into<String>,
        email: &str,
        name: impl Into<String>,
        avatar: &str,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            email: present(email),
            name: name.into(),
            avatar: present(avatar),
            updated_at,
        }
    }
}

fn present(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_and_avatar_become_none() {
        let user = NewUser::new("u1", "", "User", "  ", Utc::now());
        assert_eq!(user.email, None);
        assert_eq!(user.avatar, None);
    }

    #[test]
    fn present_values_are_kept_verbatim() {
        let user = NewUser::new("u1", "a@x.com", "Ann", "https://img/x.png", Utc::now());
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert_eq!(user.avatar.as_deref(), Some("https://img/x.png"));
    }
}
