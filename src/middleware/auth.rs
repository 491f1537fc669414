use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::ApiError;
use crate::identity::{IdentityError, IdentityProvider, Session};
use crate::types::Role;

/// Session placed in request extensions by the access gate.
///
/// Extracting it rejects with 401 when the request carried no valid session.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Like [`AuthSession`] but never rejects
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}

/// Role check against the provider's current metadata, not the session snapshot.
/// A user with no role, or an empty one, counts as `viewer`.
pub async fn has_role(
    provider: &dyn IdentityProvider,
    user_id: &str,
    role: Role,
) -> Result<bool, IdentityError> {
    let current = provider.read_role(user_id).await?;
    let current = current
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(Role::default().as_str());
    Ok(current == role.as_str())
}

pub async fn is_admin(provider: &dyn IdentityProvider, user_id: &str) -> Result<bool, IdentityError> {
    has_role(provider, user_id, Role::Admin).await
}
