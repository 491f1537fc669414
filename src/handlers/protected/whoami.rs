use serde_json::{json, Value};

use crate::middleware::{ApiResponse, AuthSession};
use crate::types::Role;

/// GET /api/auth/whoami - what the current session token asserts
///
/// Reads claims only; the provider is not consulted.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": { "userId": "user_123", "role": "viewer", "onboardingComplete": true, "dbSynced": true }
/// }
/// ```
pub async fn whoami_get(AuthSession(session): AuthSession) -> ApiResponse<Value> {
    let claims = &session.claims;

    ApiResponse::success(json!({
        "userId": session.user_id,
        "role": claims.role().unwrap_or(Role::default().as_str()),
        "onboardingComplete": claims.onboarding_complete(),
        "dbSynced": claims.metadata.db_synced.unwrap_or(false),
        "expiresAt": claims.exp,
    }))
}
