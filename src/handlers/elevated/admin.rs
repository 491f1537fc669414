use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{is_admin, ApiResponse, AuthSession};

/// GET /admin - administrative landing view
///
/// The gate has already checked the session's role claim. That claim can be a
/// token old, so the role is read again from the provider; a demoted user is
/// sent to the dashboard.
pub async fn admin_get(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Response, ApiError> {
    if !is_admin(state.identity.as_ref(), &session.user_id).await? {
        state.logger.warn(
            "Admin view denied by current role",
            Some(&json!({ "userId": session.user_id })),
        );
        return Ok(Redirect::temporary(&state.config.routes.dashboard_path).into_response());
    }

    Ok(ApiResponse::success(json!({
        "page": "admin",
        "userId": session.user_id,
        "siteName": state.config.site.name,
    }))
    .into_response())
}
