use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::app::AppState;
use crate::middleware::MaybeSession;
use crate::onboarding::{OnboardingError, OnboardingResponse};

/// POST /api/onboarding/complete - the "Complete Setup" action
///
/// The body is always `{"success": bool, "error"?: string}` so the client can
/// toast either outcome; the status code mirrors it.
pub async fn complete_post(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> impl IntoResponse {
    let result = state.onboarding.complete_onboarding(session.as_ref()).await;

    let status = match result {
        Ok(()) => StatusCode::OK,
        Err(OnboardingError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
        Err(OnboardingError::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(OnboardingResponse::from(result)))
}
