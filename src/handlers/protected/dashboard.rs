use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, AuthSession};

pub const COMPLETE_SETUP_PATH: &str = "/api/onboarding/complete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub user_id: String,
    pub onboarding_complete: bool,
    pub show_welcome: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome: Option<WelcomePrompt>,
}

/// Copy for the one-time welcome dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePrompt {
    pub title: String,
    pub description: String,
    pub action_label: String,
    pub action_path: String,
    pub success_message: String,
}

impl WelcomePrompt {
    pub fn for_site(site_name: &str) -> Self {
        Self {
            title: format!("Welcome to {}!", site_name),
            description: "We're excited to have you here. Let's get your profile synchronized and set up your workspace.".to_string(),
            action_label: "Complete Setup".to_string(),
            action_path: COMPLETE_SETUP_PATH.to_string(),
            success_message: "Welcome aboard! Your profile is now ready.".to_string(),
        }
    }
}

impl DashboardView {
    pub fn new(user_id: &str, onboarding_complete: bool, site_name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            onboarding_complete,
            show_welcome: !onboarding_complete,
            welcome: (!onboarding_complete).then(|| WelcomePrompt::for_site(site_name)),
        }
    }
}

/// Weak validator: changes whenever the dashboard path is revalidated or the
/// session's onboarding flag flips
pub fn dashboard_etag(generation: u64, onboarding_complete: bool) -> String {
    format!("W/\"dashboard-{}-{}\"", generation, u8::from(onboarding_complete))
}

fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').map(str::trim).any(|tag| tag == etag || tag == "*"))
}

/// GET /dashboard - the signed-in landing view
///
/// `onboardingComplete` comes from the session claims, so it only turns true
/// once the provider has issued a refreshed token.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "userId": "user_123",
///     "onboardingComplete": false,
///     "showWelcome": true,
///     "welcome": { "title": "Welcome to Next Starter!", "actionLabel": "Complete Setup", ... }
///   }
/// }
/// ```
pub async fn dashboard_get(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    headers: HeaderMap,
) -> Response {
    let onboarding_complete = session.claims.onboarding_complete();
    let generation = state.revalidator.generation(&state.config.routes.dashboard_path);
    let etag = dashboard_etag(generation, onboarding_complete);

    if matches_if_none_match(&headers, &etag) {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    let view = DashboardView::new(&session.user_id, onboarding_complete, &state.config.site.name);
    (
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, no-cache".to_string()),
        ],
        ApiResponse::success(view),
    )
        .into_response()
}
