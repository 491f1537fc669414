// handlers/public/mod.rs - Public handlers (no session required)
//
// Security Level: None, except webhooks which carry an HMAC signature
// Middleware: access gate (classifies these as public)

pub mod webhooks;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::logging::error_data;
use crate::middleware::ApiResponse;

pub use webhooks::identity_post;

/// GET / - service information
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": state.config.site.name,
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "sign_in": format!("{} (public)", state.config.routes.sign_in_path),
                "dashboard": format!("{} (session required)", state.config.routes.dashboard_path),
                "admin": "/admin (admin role required)",
                "onboarding": "/api/onboarding/complete (POST, session required)",
                "whoami": "/api/auth/whoami (session required)",
                "webhooks": "/api/webhooks/identity (POST, signed)",
            }
        }
    }))
}

/// GET /health - user store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            state.logger.error("Health check failed", Some(&error_data(&e)));
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub redirect_url: Option<String>,
}

/// GET /sign-in - placeholder for the provider-hosted sign-in widget
///
/// Only same-site relative return paths are echoed back.
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
) -> ApiResponse<Value> {
    let redirect_url = query
        .redirect_url
        .filter(|url| url.starts_with('/') && !url.starts_with("//"))
        .unwrap_or_else(|| state.config.routes.dashboard_path.clone());

    ApiResponse::success(json!({
        "page": "sign-in",
        "siteName": state.config.site.name,
        "redirectUrl": redirect_url,
    }))
}
