use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::identity::SessionClaims;
use crate::logging::error_data;

/// What a matching rule says about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    /// Requires a valid session
    Protected,
    /// Requires `metadata.role == "admin"`
    AdminOnly,
}

/// `"/admin(.*)"` matches by prefix; anything else matches exactly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Prefix(String),
    Exact(String),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("(.*)") {
            Some(prefix) => RoutePattern::Prefix(prefix.to_string()),
            None => RoutePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            RoutePattern::Exact(exact) => path == exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    pub category: RouteCategory,
}

impl RouteRule {
    pub fn new(pattern: &str, category: RouteCategory) -> Self {
        Self {
            pattern: RoutePattern::parse(pattern),
            category,
        }
    }
}

/// Result of classifying one path against every rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteClass {
    pub protected: bool,
    pub admin_only: bool,
}

/// Outcome for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    /// No valid session on a protected route
    SignIn { location: String },
    /// Authenticated but not an admin
    Redirect { location: String },
}

impl GateDecision {
    /// Redirect target, or `None` when the request proceeds
    pub fn location(&self) -> Option<&str> {
        match self {
            GateDecision::Continue => None,
            GateDecision::SignIn { location } | GateDecision::Redirect { location } => Some(location),
        }
    }
}

const STATIC_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "jpg", "jpeg", "webp", "png", "gif", "svg", "ttf", "woff",
    "woff2", "ico", "csv", "doc", "docx", "xls", "xlsx", "zip", "webmanifest",
];

const INTERNAL_PREFIXES: &[&str] = &["/_next"];

const ALWAYS_EVALUATED_PREFIXES: &[&str] = &["/api", "/trpc"];

/// Per-request authorization, evaluated before any handler.
///
/// Pure over `(path, claims)`; no decision is cached between requests.
#[derive(Debug, Clone)]
pub struct AccessGate {
    rules: Vec<RouteRule>,
    sign_in_path: String,
    dashboard_path: String,
}

impl AccessGate {
    pub fn new(rules: Vec<RouteRule>, sign_in_path: &str, dashboard_path: &str) -> Self {
        Self {
            rules,
            sign_in_path: sign_in_path.to_string(),
            dashboard_path: dashboard_path.to_string(),
        }
    }

    /// `/admin*` and the dashboard subtree need a session; `/admin*` also needs the admin role
    pub fn default_rules(dashboard_path: &str) -> Vec<RouteRule> {
        vec![
            RouteRule::new("/admin(.*)", RouteCategory::Protected),
            RouteRule::new(&format!("{}(.*)", dashboard_path), RouteCategory::Protected),
            RouteRule::new("/admin(.*)", RouteCategory::AdminOnly),
        ]
    }

    pub fn with_default_rules(sign_in_path: &str, dashboard_path: &str) -> Self {
        Self::new(Self::default_rules(dashboard_path), sign_in_path, dashboard_path)
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .filter(|rule| rule.pattern.matches(path))
            .fold(RouteClass::default(), |mut class, rule| {
                match rule.category {
                    RouteCategory::Protected => class.protected = true,
                    RouteCategory::AdminOnly => class.admin_only = true,
                }
                class
            })
    }

    /// Framework internals and static assets skip the gate; `/api` and `/trpc` never do
    pub fn is_evaluated(path: &str) -> bool {
        if ALWAYS_EVALUATED_PREFIXES
            .iter()
            .any(|prefix| has_segment_prefix(path, prefix))
        {
            return true;
        }
        if INTERNAL_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return false;
        }
        !is_static_asset(path)
    }

    /// `path_and_query` is only used to build the sign-in return address
    pub fn decide(
        &self,
        path: &str,
        path_and_query: &str,
        claims: Option<&SessionClaims>,
    ) -> GateDecision {
        if !Self::is_evaluated(path) {
            return GateDecision::Continue;
        }

        let class = self.classify(path);

        if class.protected && claims.is_none() {
            return GateDecision::SignIn {
                location: self.sign_in_location(path_and_query),
            };
        }

        if class.admin_only && !claims.is_some_and(SessionClaims::is_admin) {
            return GateDecision::Redirect {
                location: self.dashboard_path.clone(),
            };
        }

        GateDecision::Continue
    }

    fn sign_in_location(&self, return_to: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
        format!("{}?redirect_url={}", self.sign_in_path, encoded)
    }
}

fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// True when any `.` in the path is followed by a listed extension, anywhere
/// in the path and without requiring a boundary after it. `.js` followed by
/// `on` is not an asset.
fn is_static_asset(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path).to_ascii_lowercase();
    path.match_indices('.').any(|(i, _)| {
        let rest = &path[i + 1..];
        STATIC_EXTENSIONS
            .iter()
            .any(|ext| rest.starts_with(ext) && !(*ext == "js" && rest[2..].starts_with("on")))
    })
}

/// Runs [`AccessGate::decide`] and, on success, leaves the [`Session`](crate::identity::Session)
/// in request extensions for handlers.
pub async fn access_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match state.sessions.session_from_headers(request.headers()) {
        Ok(session) => session,
        Err(e) => {
            // An invalid or expired token counts as no session
            state.logger.debug("Rejected session token", Some(&error_data(&e)));
            None
        }
    };

    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let decision = state
        .gate
        .decide(&path, &path_and_query, session.as_ref().map(|s| &s.claims));

    match decision.location() {
        None => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        Some(location) => {
            state.logger.debug(
                "Access gate redirect",
                Some(&json!({ "path": path, "location": location })),
            );
            Redirect::temporary(location).into_response()
        }
    }
}
