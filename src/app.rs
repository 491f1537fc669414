use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, MemoryUserStore, PgUserStore, UserStore};
use crate::handlers;
use crate::identity::{HttpIdentityProvider, IdentityProvider, SessionVerifier};
use crate::logging::{Logger, TracingLogger};
use crate::middleware::{access_gate_middleware, AccessGate};
use crate::onboarding::{OnboardingService, PathGenerations, Revalidator};

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionVerifier>,
    pub gate: Arc<AccessGate>,
    pub revalidator: Arc<dyn Revalidator>,
    pub onboarding: Arc<OnboardingService>,
    pub logger: Arc<dyn Logger>,
}

impl AppState {
    /// Wire components from explicit collaborators (used directly by tests)
    pub fn new(
        config: AppConfig,
        store: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        sessions: SessionVerifier,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let revalidator: Arc<dyn Revalidator> = Arc::new(PathGenerations::new());
        let gate = AccessGate::with_default_rules(&config.routes.sign_in_path, &config.routes.dashboard_path);
        let onboarding = OnboardingService::new(
            store.clone(),
            identity.clone(),
            revalidator.clone(),
            logger.clone(),
            config.routes.dashboard_path.clone(),
        );

        Self {
            config: Arc::new(config),
            store,
            identity,
            sessions: Arc::new(sessions),
            gate: Arc::new(gate),
            revalidator,
            onboarding: Arc::new(onboarding),
            logger,
        }
    }

    /// Production wiring: PostgreSQL when `DATABASE_URL` is set, otherwise the
    /// in-memory store (development only, enforced by `AppConfig::validate`)
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new(config.is_development()));

        let store: Arc<dyn UserStore> = if config.database.url.is_some() {
            let db = DatabaseManager::connect(&config.database).await?;
            Arc::new(PgUserStore::new(db.pool().clone(), logger.clone()))
        } else {
            logger.warn("DATABASE_URL not set; using in-memory user store", None);
            Arc::new(MemoryUserStore::new(logger.clone()))
        };

        let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(
            &config.identity.api_url,
            config.identity.secret_key.clone(),
        )?);
        let sessions = SessionVerifier::from_config(&config.identity)?;

        Ok(Self::new(config, store, identity, sessions, logger))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.site.url);
    let routes = state.config.routes.clone();

    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        .route(&routes.sign_in_path, get(handlers::public::sign_in))
        .route("/api/webhooks/identity", post(handlers::public::identity_post))
        // Protected
        .route(&routes.dashboard_path, get(handlers::protected::dashboard_get))
        .route("/api/onboarding/complete", post(handlers::protected::complete_post))
        .route("/api/auth/whoami", get(handlers::protected::whoami_get))
        // Elevated
        .route("/admin", get(handlers::elevated::admin_get))
        // Every request, including unmatched paths, passes the gate first
        .layer(from_fn_with_state(state.clone(), access_gate_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(site_url: &str) -> CorsLayer {
    match HeaderValue::from_str(site_url.trim_end_matches('/')) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Err(_) => CorsLayer::new(),
    }
}
