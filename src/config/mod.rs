use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub routes: RouteConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the provider's backend REST API
    pub api_url: String,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// HS256 shared secret for session tokens
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    /// RS256 PEM public key for session tokens; preferred over `jwt_secret`
    #[serde(skip_serializing)]
    pub jwt_public_key: Option<String>,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub session_cookie: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub sign_in_path: String,
    pub dashboard_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
}

/// Paths the router serves regardless of configuration
const FIXED_ROUTES: &[&str] = &[
    "/",
    "/health",
    "/admin",
    "/api/webhooks/identity",
    "/api/onboarding/complete",
    "/api/auth/whoami",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Identity overrides
        if let Ok(v) = env::var("IDENTITY_API_URL") {
            self.identity.api_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_SECRET_KEY") {
            self.identity.secret_key = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_JWT_SECRET") {
            self.identity.jwt_secret = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_JWT_PUBLIC_KEY") {
            self.identity.jwt_public_key = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_WEBHOOK_SECRET") {
            self.identity.webhook_secret = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_SESSION_COOKIE") {
            self.identity.session_cookie = v;
        }

        // Route overrides
        if let Ok(v) = env::var("ROUTES_SIGN_IN_PATH") {
            self.routes.sign_in_path = v;
        }
        if let Ok(v) = env::var("ROUTES_DASHBOARD_PATH") {
            self.routes.dashboard_path = v;
        }

        // Site overrides
        if let Ok(v) = env::var("SITE_NAME") {
            self.site.name = v;
        }
        if let Ok(v) = env::var("SITE_URL") {
            self.site.url = v;
        }

        self
    }

    /// Reject configurations the selected environment cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.jwt_secret.is_none() && self.identity.jwt_public_key.is_none() {
            return Err(ConfigError::Missing("IDENTITY_JWT_SECRET or IDENTITY_JWT_PUBLIC_KEY"));
        }
        if url::Url::parse(&self.identity.api_url).is_err() {
            return Err(ConfigError::Invalid {
                key: "IDENTITY_API_URL",
                reason: format!("'{}' is not a URL", self.identity.api_url),
            });
        }
        for (key, path) in [
            ("ROUTES_SIGN_IN_PATH", &self.routes.sign_in_path),
            ("ROUTES_DASHBOARD_PATH", &self.routes.dashboard_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{}' must start with '/'", path),
                });
            }
            if FIXED_ROUTES.contains(&path.as_str()) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{}' is already routed", path),
                });
            }
        }
        // Protected prefixes are plain string prefixes, so this also covers equality
        let sign_in = &self.routes.sign_in_path;
        if sign_in.starts_with(self.routes.dashboard_path.as_str()) || sign_in.starts_with("/admin") {
            return Err(ConfigError::Invalid {
                key: "ROUTES_SIGN_IN_PATH",
                reason: format!("'{}' falls under a protected route", sign_in),
            });
        }
        if self.environment != Environment::Development {
            if self.database.url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL"));
            }
            if self.identity.secret_key.is_none() {
                return Err(ConfigError::Missing("IDENTITY_SECRET_KEY"));
            }
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            identity: IdentityConfig::defaults(),
            routes: RouteConfig::defaults(),
            site: SiteConfig {
                name: "Next Starter".to_string(),
                url: "http://localhost:3000".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                run_migrations: true,
            },
            identity: IdentityConfig::defaults(),
            routes: RouteConfig::defaults(),
            site: SiteConfig {
                name: "Next Starter".to_string(),
                url: "https://staging.example.com".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                run_migrations: false,
            },
            identity: IdentityConfig::defaults(),
            routes: RouteConfig::defaults(),
            site: SiteConfig {
                name: "Next Starter".to_string(),
                url: "https://app.example.com".to_string(),
            },
        }
    }
}

impl IdentityConfig {
    fn defaults() -> Self {
        Self {
            api_url: "https://api.clerk.com/v1".to_string(),
            secret_key: None,
            jwt_secret: None,
            jwt_public_key: None,
            webhook_secret: None,
            session_cookie: "__session".to_string(),
        }
    }
}

impl RouteConfig {
    fn defaults() -> Self {
        Self {
            sign_in_path: "/sign-in".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

fn non_empty(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_session_key(mut config: AppConfig) -> AppConfig {
        config.identity.jwt_secret = Some("secret".to_string());
        config
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.is_development());
        assert!(config.database.url.is_none());
        assert_eq!(config.routes.dashboard_path, "/dashboard");
        assert_eq!(config.identity.session_cookie, "__session");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.is_development());
        assert!(!config.database.run_migrations);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn development_runs_without_database() {
        let config = with_session_key(AppConfig::development());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn session_key_is_always_required() {
        let config = AppConfig::development();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn production_requires_database_and_secret_key() {
        let mut config = with_session_key(AppConfig::production());
        assert_eq!(config.validate(), Err(ConfigError::Missing("DATABASE_URL")));

        config.database.url = Some("postgres://localhost/starter".to_string());
        assert_eq!(config.validate(), Err(ConfigError::Missing("IDENTITY_SECRET_KEY")));

        config.identity.secret_key = Some("sk_live".to_string());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn route_paths_must_be_absolute() {
        let mut config = with_session_key(AppConfig::development());
        config.routes.dashboard_path = "dashboard".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "ROUTES_DASHBOARD_PATH", .. })
        ));
    }

    #[test]
    fn route_paths_cannot_shadow_fixed_or_protected_routes() {
        let mut config = with_session_key(AppConfig::development());
        config.routes.dashboard_path = "/health".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "ROUTES_DASHBOARD_PATH", .. })
        ));

        config.routes.dashboard_path = "/home".to_string();
        config.routes.sign_in_path = "/home/login".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "ROUTES_SIGN_IN_PATH", .. })
        ));

        config.routes.sign_in_path = "/login".to_string();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn non_empty_trims_blank_values() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" x ".to_string()), Some("x".to_string()));
    }
}
