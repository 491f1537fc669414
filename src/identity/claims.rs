use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IdentityConfig;
use crate::identity::provider::PublicMetadata;

/// Decoded session token issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Provider subject id
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    /// Snapshot of public metadata at issuance; stale until the next token
    #[serde(default)]
    pub metadata: PublicMetadata,
}

impl SessionClaims {
    pub fn role(&self) -> Option<&str> {
        self.metadata.role.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some("admin")
    }

    pub fn onboarding_complete(&self) -> bool {
        self.metadata.onboarding_complete == Some(true)
    }
}

/// An active, verified session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub claims: SessionClaims,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            claims,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session key not configured")]
    MissingKey,

    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies provider session tokens from `Authorization: Bearer` or the session cookie
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionVerifier {
    /// RS256 public key wins over the HS256 secret when both are set
    pub fn from_config(config: &IdentityConfig) -> Result<Self, SessionError> {
        if let Some(pem) = &config.jwt_public_key {
            let key = DecodingKey::from_rsa_pem(pem.replace("\\n", "\n").as_bytes())
                .map_err(|e| SessionError::InvalidKey(e.to_string()))?;
            return Ok(Self::with_key(key, Algorithm::RS256, &config.session_cookie));
        }
        match &config.jwt_secret {
            Some(secret) => Ok(Self::hs256(secret.as_bytes(), &config.session_cookie)),
            None => Err(SessionError::MissingKey),
        }
    }

    pub fn hs256(secret: &[u8], cookie_name: &str) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256, cookie_name)
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm, cookie_name: &str) -> Self {
        let mut validation = Validation::new(algorithm);
        // Provider session tokens carry no audience
        validation.validate_aud = false;
        Self {
            key,
            validation,
            cookie_name: cookie_name.to_string(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }

    /// Bearer header first, then the session cookie
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        bearer_token(headers).or_else(|| cookie_value(headers, &self.cookie_name))
    }

    /// `Ok(None)` when the request carries no token at all
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        match self.token_from_headers(headers) {
            Some(token) => self.verify(&token).map(|claims| Some(Session::from(claims))),
            None => Ok(None),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
