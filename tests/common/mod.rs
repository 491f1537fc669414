#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::redirect::Policy;

use starter_api_rust::testing::{claims_for, mint_token, TestApp};

/// The full router served on a free local port, backed by in-memory doubles
pub struct TestServer {
    pub base_url: String,
    pub app: TestApp,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(TestApp::new()).await
    }

    pub async fn start_with(app: TestApp) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        let router = app.router();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        // Redirects are assertions here, never followed
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .context("failed to build client")?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            app,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Signed session token for `user_id`
pub fn token(user_id: &str, role: Option<&str>, onboarding_complete: bool) -> String {
    mint_token(&claims_for(user_id, role, onboarding_complete))
}

pub fn location(res: &reqwest::Response) -> Option<&str> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
