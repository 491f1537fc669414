mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use common::{location, token, TestServer};
use starter_api_rust::testing::{identity, test_config, TestApp};

#[tokio::test]
async fn dashboard_without_session_redirects_to_sign_in() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client().get(server.url("/dashboard")).send().await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/sign-in?redirect_url=%2Fdashboard"));
    Ok(())
}

#[tokio::test]
async fn sign_in_redirect_preserves_nested_path_and_query() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client()
        .get(server.url("/dashboard/settings?tab=1"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&res),
        Some("/sign-in?redirect_url=%2Fdashboard%2Fsettings%3Ftab%3D1")
    );
    Ok(())
}

#[tokio::test]
async fn invalid_token_counts_as_no_session() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client()
        .get(server.url("/dashboard"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    Ok(())
}

#[tokio::test]
async fn session_cookie_opens_dashboard() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client()
        .get(server.url("/dashboard"))
        .header("cookie", format!("__session={}", token("u1", None, false)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["userId"], "u1");
    Ok(())
}

#[tokio::test]
async fn admin_without_session_goes_to_sign_in_first() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client().get(server.url("/admin")).send().await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/sign-in?redirect_url=%2Fadmin"));
    Ok(())
}

#[tokio::test]
async fn viewer_claims_are_sent_to_dashboard() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client()
        .get(server.url("/admin/users"))
        .bearer_auth(token("u1", Some("viewer"), true))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn admin_claims_and_admin_metadata_open_admin() -> Result<()> {
    let server = TestServer::start().await?;
    server.app.identity.add(identity("a1", "root@x.com", "Root", Some("admin"))).await;

    let res = server
        .client()
        .get(server.url("/admin"))
        .bearer_auth(token("a1", Some("admin"), true))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["page"], "admin");
    Ok(())
}

#[tokio::test]
async fn stale_admin_claim_is_rechecked_against_provider() -> Result<()> {
    let server = TestServer::start().await?;
    server.app.identity.add(identity("a1", "root@x.com", "Root", None)).await;

    let res = server
        .client()
        .get(server.url("/admin"))
        .bearer_auth(token("a1", Some("admin"), true))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn static_assets_and_internals_skip_the_gate() -> Result<()> {
    let server = TestServer::start().await?;

    for path in ["/dashboard/logo.png", "/_next/static/chunk.js"] {
        let res = server.client().get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn public_api_routes_reach_handlers_without_session() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client().get(server.url("/api/auth/whoami")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Not authenticated");

    let res = server
        .client()
        .get(server.url("/api/auth/whoami"))
        .bearer_auth(token("u7", Some("contributor"), true))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["userId"], "u7");
    assert_eq!(body["data"]["role"], "contributor");
    assert_eq!(body["data"]["onboardingComplete"], true);
    Ok(())
}

#[tokio::test]
async fn configured_route_paths_are_gated_and_served() -> Result<()> {
    let mut config = test_config();
    config.routes.sign_in_path = "/login".to_string();
    config.routes.dashboard_path = "/home".to_string();
    let server = TestServer::start_with(TestApp::with_config(config)).await?;

    let res = server.client().get(server.url("/home")).send().await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/login?redirect_url=%2Fhome"));

    let res = server.client().get(server.url("/login")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client()
        .get(server.url("/home"))
        .bearer_auth(token("u1", None, false))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["userId"], "u1");

    let res = server
        .client()
        .get(server.url("/admin"))
        .bearer_auth(token("u1", Some("viewer"), false))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), Some("/home"));

    // The default paths are no longer routed or protected
    let res = server.client().get(server.url("/dashboard")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
