#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub,
    dead_code
)]
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;
use viewhub_auth::AppBuilder;
use viewhub_auth::adapters::session::MemorySessionStore;
use viewhub_auth::config::Config;
use viewhub_auth::domain::credentials::ClientCredentials;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/authentication/v1/gettoken";
pub const REFRESH_PATH: &str = "/authentication/v1/refreshtoken";

pub fn setup_tracing() {
    viewhub_auth::telemetry::init_test_telemetry();
}

pub fn test_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        callback_url: "http://localhost:3000/api/forge/callback/oauth".to_string(),
    }
}

pub fn get_test_config(forge_url: &str) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.mgmt_port = 0;
    config.forge.base_url = forge_url.to_string();
    config.forge.timeout_secs = 5;
    config
}

fn token_body(access: &str, refresh: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in
    })
}

/// Forge authentication double:
/// - code `BAD` is rejected, any other code yields `INT1/REF1/3600`
/// - refresh narrowed to `viewables:read` yields `PUB1/REF2/1800`
/// - refresh with the data scopes yields `INT2/REF3/3600`
/// - refresh token `REVOKED` is rejected
pub async fn start_forge_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("code=BAD"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "developerMessage": "The authorization code is invalid or expired."
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_string_contains("refresh_token=REVOKED"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "developerMessage": "The refresh token is invalid."
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("INT1", "REF1", 3600)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_string_contains("scope=viewables%3Aread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("PUB1", "REF2", 1800)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_string_contains("scope=data%3Aread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("INT2", "REF3", 3600)))
        .mount(&server)
        .await;

    server
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub sessions: Arc<MemorySessionStore>,
    pub forge: MockServer,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();
        let forge = start_forge_mock().await;
        let config = get_test_config(&forge.uri());
        Self::spawn_with(config, forge).await
    }

    pub async fn spawn_with(config: Config, forge: MockServer) -> Self {
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(config.session.ttl_secs)));

        let app = AppBuilder::new(config.clone())
            .with_credentials(test_credentials())
            .with_session_store(sessions.clone())
            .build()
            .await
            .unwrap();

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", api_listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let app_router = viewhub_auth::api::app_router(app.state);
        let mgmt_router = viewhub_auth::api::mgmt_router(app.mgmt_state);

        tokio::spawn(async move {
            axum::serve(api_listener, app_router).await.unwrap();
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router).await.unwrap();
        });

        let client = reqwest::Client::builder().redirect(Policy::none()).build().unwrap();

        Self { server_url, mgmt_url, client, sessions, forge, config }
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}/api/forge{route}", self.server_url)
    }

    /// Completes the callback for `code` and returns the `name=value` session cookie.
    pub async fn sign_in(&self, code: &str) -> String {
        let resp = self.client.get(self.url(&format!("/callback/oauth?code={code}"))).send().await.unwrap();
        assert!(resp.status().is_redirection(), "callback should redirect, got {}", resp.status());
        session_cookie(&resp).unwrap()
    }
}

/// The `name=value` pair from the response's `Set-Cookie` header.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    let header = resp.headers().get(reqwest::header::SET_COOKIE)?.to_str().ok()?;
    header.split(';').next().map(str::to_string)
}
