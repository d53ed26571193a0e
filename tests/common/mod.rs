//! Common test utilities for E2E tests
//!
//! `TestServer` runs the real router against a temporary SQLite database and a
//! fake upstream that plays both the OAuth providers and the credits service.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use ideaforge::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const GOOD_CODE: &str = "good-code";
pub const BAD_CODE: &str = "bad-code";

/// Shared state of the fake upstream
#[derive(Clone, Default)]
pub struct Upstream {
    pub github_profile: Arc<Mutex<Value>>,
    pub discord_profile: Arc<Mutex<Value>>,
    pub github_emails: Arc<Mutex<Value>>,
    pub balances: Arc<Mutex<HashMap<String, i64>>>,
    pub rewards: Arc<Mutex<Vec<(String, i64)>>>,
    pub credits_down: Arc<Mutex<bool>>,
}

impl Upstream {
    pub fn set_github_profile(&self, profile: Value) {
        *self.github_profile.lock().unwrap() = profile;
    }

    pub fn set_discord_profile(&self, profile: Value) {
        *self.discord_profile.lock().unwrap() = profile;
    }

    pub fn set_github_emails(&self, emails: Value) {
        *self.github_emails.lock().unwrap() = emails;
    }

    pub fn set_credits_down(&self, down: bool) {
        *self.credits_down.lock().unwrap() = down;
    }

    pub fn rewards(&self) -> Vec<(String, i64)> {
        self.rewards.lock().unwrap().clone()
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        *self.balances.lock().unwrap().get(user_id).unwrap_or(&0)
    }
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    match form.get("code").map(String::as_str) {
        Some(GOOD_CODE) if form.get("grant_type").map(String::as_str) == Some("authorization_code") => {
            Json(json!({ "access_token": "upstream-access-token", "token_type": "bearer" }))
        }
        _ => Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })),
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer upstream-access-token")
}

async fn github_user(State(upstream): State<Upstream>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(upstream.github_profile.lock().unwrap().clone()))
}

async fn github_emails(State(upstream): State<Upstream>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(upstream.github_emails.lock().unwrap().clone()))
}

async fn discord_user(State(upstream): State<Upstream>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(upstream.discord_profile.lock().unwrap().clone()))
}

async fn balance(State(upstream): State<Upstream>, Path(user_id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if *upstream.credits_down.lock().unwrap() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "balance": upstream.balance(&user_id) })))
}

async fn reward(
    State(upstream): State<Upstream>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let amount = body["amount"].as_i64().unwrap_or(0);
    *upstream.balances.lock().unwrap().entry(user_id.clone()).or_insert(0) += amount;
    upstream.rewards.lock().unwrap().push((user_id, amount));
    StatusCode::NO_CONTENT
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/github/token", post(token))
        .route("/github/user", get(github_user))
        .route("/github/user/emails", get(github_emails))
        .route("/discord/token", post(token))
        .route("/discord/users/me", get(discord_user))
        .route("/credits/users/:id/balance", get(balance))
        .route("/credits/users/:id/rewards", post(reward))
        .with_state(upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub upstream: Upstream,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let upstream = Upstream::default();
        upstream.set_github_profile(json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "email": "octocat@example.com",
            "avatar_url": "https://avatars.example.com/u/583231"
        }));
        upstream.set_github_emails(json!([
            { "email": "octo-work@example.com", "primary": false, "verified": true },
            { "email": "octocat@example.com", "primary": true, "verified": true }
        ]));
        upstream.set_discord_profile(json!({
            "id": "80351110224678912",
            "username": "nelly",
            "global_name": "Nelly",
            "avatar": null,
            "email": "nelly@example.com",
            "verified": true
        }));
        let upstream_url = spawn_upstream(upstream.clone()).await;

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let provider = |name: &str, userinfo: &str| config::OAuthProviderConfig {
            client_id: Some(format!("{name}-client-id")),
            client_secret: Some(format!("{name}-client-secret")),
            authorize_url: Some(format!("https://{name}.example.com/oauth/authorize")),
            token_url: Some(format!("{upstream_url}/{name}/token")),
            userinfo_url: Some(format!("{upstream_url}/{name}/{userinfo}")),
        };

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "ideas.test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes!".to_string(),
                session_max_age: 3600,
                github: provider("github", "user"),
                discord: provider("discord", "users/me"),
            },
            credits: config::CreditsConfig {
                base_url: format!("{upstream_url}/credits"),
                api_key: None,
                timeout_seconds: 5,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = ideaforge::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            upstream,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Start a sign-in and return the CSRF state stored in the cookie
    pub async fn begin_sign_in(&self, provider: &str) -> String {
        let response = self
            .client
            .get(self.url(&format!("/api/auth/signin/{provider}")))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        cookie_value(response.headers(), "oauth_state").expect("oauth_state cookie")
    }

    /// Complete the callback with the given code
    pub async fn callback(&self, provider: &str, code: &str, csrf_state: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!(
                "/api/auth/callback/{provider}?code={code}&state={csrf_state}"
            )))
            .header("Cookie", format!("oauth_state={csrf_state}"))
            .send()
            .await
            .unwrap()
    }

    /// Run the whole OAuth flow and return the session token
    pub async fn sign_in(&self, provider: &str) -> String {
        let csrf_state = self.begin_sign_in(provider).await;
        let response = self.callback(provider, GOOD_CODE, &csrf_state).await;
        assert!(
            response.status().is_redirection(),
            "callback failed with {}",
            response.status()
        );

        cookie_value(response.headers(), "session").expect("session cookie")
    }

    /// Read the session payload with the given token
    pub async fn session(&self, token: &str) -> Value {
        let response = self
            .client
            .get(self.url("/api/auth/session"))
            .header("Cookie", format!("session={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

/// Value of a cookie set by the response, ignoring removal cookies
pub fn cookie_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
