//! OAuth sign-in flow
//!
//! Implements the OAuth 2.0 authorization code flow for every configured
//! provider (GitHub, Discord).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;

use super::events::on_user_created;
use super::providers::{OAuthProvider, ProviderKind};
use super::session::{SESSION_COOKIE, Session, create_session_token};
use crate::AppState;
use crate::error::AppError;

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_MAX_AGE_MINUTES: i64 = 10;

/// Create authentication router
///
/// Routes:
/// - GET /api/auth/providers - Enabled providers
/// - GET /api/auth/signin/:provider - Redirect to provider
/// - GET /api/auth/callback/:provider - OAuth callback
/// - POST /api/auth/signout - Sign out
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/providers", get(list_providers))
        .route("/api/auth/signin/:provider", get(signin_redirect))
        .route("/api/auth/callback/:provider", get(oauth_callback))
        .route("/api/auth/signout", post(signout))
}

// =============================================================================
// Providers
// =============================================================================

/// GET /api/auth/providers
async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let base_url = state.config.server.base_url();
    let providers: serde_json::Map<String, Value> = state
        .providers
        .iter()
        .map(|provider| {
            (
                provider.kind.id().to_string(),
                serde_json::to_value(provider.info(&base_url)).unwrap_or(Value::Null),
            )
        })
        .collect();

    Json(providers)
}

// =============================================================================
// Sign-in
// =============================================================================

/// GET /api/auth/signin/:provider
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to provider with client_id, redirect_uri, scope, state
async fn signin_redirect(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider = state.providers.get(&provider_id).ok_or(AppError::NotFound)?;

    let csrf_state = generate_csrf_state();
    let location = provider.authorization_url(&state.config.server.base_url(), &csrf_state)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(OAUTH_STATE_MAX_AGE_MINUTES));

    tracing::debug!(provider = %provider_id, "Redirecting to OAuth provider");

    Ok((jar.add(cookie), Redirect::to(&location)))
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Token endpoint response; GitHub reports errors with a 200 status
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// GET /api/auth/callback/:provider
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch the provider profile
/// 4. Link or create the local user; new users get their starting credits
/// 5. Create session and set cookie
/// 6. Redirect to home
async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider = state.providers.get(&provider_id).ok_or(AppError::NotFound)?;

    if let Some(error) = &query.error {
        tracing::info!(provider = %provider_id, %error, "Provider denied authorization");
        return Err(AppError::Unauthorized);
    }

    verify_csrf_state(query.state.as_deref(), &jar)?;
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::Validation("missing authorization code".to_string()))?;

    let base_url = state.config.server.base_url();
    let access_token =
        exchange_code(&state.http_client, provider, code, &provider.callback_url(&base_url))
            .await?;
    let identity = fetch_identity(&state.http_client, provider, &access_token).await?;

    let linked = state.db.link_oauth_user(&identity).await?;
    if linked.created {
        crate::metrics::USERS_CREATED_TOTAL.inc();
        on_user_created(state.credits.as_ref(), &linked.user).await?;
    }

    let session = Session::for_user(
        &linked.user,
        provider.kind.id(),
        state.config.auth.session_max_age,
    );
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let session_cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.config.auth.session_max_age));

    crate::metrics::SIGN_INS_TOTAL
        .with_label_values(&[provider.kind.id()])
        .inc();
    tracing::info!(
        user_id = %linked.user.id,
        provider = %provider_id,
        created = linked.created,
        "User signed in"
    );

    let jar = jar
        .remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"))
        .add(session_cookie);

    Ok((jar, Redirect::to("/")))
}

// =============================================================================
// Sign-out
// =============================================================================

/// POST /api/auth/signout
///
/// Clears session cookies and redirects home.
async fn signout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/"))
        .remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"));

    (jar, Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(state: Option<&str>, jar: &CookieJar) -> Result<(), AppError> {
    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::Unauthorized)?;

    match state {
        Some(state) if state == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

async fn exchange_code(
    http: &reqwest::Client,
    provider: &OAuthProvider,
    code: &str,
    redirect_uri: &str,
) -> Result<String, AppError> {
    let response = http
        .post(&provider.token_url)
        .header(header::ACCEPT, "application/json")
        .form(&[
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    let status = response.status();
    let body: TokenResponse = response.json().await.map_err(|e| {
        AppError::OAuth(format!(
            "{} token endpoint returned an unreadable body ({status}): {e}",
            provider.kind.display_name()
        ))
    })?;

    match body.access_token {
        Some(token) if status.is_success() => Ok(token),
        _ => {
            let reason = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| status.to_string());
            tracing::warn!(provider = provider.kind.id(), %reason, "Token exchange failed");
            Err(AppError::OAuth(format!(
                "{} token exchange failed: {reason}",
                provider.kind.display_name()
            )))
        }
    }
}

async fn fetch_identity(
    http: &reqwest::Client,
    provider: &OAuthProvider,
    access_token: &str,
) -> Result<crate::data::ProviderIdentity, AppError> {
    let response = http
        .get(&provider.userinfo_url)
        .bearer_auth(access_token)
        .header(header::ACCEPT, "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::OAuth(format!(
            "{} user info request failed: {}",
            provider.kind.display_name(),
            response.status()
        )));
    }

    let profile: Value = response.json().await?;
    let mut identity = provider.kind.parse_profile(&profile)?;

    if provider.kind == ProviderKind::GitHub {
        if let Some(email) = fetch_github_primary_email(http, provider, access_token).await {
            identity.email = Some(email);
            identity.email_verified = true;
        }
    }

    Ok(identity)
}

/// Primary verified GitHub email; private emails are only visible through `/user/emails`.
async fn fetch_github_primary_email(
    http: &reqwest::Client,
    provider: &OAuthProvider,
    access_token: &str,
) -> Option<String> {
    let url = format!("{}/emails", provider.userinfo_url.trim_end_matches('/'));
    let result = async {
        http.get(&url)
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GitHubEmail>>()
            .await
    }
    .await;

    match result {
        Ok(emails) => emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email),
        Err(error) => {
            tracing::debug!(%error, "Could not fetch GitHub emails");
            None
        }
    }
}
