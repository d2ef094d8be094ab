/**
 * Authentication Routes
 * Sign-in, sign-up, OAuth and session handling on top of the identity provider
 */
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{ProfileUpdate, User};
use crate::error::{ApiError, FormSuccess};
use crate::identity::{ensure_user_row, IdentityError, OAuthProvider, Session, SignUp};
use crate::routes::{optional, present};
use crate::AppState;

pub const SESSION_COOKIE: &str = "gsg_session";
pub const PKCE_COOKIE: &str = "gsg_pkce";

/// PKCE verifier lifetime in seconds
const PKCE_COOKIE_MAX_AGE: i64 = 600;

const DEFAULT_NEXT: &str = "/admin";
const AUTH_CODE_ERROR_PATH: &str = "/auth/auth-code-error";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

// ============================================================================
// Cookies and session lookup
// ============================================================================

/// Value of cookie `name` from the request's Cookie header(s).
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Access token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
}

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn set_cookie(mut response: Response, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "refusing to send malformed cookie"),
    }
    response
}

fn session_cookie(state: &AppState, session: &Session) -> String {
    cookie(
        SESSION_COOKIE,
        &session.access_token,
        session.expires_in,
        state.config.is_production(),
    )
}

/// The app-level user behind the request's session, if any.
///
/// An invalid or expired token is treated as "not signed in".
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let identity = match state.identity.identity_for_token(&token).await {
        Ok(identity) => identity,
        Err(IdentityError::InvalidToken) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let user = ensure_user_row(state.store.as_ref(), &identity).await?;
    Ok(Some(user))
}

/// Only same-site paths are accepted as post-login targets.
///
/// Browsers strip tabs and newlines from URLs, so `/\t/host` would
/// resolve as `//host`; any whitespace or control character is refused.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path
        }
        _ => DEFAULT_NEXT,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (present(&payload.email), present(&payload.password))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let session = state.identity.sign_in_with_password(email, password).await?;
    let user = ensure_user_row(state.store.as_ref(), &session.identity).await?;

    tracing::info!(user_id = %user.id, provider = state.identity.name(), "user signed in");

    let cookie = session_cookie(&state, &session);
    let response = Json(LoginResponse {
        success: true,
        user,
        access_token: session.access_token,
        expires_in: session.expires_in,
    })
    .into_response();
    Ok(set_cookie(response, cookie))
}

/// POST /api/auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (present(&payload.email), present(&payload.password))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let outcome = state
        .identity
        .sign_up(SignUp {
            email: email.to_string(),
            password: password.to_string(),
            full_name: optional(payload.full_name),
            redirect_to: state.config.auth_callback_url(),
        })
        .await?;

    if let Some(identity) = &outcome.identity {
        ensure_user_row(state.store.as_ref(), identity).await?;
    }

    let message = if outcome.confirmation_required {
        "Check your email to confirm your account."
    } else {
        "Account created. You can now sign in."
    };
    Ok((axum::http::StatusCode::CREATED, FormSuccess::new(message)))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.identity.sign_out(&token).await {
            tracing::warn!(error = %e, "sign-out at identity provider failed");
        }
    }

    let cleared = cookie(SESSION_COOKIE, "", 0, state.config.is_production());
    set_cookie(Redirect::to("/").into_response(), cleared)
}

/// GET /api/auth/session
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(SessionResponse { user }))
}

/// GET /api/auth/oauth/{provider}
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, ApiError> {
    let provider = OAuthProvider::parse(&provider)
        .ok_or_else(|| ApiError::validation("Unsupported OAuth provider"))?;

    let redirect = state
        .identity
        .authorize(provider, &state.config.auth_callback_url())?;

    tracing::debug!(provider = provider.as_str(), "starting OAuth flow");

    let response = Redirect::temporary(&redirect.url).into_response();
    Ok(match redirect.code_verifier {
        Some(verifier) => set_cookie(
            response,
            cookie(
                PKCE_COOKIE,
                &verifier,
                PKCE_COOKIE_MAX_AGE,
                state.config.is_production(),
            ),
        ),
        None => response,
    })
}

/// GET /auth/callback?code=&next=
pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Redirect::temporary(AUTH_CODE_ERROR_PATH).into_response();
    };

    let verifier = cookie_value(&headers, PKCE_COOKIE);
    let session = match state.identity.exchange_code(code, verifier.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            return Redirect::temporary(AUTH_CODE_ERROR_PATH).into_response();
        }
    };

    if let Err(e) = ensure_user_row(state.store.as_ref(), &session.identity).await {
        tracing::error!(error = %e, "failed to mirror OAuth identity");
        return Redirect::temporary(AUTH_CODE_ERROR_PATH).into_response();
    }

    let forwarded_host = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty());
    let target = match forwarded_host {
        Some(host) if state.config.is_production() => format!("https://{}{}", host, next),
        _ => next,
    };

    let secure = state.config.is_production();
    let response = Redirect::temporary(&target).into_response();
    let response = set_cookie(response, session_cookie(&state, &session));
    set_cookie(response, cookie(PKCE_COOKIE, "", 0, secure))
}

/// PATCH /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<FormSuccess>, ApiError> {
    let user = current_user(&state, &headers)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    state
        .store
        .update_profile(user.id, update)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(FormSuccess::new("Profile updated successfully!"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};
    use crate::db::models::Role;
    use crate::error::ErrorResponse;
    use crate::identity::Identity;
    use crate::test_support::{
        authed, body_json, json_request, location, send, set_cookies, signed_in,
        state_with_identity, test_state, FixedIdentity, TEST_PASSWORD,
    };
    use crate::create_app;
    use axum::{body::Body, http::Request, http::StatusCode};

    #[test]
    fn test_cookie_value_parses_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; gsg_session=abc.def; other=1"),
        );
        assert_eq!(cookie_value(&headers, SESSION_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("gsg_session=cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn test_safe_next_blocks_offsite_targets() {
        assert_eq!(safe_next(None), "/admin");
        assert_eq!(safe_next(Some("/profile")), "/profile");
        assert_eq!(safe_next(Some("https://evil.example")), "/admin");
        assert_eq!(safe_next(Some("//evil.example")), "/admin");
        assert_eq!(safe_next(Some("/\t/evil.example")), "/admin");
        assert_eq!(safe_next(Some("/\n/evil.example")), "/admin");
        assert_eq!(safe_next(Some("/ /evil.example")), "/admin");
        assert_eq!(safe_next(Some("/blog?page=2")), "/blog?page=2");
    }

    #[tokio::test]
    async fn test_login_requires_email_and_password() {
        let app = create_app(test_state());
        let res = send(
            &app,
            json_request("POST", "/api/auth/login", serde_json::json!({ "email": "a@b.co" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(res).await;
        assert_eq!(body.error, "Email and password are required");
    }

    #[tokio::test]
    async fn test_sign_up_then_login_mirrors_client_user_and_sets_cookie() {
        let state = test_state();
        let app = create_app(state.clone());

        let res = send(
            &app,
            json_request(
                "POST",
                "/api/auth/sign-up",
                serde_json::json!({
                    "email": "new@example.com",
                    "password": TEST_PASSWORD,
                    "fullName": "New Person"
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: FormSuccess = body_json(res).await;
        assert_eq!(body.success, "Account created. You can now sign in.");

        let res = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "email": "new@example.com", "password": TEST_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(cookie.starts_with("gsg_session="));
        let body: LoginResponse = body_json(res).await;
        assert_eq!(body.user.role, Role::Client);
        assert_eq!(body.user.full_name.as_deref(), Some("New Person"));
        assert_eq!(state.store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password_surfaces_provider_message() {
        let state = test_state();
        signed_in(&state, "someone@example.com", Role::Client).await;
        let app = create_app(state);

        let res = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "email": "someone@example.com", "password": "nope-nope" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = body_json(res).await;
        assert_eq!(body.error, "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_session_reads_cookie_and_logout_revokes() {
        let state = test_state();
        let (id, token) = signed_in(&state, "reader@example.com", Role::Client).await;
        let app = create_app(state);

        let req = Request::get("/api/auth/session")
            .header(header::COOKIE, format!("gsg_session={}", token))
            .body(Body::empty())
            .unwrap();
        let body: SessionResponse = body_json(send(&app, req).await).await;
        assert_eq!(body.user.map(|u| u.id), Some(id));

        let res = send(
            &app,
            authed(
                Request::post("/api/auth/logout").body(Body::empty()).unwrap(),
                &token,
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");

        let req = authed(
            Request::get("/api/auth/session").body(Body::empty()).unwrap(),
            &token,
        );
        let body: SessionResponse = body_json(send(&app, req).await).await;
        assert!(body.user.is_none());
    }

    #[tokio::test]
    async fn test_profile_update_requires_session() {
        let state = test_state();
        let (id, token) = signed_in(&state, "editor@example.com", Role::Editor).await;
        let app = create_app(state.clone());

        let update = serde_json::json!({ "fullName": "Eddie", "website": "https://eddie.dev" });
        let res = send(&app, json_request("PATCH", "/api/profile", update.clone())).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = body_json(res).await;
        assert_eq!(body.error, "Not authenticated");

        let res = send(&app, authed(json_request("PATCH", "/api/profile", update), &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: FormSuccess = body_json(res).await;
        assert_eq!(body.success, "Profile updated successfully!");

        let user = state.store.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.full_name.as_deref(), Some("Eddie"));
        assert_eq!(user.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_oauth_with_local_provider_is_rejected() {
        let app = create_app(test_state());
        let res = send(
            &app,
            Request::get("/api/auth/oauth/google").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(
            &app,
            Request::get("/api/auth/oauth/myspace").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_failure_redirects_to_error_page() {
        let app = create_app(test_state());
        let res = send(
            &app,
            Request::get("/auth/callback?code=abc&next=/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "/auth/auth-code-error");

        let res = send(
            &app,
            Request::get("/auth/callback").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(location(&res), "/auth/auth-code-error");
    }

    fn oauth_identity() -> Identity {
        Identity {
            id: uuid::Uuid::new_v4(),
            email: "oauth.user@example.com".to_string(),
            full_name: Some("Olu Adebayo".to_string()),
            avatar_url: Some("https://avatars.example/olu.png".to_string()),
        }
    }

    fn callback(uri: &str, forwarded_host: Option<&str>) -> Request<Body> {
        let mut req = Request::get(uri)
            .header(header::COOKIE, "gsg_pkce=verifier-123")
            .body(Body::empty())
            .unwrap();
        if let Some(host) = forwarded_host {
            req.headers_mut()
                .insert("x-forwarded-host", HeaderValue::from_str(host).unwrap());
        }
        req
    }

    #[tokio::test]
    async fn test_callback_mirrors_user_sets_session_and_clears_pkce() {
        let who = oauth_identity();
        let state = state_with_identity(
            FixedIdentity::new("good-code", Some("verifier-123"), who.clone()),
            AppConfig::default(),
        );
        let app = create_app(state.clone());

        let res = send(&app, callback("/auth/callback?code=good-code&next=/profile", None)).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "/profile");

        let cookies = set_cookies(&res);
        assert_eq!(cookies.len(), 2);
        assert_eq!(
            cookies[0],
            format!(
                "gsg_session=token-for-{}; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600",
                who.id
            )
        );
        assert_eq!(cookies[1], "gsg_pkce=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");

        let user = state.store.get_user(who.id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Client);
        assert_eq!(user.email, "oauth.user@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Olu Adebayo"));
        assert_eq!(
            user.avatar_url.as_deref(),
            Some("https://avatars.example/olu.png")
        );

        // the session cookie is usable right away
        let req = Request::get("/api/auth/session")
            .header(header::COOKIE, format!("gsg_session=token-for-{}", who.id))
            .body(Body::empty())
            .unwrap();
        let body: SessionResponse = body_json(send(&app, req).await).await;
        assert_eq!(body.user.map(|u| u.id), Some(who.id));
    }

    #[tokio::test]
    async fn test_callback_without_matching_verifier_fails() {
        let state = state_with_identity(
            FixedIdentity::new("good-code", Some("verifier-123"), oauth_identity()),
            AppConfig::default(),
        );
        let app = create_app(state.clone());

        let req = Request::get("/auth/callback?code=good-code")
            .body(Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(location(&res), "/auth/auth-code-error");
        assert!(set_cookies(&res).is_empty());
        assert!(state.store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_callback_in_production_uses_forwarded_host() {
        let state = state_with_identity(
            FixedIdentity::new("good-code", Some("verifier-123"), oauth_identity()),
            AppConfig {
                environment: Environment::Production,
                ..AppConfig::default()
            },
        );
        let app = create_app(state);

        let res = send(
            &app,
            callback(
                "/auth/callback?code=good-code&next=/admin/posts",
                Some("gsgroups.example"),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "https://gsgroups.example/admin/posts");
        assert!(set_cookies(&res).iter().all(|c| c.ends_with("; Secure")));
    }

    #[tokio::test]
    async fn test_callback_ignores_forwarded_host_outside_production() {
        let state = state_with_identity(
            FixedIdentity::new("good-code", Some("verifier-123"), oauth_identity()),
            AppConfig::default(),
        );
        let app = create_app(state);

        let res = send(
            &app,
            callback("/auth/callback?code=good-code&next=/profile", Some("gsgroups.example")),
        )
        .await;
        assert_eq!(location(&res), "/profile");
    }

    #[tokio::test]
    async fn test_callback_with_whitespace_in_next_lands_on_admin() {
        let state = state_with_identity(
            FixedIdentity::new("good-code", Some("verifier-123"), oauth_identity()),
            AppConfig {
                environment: Environment::Production,
                ..AppConfig::default()
            },
        );
        let app = create_app(state);

        for next in ["/%09/evil.example", "//evil.example", "https://evil.example"] {
            let res = send(
                &app,
                callback(
                    &format!("/auth/callback?code=good-code&next={}", next),
                    Some("gsgroups.example"),
                ),
            )
            .await;
            assert_eq!(location(&res), "https://gsgroups.example/admin", "next={}", next);
        }

        let res = send(
            &app,
            callback("/auth/callback?code=good-code&next=/%09/evil.example", None),
        )
        .await;
        assert_eq!(location(&res), "/admin");
    }
}
