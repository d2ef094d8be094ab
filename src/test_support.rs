//! Shared fixtures for router tests.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{AppConfig, WidgetTimings};
use crate::db::models::{NewUser, Role};
use crate::db::{MemoryStore, Store};
use crate::identity::{
    Identity, IdentityError, IdentityProvider, IdentityResult, LocalIdentity, OAuthProvider,
    OAuthRedirect, Session, SignUp, SignUpOutcome,
};
use crate::{create_app, AppState};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_state() -> AppState {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = AppConfig {
        widgets: WidgetTimings::instant(),
        jwt_secret: "test-secret".to_string(),
        ..AppConfig::default()
    };
    let identity = Arc::new(LocalIdentity::new(store.clone(), config.jwt_secret.clone()));
    AppState {
        store,
        identity,
        config: Arc::new(config),
    }
}

/// Provider that trades exactly one code (and verifier) for a fixed session.
pub struct FixedIdentity {
    pub code: String,
    pub code_verifier: Option<String>,
    pub session: Session,
}

impl FixedIdentity {
    pub fn new(code: &str, code_verifier: Option<&str>, identity: Identity) -> Self {
        Self {
            code: code.to_string(),
            code_verifier: code_verifier.map(str::to_string),
            session: Session {
                access_token: format!("token-for-{}", identity.id),
                refresh_token: None,
                expires_in: 3600,
                identity,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> IdentityResult<Session> {
        Err(IdentityError::InvalidCredentials("Invalid login credentials".into()))
    }

    async fn sign_up(&self, _request: SignUp) -> IdentityResult<SignUpOutcome> {
        Err(IdentityError::Unsupported("Sign-up is disabled".into()))
    }

    fn authorize(&self, provider: OAuthProvider, redirect_to: &str) -> IdentityResult<OAuthRedirect> {
        Ok(OAuthRedirect {
            url: format!("https://auth.example/{}?redirect_to={}", provider.as_str(), redirect_to),
            code_verifier: self.code_verifier.clone(),
        })
    }

    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> IdentityResult<Session> {
        if code == self.code && code_verifier == self.code_verifier.as_deref() {
            Ok(self.session.clone())
        } else {
            Err(IdentityError::Rejected("invalid flow state".into()))
        }
    }

    async fn identity_for_token(&self, access_token: &str) -> IdentityResult<Identity> {
        if access_token == self.session.access_token {
            Ok(self.session.identity.clone())
        } else {
            Err(IdentityError::InvalidToken)
        }
    }

    async fn sign_out(&self, _access_token: &str) -> IdentityResult<()> {
        Ok(())
    }
}

/// Test state whose identity provider is `identity`.
pub fn state_with_identity(identity: FixedIdentity, config: AppConfig) -> AppState {
    AppState {
        identity: Arc::new(identity),
        config: Arc::new(AppConfig {
            widgets: WidgetTimings::instant(),
            ..config
        }),
        ..test_state()
    }
}

pub async fn test_app() -> Router {
    create_app(test_state())
}

/// Registers an account with `role` and returns its bearer token.
pub async fn signed_in(state: &AppState, email: &str, role: Role) -> (Uuid, String) {
    let outcome = state
        .identity
        .sign_up(SignUp {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            full_name: None,
            redirect_to: state.config.auth_callback_url(),
        })
        .await
        .unwrap();
    let session = outcome.session.unwrap();
    let id = session.identity.id;
    state
        .store
        .insert_user(NewUser {
            id,
            email: email.to_string(),
            role: Some(role),
            ..NewUser::default()
        })
        .await
        .unwrap();
    (id, session.access_token)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Every `Set-Cookie` header value, in order.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
