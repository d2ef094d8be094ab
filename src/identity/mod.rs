//! Identity provider abstraction.
//!
//! Credential checks, session issuance and OAuth are delegated to a provider;
//! the site only mirrors authenticated identities into its own `users` table.

pub mod hosted;
pub mod local;

pub use hosted::HostedIdentity;
pub use local::LocalIdentity;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{NewUser, User};
use crate::db::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Wrong e-mail/password; the provider's wording is kept.
    #[error("{0}")]
    InvalidCredentials(String),
    /// The provider refused the request (weak password, taken e-mail, bad code...).
    #[error("{0}")]
    Rejected(String),
    #[error("invalid or expired session")]
    InvalidToken,
    #[error("{0}")]
    Unsupported(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("identity provider error: {0}")]
    Internal(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    pub fn status(&self) -> StatusCode {
        match self {
            IdentityError::InvalidCredentials(_) | IdentityError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            IdentityError::Rejected(_) | IdentityError::Unsupported(_) => StatusCode::BAD_REQUEST,
            IdentityError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IdentityError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            IdentityError::InvalidCredentials(m)
            | IdentityError::Rejected(m)
            | IdentityError::Unsupported(m) => m.clone(),
            IdentityError::InvalidToken => "Invalid or expired session".to_string(),
            IdentityError::Unavailable(_) => {
                "Authentication service temporarily unavailable.".to_string()
            }
            IdentityError::Internal(_) => crate::error::UNEXPECTED_ERROR.to_string(),
        }
    }
}

/// An authenticated person as the provider knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    /// Where the confirmation e-mail should send the user back to.
    pub redirect_to: String,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub identity: Option<Identity>,
    pub session: Option<Session>,
    /// The account only works after the e-mail link is followed.
    pub confirmation_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
    Facebook,
}

impl OAuthProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            "github" => Some(OAuthProvider::Github),
            "facebook" => Some(OAuthProvider::Facebook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Facebook => "facebook",
        }
    }
}

/// Where to send the browser to start an OAuth flow.
#[derive(Debug, Clone)]
pub struct OAuthRedirect {
    pub url: String,
    /// PKCE verifier to keep until the callback, if the flow uses one.
    pub code_verifier: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> IdentityResult<Session>;

    async fn sign_up(&self, request: SignUp) -> IdentityResult<SignUpOutcome>;

    fn authorize(&self, provider: OAuthProvider, redirect_to: &str)
        -> IdentityResult<OAuthRedirect>;

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> IdentityResult<Session>;

    async fn identity_for_token(&self, access_token: &str) -> IdentityResult<Identity>;

    async fn sign_out(&self, access_token: &str) -> IdentityResult<()>;
}

/// Returns the app-level user for `identity`, creating it with the default
/// (least privileged) role when it does not exist yet.
pub async fn ensure_user_row(store: &dyn Store, identity: &Identity) -> Result<User, StoreError> {
    if let Some(user) = store.get_user(identity.id).await? {
        return Ok(user);
    }

    let user = store
        .insert_user(NewUser {
            id: identity.id,
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            role: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "mirrored new identity into users");
    Ok(user)
}
