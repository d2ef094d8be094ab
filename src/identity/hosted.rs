//! Hosted identity provider: a GoTrue-compatible auth REST API.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::distr::{Alphanumeric, SampleString};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use super::{
    Identity, IdentityError, IdentityProvider, IdentityResult, OAuthProvider, OAuthRedirect,
    Session, SignUp, SignUpOutcome,
};
use crate::config::HostedIdentityConfig;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const VERIFIER_LEN: usize = 64;

pub struct HostedIdentity {
    base_url: String,
    anon_key: String,
    client: Client,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl From<RemoteUser> for Identity {
    fn from(user: RemoteUser) -> Self {
        let meta = user.user_metadata;
        Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
            full_name: meta.full_name.or(meta.name),
            avatar_url: meta.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    user: RemoteUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            identity: token.user.into(),
        }
    }
}

/// Sign-up answers with a session when e-mail confirmation is off,
/// otherwise with the bare (unconfirmed) user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(RemoteUser),
}

#[derive(Debug, Default, Deserialize)]
struct RemoteError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl RemoteError {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// PKCE code challenge (S256) for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

impl HostedIdentity {
    pub fn new(config: &HostedIdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
    }

    /// Sends the request and turns transport failures and non-2xx answers
    /// into `IdentityError`s. 4xx bodies carry a user-facing message.
    async fn send(
        &self,
        builder: RequestBuilder,
        on_client_error: fn(String) -> IdentityError,
    ) -> IdentityResult<Response> {
        let response = self.request(builder).send().await.map_err(|e| {
            tracing::error!(error = %e, "identity upstream request failed");
            IdentityError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: RemoteError = response.json().await.unwrap_or_default();
        let message = body
            .into_message()
            .unwrap_or_else(|| format!("identity provider returned {}", status));

        if status.is_client_error() {
            tracing::debug!(status = %status, message = %message, "identity provider rejected request");
            Err(on_client_error(message))
        } else {
            tracing::warn!(status = %status, message = %message, "identity provider error");
            Err(IdentityError::Unavailable(message))
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> IdentityResult<T> {
        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse identity provider response");
            IdentityError::Internal(e.to_string())
        })
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        challenge: &str,
    ) -> IdentityResult<Url> {
        Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("provider", provider.as_str()),
                ("redirect_to", redirect_to),
                ("code_challenge", challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| IdentityError::Internal(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<Session> {
        let builder = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let response = self.send(builder, IdentityError::InvalidCredentials).await?;
        let token: TokenResponse = Self::parse(response).await?;
        Ok(token.into())
    }

    async fn sign_up(&self, request: SignUp) -> IdentityResult<SignUpOutcome> {
        let mut body = json!({ "email": request.email, "password": request.password });
        if let Some(full_name) = &request.full_name {
            body["data"] = json!({ "full_name": full_name });
        }

        let builder = self
            .client
            .post(self.endpoint("signup"))
            .query(&[("redirect_to", request.redirect_to.as_str())])
            .json(&body);

        let response = self.send(builder, IdentityError::Rejected).await?;
        match Self::parse::<SignUpResponse>(response).await? {
            SignUpResponse::Session(token) => {
                let session: Session = token.into();
                Ok(SignUpOutcome {
                    identity: Some(session.identity.clone()),
                    session: Some(session),
                    confirmation_required: false,
                })
            }
            SignUpResponse::User(user) => Ok(SignUpOutcome {
                identity: Some(user.into()),
                session: None,
                confirmation_required: true,
            }),
        }
    }

    fn authorize(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> IdentityResult<OAuthRedirect> {
        let verifier = Alphanumeric.sample_string(&mut rand::rng(), VERIFIER_LEN);
        let url = self.authorize_url(provider, redirect_to, &code_challenge(&verifier))?;

        Ok(OAuthRedirect {
            url: url.to_string(),
            code_verifier: Some(verifier),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> IdentityResult<Session> {
        let verifier = code_verifier
            .ok_or_else(|| IdentityError::Rejected("Missing code verifier".to_string()))?;

        let builder = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "pkce")])
            .json(&json!({ "auth_code": code, "code_verifier": verifier }));

        let response = self.send(builder, IdentityError::Rejected).await?;
        let token: TokenResponse = Self::parse(response).await?;
        Ok(token.into())
    }

    async fn identity_for_token(&self, access_token: &str) -> IdentityResult<Identity> {
        let builder = self.client.get(self.endpoint("user")).bearer_auth(access_token);

        let response = self
            .send(builder, |_| IdentityError::InvalidToken)
            .await?;
        let user: RemoteUser = Self::parse(response).await?;
        Ok(user.into())
    }

    async fn sign_out(&self, access_token: &str) -> IdentityResult<()> {
        let builder = self.client.post(self.endpoint("logout")).bearer_auth(access_token);
        self.send(builder, |_| IdentityError::InvalidToken).await?;
        Ok(())
    }
}
