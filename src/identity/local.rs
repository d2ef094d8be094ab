/**
 * Local identity provider
 * bcrypt password credentials in the store, HS256 JWT access tokens
 */
use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Identity, IdentityError, IdentityProvider, IdentityResult, OAuthProvider, OAuthRedirect,
    Session, SignUp, SignUpOutcome,
};
use crate::db::models::{Credential, NewUser, Role};
use crate::db::{Store, StoreError};

/// Access token lifetime in minutes
const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 60;

const MIN_PASSWORD_LEN: usize = 8;

const INVALID_LOGIN: &str = "Invalid login credentials";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct LocalIdentity {
    store: Arc<dyn Store>,
    secret: String,
    /// Signed-out token ids -> their expiry timestamp.
    revoked: RwLock<HashMap<String, i64>>,
}

impl LocalIdentity {
    pub fn new(store: Arc<dyn Store>, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    /// Creates the configured super admin (credential + user row) if missing.
    pub async fn bootstrap_admin(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        let credential = match self.store.find_credential(email).await? {
            Some(existing) => existing,
            None => {
                let credential = Credential {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    full_name: None,
                    created_at: Utc::now(),
                };
                self.store.insert_credential(credential.clone()).await?;
                tracing::info!(email = %email, "bootstrap admin credential created");
                credential
            }
        };

        if self.store.get_user(credential.id).await?.is_none() {
            self.store
                .insert_user(NewUser {
                    id: credential.id,
                    email: credential.email.clone(),
                    full_name: credential.full_name.clone(),
                    avatar_url: None,
                    role: Some(Role::SuperAdmin),
                })
                .await?;
        }
        Ok(())
    }

    fn issue(&self, identity: Identity) -> IdentityResult<Session> {
        let now = Utc::now();
        let exp = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);
        let claims = Claims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            name: identity.full_name.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IdentityError::Internal(e.to_string()))?;

        Ok(Session {
            access_token,
            refresh_token: None,
            expires_in: ACCESS_TOKEN_EXPIRY_MINUTES * 60,
            identity,
        })
    }

    fn decode_claims(&self, token: &str) -> IdentityResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("token verification failed: {}", e);
            IdentityError::InvalidToken
        })
    }
}

fn store_unavailable(e: StoreError) -> IdentityError {
    IdentityError::Unavailable(e.to_string())
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<Session> {
        let credential = self
            .store
            .find_credential(email)
            .await
            .map_err(store_unavailable)?
            .ok_or_else(|| IdentityError::InvalidCredentials(INVALID_LOGIN.to_string()))?;

        // bcrypt is CPU-bound; keep it off the async executor.
        let pwd = password.to_string();
        let hash_clone = credential.password_hash.clone();
        let password_ok =
            tokio::task::spawn_blocking(move || verify(&pwd, &hash_clone).unwrap_or(false))
                .await
                .unwrap_or(false);

        if !password_ok {
            tracing::warn!(email = %credential.email, "failed login attempt");
            return Err(IdentityError::InvalidCredentials(INVALID_LOGIN.to_string()));
        }

        self.issue(Identity {
            id: credential.id,
            email: credential.email,
            full_name: credential.full_name,
            avatar_url: None,
        })
    }

    async fn sign_up(&self, request: SignUp) -> IdentityResult<SignUpOutcome> {
        if !request.email.contains('@') {
            return Err(IdentityError::Rejected(
                "Unable to validate email address: invalid format".to_string(),
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Rejected(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        if self
            .store
            .find_credential(&request.email)
            .await
            .map_err(store_unavailable)?
            .is_some()
        {
            return Err(IdentityError::Rejected("User already registered".to_string()));
        }

        let password = request.password;
        let password_hash = match tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
            .await
        {
            Ok(Ok(h)) => h,
            Ok(Err(e)) => return Err(IdentityError::Internal(e.to_string())),
            Err(e) => return Err(IdentityError::Internal(e.to_string())),
        };

        let credential = Credential {
            id: Uuid::new_v4(),
            email: request.email,
            password_hash,
            full_name: request.full_name,
            created_at: Utc::now(),
        };

        match self.store.insert_credential(credential.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(IdentityError::Rejected("User already registered".to_string()))
            }
            Err(e) => return Err(store_unavailable(e)),
        }

        let identity = Identity {
            id: credential.id,
            email: credential.email,
            full_name: credential.full_name,
            avatar_url: None,
        };
        let session = self.issue(identity.clone())?;

        Ok(SignUpOutcome {
            identity: Some(identity),
            session: Some(session),
            confirmation_required: false,
        })
    }

    fn authorize(
        &self,
        _provider: OAuthProvider,
        _redirect_to: &str,
    ) -> IdentityResult<OAuthRedirect> {
        Err(IdentityError::Unsupported(
            "OAuth sign-in requires a hosted identity provider".to_string(),
        ))
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> IdentityResult<Session> {
        Err(IdentityError::Unsupported(
            "OAuth sign-in requires a hosted identity provider".to_string(),
        ))
    }

    async fn identity_for_token(&self, access_token: &str) -> IdentityResult<Identity> {
        let claims = self.decode_claims(access_token)?;

        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(IdentityError::InvalidToken);
        }

        let id = Uuid::parse_str(&claims.sub).map_err(|_| IdentityError::InvalidToken)?;
        Ok(Identity {
            id,
            email: claims.email,
            full_name: claims.name,
            avatar_url: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> IdentityResult<()> {
        let claims = self.decode_claims(access_token)?;
        let now = Utc::now().timestamp();

        let mut revoked = self.revoked.write().await;
        // expired tokens are rejected by validation anyway
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti, claims.exp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn provider() -> (Arc<MemoryStore>, LocalIdentity) {
        let store = Arc::new(MemoryStore::new());
        let identity = LocalIdentity::new(store.clone(), "test-secret");
        (store, identity)
    }

    fn sign_up_request(email: &str, password: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: password.to_string(),
            full_name: Some("Ada".to_string()),
            redirect_to: "http://localhost:3000/auth/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in_round_trip() {
        let (_, local) = provider();
        let outcome = local
            .sign_up(sign_up_request("ada@example.com", "correct-horse"))
            .await
            .unwrap();
        assert!(!outcome.confirmation_required);

        let session = local
            .sign_in_with_password("ADA@example.com", "correct-horse")
            .await
            .unwrap();
        let who = local.identity_for_token(&session.access_token).await.unwrap();
        assert_eq!(who.email, "ada@example.com");
        assert_eq!(who.full_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_is_invalid_credentials() {
        let (_, local) = provider();
        local
            .sign_up(sign_up_request("ada@example.com", "correct-horse"))
            .await
            .unwrap();

        let err = local
            .sign_in_with_password("ada@example.com", "battery-staple")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials(ref m) if m == INVALID_LOGIN));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password_and_duplicates() {
        let (_, local) = provider();
        let err = local
            .sign_up(sign_up_request("ada@example.com", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));

        local
            .sign_up(sign_up_request("ada@example.com", "long-enough"))
            .await
            .unwrap();
        let err = local
            .sign_up(sign_up_request("ada@example.com", "long-enough"))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "User already registered");
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let (_, local) = provider();
        let outcome = local
            .sign_up(sign_up_request("ada@example.com", "correct-horse"))
            .await
            .unwrap();
        let token = outcome.session.unwrap().access_token;

        local.sign_out(&token).await.unwrap();
        assert!(matches!(
            local.identity_for_token(&token).await,
            Err(IdentityError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let (_, local) = provider();
        assert!(local.identity_for_token("invalid.jwt.token").await.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_creates_super_admin_once() {
        let (store, local) = provider();
        let hash = bcrypt::hash("admin-password", 4).unwrap();

        local.bootstrap_admin("owner@example.com", &hash).await.unwrap();
        local.bootstrap_admin("owner@example.com", &hash).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::SuperAdmin);

        let session = local
            .sign_in_with_password("owner@example.com", "admin-password")
            .await
            .unwrap();
        assert_eq!(session.identity.id, users[0].id);
    }

    #[test]
    fn test_oauth_is_unsupported() {
        let (_, local) = provider();
        assert!(matches!(
            local.authorize(OAuthProvider::Google, "http://localhost:3000/auth/callback"),
            Err(IdentityError::Unsupported(_))
        ));
    }
}
