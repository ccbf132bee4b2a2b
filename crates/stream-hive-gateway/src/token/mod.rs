//! RS256 token issuance.
//!
//! Tokens are stateless: validity is decided entirely by the signature and
//! `exp`. Every token carries
//!
//! ```json
//! { "exp": 0, "iat": 0, "iss": "stream-hive",
//!   "user": { "user_id": "42", "email": "...", "profile_picture_url": "..." } }
//! ```
//!
//! and refresh tokens additionally carry `"type": "refresh_token"`.

pub mod key;

use crate::config::TokenConfig;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header};
use key::{CachedKeyProvider, FileKeyProvider, KeyProvider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use stream_hive_core::User;

pub const ISSUER: &str = "stream-hive";

/// `type` marker carried only by refresh tokens.
pub const REFRESH_TOKEN_TYPE: &str = "refresh_token";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to read signing key {}: {source}", path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse signing key {}: {source}", path.display())]
    KeyParse {
        path: PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// The subset of a user embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimUser {
    /// Decimal string form of the numeric id.
    pub user_id: String,
    pub email: String,
    pub profile_picture_url: String,
}

impl From<&User> for ClaimUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
            email: user.email.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub user: ClaimUser,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Signs an access token for `user` expiring at `expiry`.
pub async fn create_access_token(
    user: &User,
    expiry: DateTime<Utc>,
    keys: &dyn KeyProvider,
) -> Result<String, TokenError> {
    sign(user, expiry, None, keys).await
}

/// Signs a refresh token for `user` expiring at `expiry`.
pub async fn create_refresh_token(
    user: &User,
    expiry: DateTime<Utc>,
    keys: &dyn KeyProvider,
) -> Result<String, TokenError> {
    sign(user, expiry, Some(REFRESH_TOKEN_TYPE), keys).await
}

async fn sign(
    user: &User,
    expiry: DateTime<Utc>,
    token_type: Option<&str>,
    keys: &dyn KeyProvider,
) -> Result<String, TokenError> {
    let key = keys.current_key().await?;
    let claims = Claims {
        exp: expiry.timestamp(),
        iat: Utc::now().timestamp(),
        iss: ISSUER.to_string(),
        user: ClaimUser::from(user),
        token_type: token_type.map(str::to_string),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(TokenError::Signing)
}

/// Tokens handed back on sign-up and login.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl core::fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Issues the token pair for a user using the configured keys and lifetimes.
#[derive(Clone)]
pub struct TokenIssuer {
    access_keys: Arc<dyn KeyProvider>,
    refresh_keys: Option<Arc<dyn KeyProvider>>,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(
        access_keys: Arc<dyn KeyProvider>,
        refresh_keys: Option<Arc<dyn KeyProvider>>,
        access_ttl: core::time::Duration,
        refresh_ttl: core::time::Duration,
    ) -> Self {
        Self {
            access_keys,
            refresh_keys,
            access_ttl: to_chrono(access_ttl),
            refresh_ttl: to_chrono(refresh_ttl),
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        let provider = |path: &PathBuf| -> Arc<dyn KeyProvider> {
            if config.cache_keys {
                Arc::new(CachedKeyProvider::new(path.clone()))
            } else {
                Arc::new(FileKeyProvider::new(path.clone()))
            }
        };
        Self::new(
            provider(&config.access_key_path),
            config.refresh_key_path.as_ref().map(provider),
            config.access_token_expiry,
            config.refresh_token_expiry,
        )
    }

    /// Signs the access token and, when a refresh key is configured, the
    /// refresh token. Expiries are "now plus the configured lifetime".
    #[tracing::instrument(skip_all, fields(user_id = user.id))]
    pub async fn issue(&self, user: &User) -> Result<IssuedTokens, TokenError> {
        let now = Utc::now();
        let access_token =
            create_access_token(user, now + self.access_ttl, self.access_keys.as_ref()).await?;

        let refresh_token = match &self.refresh_keys {
            Some(keys) => {
                Some(create_refresh_token(user, now + self.refresh_ttl, keys.as_ref()).await?)
            }
            None => None,
        };

        Ok(IssuedTokens {
            access_token,
            refresh_token,
        })
    }
}

fn to_chrono(ttl: core::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const ACCESS_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/access_public.pem");
    const REFRESH_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/refresh_public.pem");

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn user() -> User {
        User {
            id: 42,
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            full_name: "A".to_string(),
            profile_picture_url: "https://cdn/a.png".to_string(),
        }
    }

    fn decode(token: &str, public_pem: &[u8]) -> Claims {
        let key = DecodingKey::from_rsa_pem(public_pem).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .unwrap()
            .claims
    }

    fn issuer(refresh: bool) -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(FileKeyProvider::new(fixture("access_private.pem"))),
            refresh.then(|| {
                Arc::new(FileKeyProvider::new(fixture("refresh_private.pem")))
                    as Arc<dyn KeyProvider>
            }),
            core::time::Duration::from_secs(3600),
            core::time::Duration::from_secs(168 * 3600),
        )
    }

    #[tokio::test]
    async fn access_token_carries_the_claim_subset() {
        let tokens = issuer(false).issue(&user()).await.unwrap();
        let claims = decode(&tokens.access_token, ACCESS_PUBLIC);

        assert_eq!(claims.iss, "stream-hive");
        assert_eq!(claims.user.user_id, "42");
        assert_eq!(claims.user.email, "a@x.com");
        assert_eq!(claims.user.profile_picture_url, "https://cdn/a.png");
        assert_eq!(claims.token_type, None);
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn expiry_window_matches_the_configured_lifetime() {
        let tokens = issuer(true).issue(&user()).await.unwrap();

        let access = decode(&tokens.access_token, ACCESS_PUBLIC);
        assert!((access.exp - access.iat - 3600).abs() <= 1);

        let refresh = decode(&tokens.refresh_token.unwrap(), REFRESH_PUBLIC);
        assert!((refresh.exp - refresh.iat - 168 * 3600).abs() <= 1);
    }

    #[tokio::test]
    async fn only_refresh_tokens_carry_the_type_marker() {
        let tokens = issuer(true).issue(&user()).await.unwrap();

        let access = decode(&tokens.access_token, ACCESS_PUBLIC);
        let refresh = decode(&tokens.refresh_token.unwrap(), REFRESH_PUBLIC);
        assert_eq!(access.token_type, None);
        assert_eq!(refresh.token_type.as_deref(), Some("refresh_token"));
    }

    #[tokio::test]
    async fn access_token_does_not_verify_under_the_refresh_key() {
        let tokens = issuer(true).issue(&user()).await.unwrap();
        let key = DecodingKey::from_rsa_pem(REFRESH_PUBLIC).unwrap();
        let res = jsonwebtoken::decode::<Claims>(
            &tokens.access_token,
            &key,
            &Validation::new(Algorithm::RS256),
        );
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn password_hash_is_not_embedded() {
        let tokens = issuer(true).issue(&user()).await.unwrap();
        let claims = decode(&tokens.access_token, ACCESS_PUBLIC);
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn unreadable_key_fails_issuance() {
        let issuer = TokenIssuer::new(
            Arc::new(FileKeyProvider::new("/nonexistent/key.pem")),
            None,
            core::time::Duration::from_secs(3600),
            core::time::Duration::from_secs(3600),
        );
        let err = issuer.issue(&user()).await.unwrap_err();
        assert!(matches!(err, TokenError::KeyRead { .. }));
    }
}
