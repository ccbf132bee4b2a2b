use crate::config::REQUEST_TIMEOUT;
use crate::password::{self, HASH_COST, PasswordError};
use crate::token::TokenIssuer;
use crate::user_manager::UserManager;
use core::time::Duration;
use std::sync::Arc;
use tokio::sync::OnceCell;

const DECOY_PASSWORD: &str = "stream-hive-decoy";

/// Shared handler state. Built once at startup; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub users: UserManager,
    pub tokens: TokenIssuer,
    pub request_timeout: Duration,
    pub hash_cost: u32,
    decoy_hash: Arc<OnceCell<String>>,
}

impl AppState {
    pub fn new(users: UserManager, tokens: TokenIssuer) -> Self {
        Self {
            users,
            tokens,
            request_timeout: REQUEST_TIMEOUT,
            hash_cost: HASH_COST,
            decoy_hash: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self.decoy_hash = Arc::default();
        self
    }

    /// A hash at [`Self::hash_cost`], computed on first use. Login verifies
    /// against it when the email is unknown and always rejects afterwards.
    pub async fn decoy_hash(&self) -> Result<String, PasswordError> {
        let cost = self.hash_cost;
        let hash = self
            .decoy_hash
            .get_or_try_init(|| password::hash_password(DECOY_PASSWORD.to_string(), cost))
            .await?;
        Ok(hash.clone())
    }
}
