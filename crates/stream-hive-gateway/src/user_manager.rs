use crate::client::{IdentityClient, NewUser};
use std::sync::Arc;
use stream_hive_core::{User, UserId};
use tokio::time::Instant;
use tonic::Status;

/// Domain-shaped access to user records.
///
/// Each call is forwarded once to the [`IdentityClient`] and its outcome is
/// returned unchanged. "No such user" is `Ok(None)`.
#[derive(Clone)]
pub struct UserManager {
    client: Arc<dyn IdentityClient>,
}

impl UserManager {
    pub fn new(client: Arc<dyn IdentityClient>) -> Self {
        Self { client }
    }

    pub async fn get_user_by_id(
        &self,
        id: UserId,
        deadline: Instant,
    ) -> Result<Option<User>, Status> {
        self.client.get_user_by_id(id, deadline).await
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
        deadline: Instant,
    ) -> Result<Option<User>, Status> {
        self.client.get_user_by_email(email, deadline).await
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: String,
        full_name: &str,
        deadline: Instant,
    ) -> Result<User, Status> {
        let user = NewUser {
            email: email.to_string(),
            password_hash,
            full_name: full_name.to_string(),
        };
        self.client.insert_user(user, deadline).await
    }
}
