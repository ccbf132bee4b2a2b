//! gRPC service implementation for user lookups and inserts.
//!
//! [`UserDataService`] implements the `IdentityService` trait generated from
//! `identity.proto`. It is a pure data-access boundary: requests are
//! translated into [`Queries`] calls and storage results are mapped back onto
//! RPC responses. No hashing, retries or uniqueness pre-checks happen here.
//!
//! ## Response mapping
//!
//! - Lookup matched a row: `UserReply { user: Some(..) }`.
//! - Lookup matched nothing: `UserReply { user: None }` with an OK status.
//! - Any store fault: an RPC error carrying the underlying message.

use crate::server::store::{InsertUserParams, Queries};
use std::sync::Arc;
use stream_hive_core::{
    Error,
    proto::{
        GetUserByEmailRequest, GetUserByIdRequest, InsertUserRequest, User, UserReply,
        identity_service_server::IdentityService,
    },
};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

/// gRPC front of the credential store.
///
/// Cloning is cheap; all clones share the same [`Queries`] implementation and
/// shutdown state.
#[derive(Clone)]
pub struct UserDataService {
    queries: Arc<dyn Queries>,
    shutdown_token: CancellationToken,
}

impl UserDataService {
    pub fn new(queries: Arc<dyn Queries>) -> Self {
        Self {
            queries,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Refuses new requests. In-flight requests run to completion.
    pub fn shutdown(&self) {
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();
    }

    fn ensure_serving(&self) -> Result<(), Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl IdentityService for UserDataService {
    #[tracing::instrument(skip_all, fields(user_id = req.get_ref().id))]
    async fn get_user_by_id(
        &self,
        req: Request<GetUserByIdRequest>,
    ) -> Result<Response<UserReply>, Status> {
        self.ensure_serving()?;
        let id = req.into_inner().id;

        match self.queries.get_user_by_id(id).await {
            Ok(user) => {
                tracing::debug!(found = user.is_some(), "Fetched user by id");
                Ok(Response::new(UserReply {
                    user: user.map(User::from),
                }))
            }
            Err(e) => {
                tracing::error!("Error occurred while getting user by id: {e}");
                Err(Error::from(e).into())
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn get_user_by_email(
        &self,
        req: Request<GetUserByEmailRequest>,
    ) -> Result<Response<UserReply>, Status> {
        self.ensure_serving()?;
        let email = req.into_inner().email;

        match self.queries.get_user_by_email(&email).await {
            Ok(user) => {
                tracing::debug!(found = user.is_some(), "Fetched user by email");
                Ok(Response::new(UserReply {
                    user: user.map(User::from),
                }))
            }
            Err(e) => {
                tracing::error!("Error occurred while getting user by email: {e}");
                Err(Error::from(e).into())
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn insert_user(&self, req: Request<InsertUserRequest>) -> Result<Response<User>, Status> {
        self.ensure_serving()?;
        let req = req.into_inner();

        let params = InsertUserParams {
            email: &req.email,
            password_hash: &req.password_hash,
            full_name: &req.full_name,
        };

        match self.queries.insert_user(params).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Inserted user");
                Ok(Response::new(User::from(user)))
            }
            Err(e) => {
                tracing::error!("Error occurred while inserting user: {e}");
                Err(Error::from(e).into())
            }
        }
    }
}
