//! Gateway side of the identity RPC boundary.
//!
//! [`IdentityClient`] is the capability the rest of the gateway is written
//! against. [`GrpcIdentityClient`] implements it over one long-lived tonic
//! [`Channel`], which multiplexes all in-flight requests; tests substitute an
//! in-memory implementation.

use stream_hive_core::proto::{
    GetUserByEmailRequest, GetUserByIdRequest, InsertUserRequest,
    identity_service_client::IdentityServiceClient,
};
use stream_hive_core::{User, UserId};
use tokio::time::Instant;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

/// Fields of a user to be created. The password is already hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// The three identity RPCs.
///
/// Lookups that match nothing resolve to `Ok(None)`. Every call takes the
/// request's deadline, which is forwarded to the server.
#[tonic::async_trait]
pub trait IdentityClient: Send + Sync + 'static {
    async fn get_user_by_id(&self, id: UserId, deadline: Instant) -> Result<Option<User>, Status>;

    async fn get_user_by_email(
        &self,
        email: &str,
        deadline: Instant,
    ) -> Result<Option<User>, Status>;

    async fn insert_user(&self, user: NewUser, deadline: Instant) -> Result<User, Status>;
}

/// [`IdentityClient`] over gRPC.
#[derive(Clone, Debug)]
pub struct GrpcIdentityClient {
    inner: IdentityServiceClient<Channel>,
}

impl GrpcIdentityClient {
    /// Creates a client whose connection is established on first use, so the
    /// gateway can start before the identity service is reachable.
    pub fn connect_lazy(address: &str) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(address.to_string())?
            .tcp_nodelay(true)
            .connect_lazy();
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: IdentityServiceClient::new(channel),
        }
    }
}

/// Wraps `msg` in a request whose `grpc-timeout` is the time left until
/// `deadline`.
fn with_deadline<T>(msg: T, deadline: Instant) -> Result<Request<T>, Status> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(Status::deadline_exceeded("request deadline elapsed"));
    }
    let mut req = Request::new(msg);
    req.set_timeout(remaining);
    Ok(req)
}

#[tonic::async_trait]
impl IdentityClient for GrpcIdentityClient {
    async fn get_user_by_id(&self, id: UserId, deadline: Instant) -> Result<Option<User>, Status> {
        let req = with_deadline(GetUserByIdRequest { id }, deadline)?;
        let reply = self.inner.clone().get_user_by_id(req).await?;
        Ok(reply.into_inner().user.map(User::from))
    }

    async fn get_user_by_email(
        &self,
        email: &str,
        deadline: Instant,
    ) -> Result<Option<User>, Status> {
        let req = with_deadline(
            GetUserByEmailRequest {
                email: email.to_string(),
            },
            deadline,
        )?;
        let reply = self.inner.clone().get_user_by_email(req).await?;
        Ok(reply.into_inner().user.map(User::from))
    }

    async fn insert_user(&self, user: NewUser, deadline: Instant) -> Result<User, Status> {
        let req = with_deadline(
            InsertUserRequest {
                email: user.email,
                password_hash: user.password_hash,
                full_name: user.full_name,
            },
            deadline,
        )?;
        let reply = self.inner.clone().insert_user(req).await?;
        Ok(User::from(reply.into_inner()))
    }
}
