//! RPC-level tests for the identity service against an in-memory store.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stream_hive_core::proto::{
    GetUserByEmailRequest, GetUserByIdRequest, InsertUserRequest,
    identity_service_server::IdentityService,
};
use stream_hive_core::{User, UserId};
use stream_hive_identity::server::service::UserDataService;
use stream_hive_identity::server::store::{InsertUserParams, Queries, StoreError};
use tonic::{Code, Request};

/// Store double with the same uniqueness and nullable-text behavior as the
/// `users` table.
#[derive(Default)]
struct MemoryQueries {
    users: Mutex<Vec<User>>,
    unavailable: AtomicBool,
}

impl MemoryQueries {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.users.lock().len()
    }
}

#[tonic::async_trait]
impl Queries for MemoryQueries {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        Ok(self.users.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        Ok(self.users.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, params: InsertUserParams<'_>) -> Result<User, StoreError> {
        self.check_available()?;
        let mut users = self.users.lock();
        if users.iter().any(|u| u.email == params.email) {
            return Err(StoreError::DuplicateEmail {
                email: params.email.to_string(),
            });
        }
        let user = User {
            id: users.len() as UserId + 1,
            email: params.email.to_string(),
            password_hash: params.password_hash.to_string(),
            full_name: params.full_name.to_string(),
            profile_picture_url: String::new(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

fn service() -> (UserDataService, Arc<MemoryQueries>) {
    let queries = Arc::new(MemoryQueries::default());
    (UserDataService::new(queries.clone()), queries)
}

fn insert_request(email: &str) -> Request<InsertUserRequest> {
    Request::new(InsertUserRequest {
        email: email.to_string(),
        password_hash: "$2b$12$abcdefghijklmnopqrstuu".to_string(),
        full_name: "A".to_string(),
    })
}

#[tokio::test]
async fn unknown_id_returns_an_absent_user_without_error() {
    let (service, _) = service();

    let reply = service
        .get_user_by_id(Request::new(GetUserByIdRequest { id: 404 }))
        .await
        .unwrap()
        .into_inner();

    assert!(reply.user.is_none());
}

#[tokio::test]
async fn unknown_email_returns_an_absent_user_without_error() {
    let (service, _) = service();

    let reply = service
        .get_user_by_email(Request::new(GetUserByEmailRequest {
            email: "nobody@x.com".to_string(),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(reply.user.is_none());
}

#[tokio::test]
async fn inserted_user_is_found_by_id_and_email() {
    let (service, _) = service();

    let inserted = service
        .insert_user(insert_request("a@x.com"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(inserted.email, "a@x.com");
    assert_eq!(inserted.full_name, "A");

    let by_id = service
        .get_user_by_id(Request::new(GetUserByIdRequest { id: inserted.id }))
        .await
        .unwrap()
        .into_inner()
        .user
        .unwrap();
    assert_eq!(by_id, inserted);

    let by_email = service
        .get_user_by_email(Request::new(GetUserByEmailRequest {
            email: "a@x.com".to_string(),
        }))
        .await
        .unwrap()
        .into_inner()
        .user
        .unwrap();
    assert_eq!(by_email, inserted);
}

#[tokio::test]
async fn service_stores_the_hash_it_was_given() {
    let (service, _) = service();

    let inserted = service
        .insert_user(insert_request("a@x.com"))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(inserted.password_hash, "$2b$12$abcdefghijklmnopqrstuu");
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_a_second_row() {
    let (service, queries) = service();

    service.insert_user(insert_request("a@x.com")).await.unwrap();
    let status = service
        .insert_user(insert_request("a@x.com"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::AlreadyExists);
    assert!(status.message().contains("a@x.com"));
    assert_eq!(queries.len(), 1);
}

#[tokio::test]
async fn store_faults_surface_as_internal_errors() {
    let (service, queries) = service();
    queries.unavailable.store(true, Ordering::SeqCst);

    let status = service
        .get_user_by_id(Request::new(GetUserByIdRequest { id: 1 }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("pool timed out"));

    let status = service
        .get_user_by_email(Request::new(GetUserByEmailRequest {
            email: "a@x.com".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);

    let status = service
        .insert_user(insert_request("a@x.com"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
}

#[tokio::test]
async fn insert_forwards_the_request_without_validating_it() {
    let (service, queries) = service();

    let user = service
        .insert_user(insert_request("  "))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(user.email, "  ");
    assert_eq!(queries.len(), 1);
}

#[tokio::test]
async fn requests_after_shutdown_are_refused() {
    let (service, _) = service();
    service.shutdown();

    let status = service
        .get_user_by_id(Request::new(GetUserByIdRequest { id: 1 }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
}
