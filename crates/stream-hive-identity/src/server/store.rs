//! Credential store access.
//!
//! Three single-statement operations over the `users` table: fetch by id,
//! fetch by email, insert. "No such user" is `Ok(None)`, never an error, so
//! callers can tell a missing row apart from an unavailable store.
//!
//! Optional text columns follow the nullable-scalar convention from
//! [`stream_hive_core::types`]: empty input is written as `NULL`, `NULL` reads
//! back as an empty string.

use sqlx::PgPool;
use stream_hive_core::types::{from_nullable, to_nullable};
use stream_hive_core::{Error, User, UserId};

const GET_USER_BY_ID: &str = "SELECT id, email, password_hash, full_name, profile_picture_url \
     FROM users WHERE id = $1";

const GET_USER_BY_EMAIL: &str = "SELECT id, email, password_hash, full_name, profile_picture_url \
     FROM users WHERE email = $1";

const INSERT_USER: &str = "INSERT INTO users (email, password_hash, full_name) VALUES ($1, $2, $3) \
     RETURNING id, email, password_hash, full_name, profile_picture_url";

/// Failures of the credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unique constraint on `users.email` rejected an insert.
    #[error("user with email {email} already exists")]
    DuplicateEmail { email: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail { email } => Error::DuplicateEmail { email },
            StoreError::Database(e) => Error::Store {
                context: e.to_string(),
            },
        }
    }
}

/// Parameters of [`Queries::insert_user`].
#[derive(Debug, Clone, Copy)]
pub struct InsertUserParams<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    /// Empty means absent.
    pub full_name: &'a str,
}

/// The narrow query interface the identity service is written against.
///
/// [`PgQueries`] is the production implementation; tests substitute an
/// in-memory one.
#[tonic::async_trait]
pub trait Queries: Send + Sync + 'static {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a user and returns the stored row. Uniqueness of `email` is
    /// enforced by the store, not pre-checked.
    async fn insert_user(&self, params: InsertUserParams<'_>) -> Result<User, StoreError>;
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    profile_picture_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: from_nullable(row.full_name),
            profile_picture_url: from_nullable(row.profile_picture_url),
        }
    }
}

/// PostgreSQL-backed [`Queries`].
#[derive(Clone)]
pub struct PgQueries {
    pool: PgPool,
}

impl PgQueries {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[tonic::async_trait]
impl Queries for PgQueries {
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(GET_USER_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(GET_USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&self, params: InsertUserParams<'_>) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, UserRow>(INSERT_USER)
            .bind(params.email)
            .bind(params.password_hash)
            .bind(to_nullable(params.full_name))
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(User::from(row)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateEmail {
                    email: params.email.to_string(),
                })
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_columns_read_back_as_empty_strings() {
        let user = User::from(UserRow {
            id: 1,
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            profile_picture_url: None,
        });
        assert_eq!(user.full_name, "");
        assert_eq!(user.profile_picture_url, "");
    }

    #[test]
    fn duplicate_email_keeps_its_kind_across_the_boundary() {
        let err: Error = StoreError::DuplicateEmail {
            email: "a@x.com".to_string(),
        }
        .into();
        assert_eq!(
            err,
            Error::DuplicateEmail {
                email: "a@x.com".to_string()
            }
        );
    }

    #[test]
    fn database_faults_become_store_errors() {
        let err: Error = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, Error::Store { .. }));
    }
}
