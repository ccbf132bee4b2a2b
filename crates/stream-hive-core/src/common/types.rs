//! # Shared identity types
//!
//! The [`User`] record is the one piece of state that crosses the gRPC
//! boundary between the gateway and the data-access service. It is created by
//! `InsertUser`, read by `GetUserById` / `GetUserByEmail`, and never mutated
//! or deleted.
//!
//! Optional text columns follow a nullable-scalar convention: a `NULL` column
//! reads back as an empty string, and an empty string is written as `NULL`.
//! There is no distinction between "explicitly empty" and "never set".

use crate::proto;
use core::fmt;

/// Store-assigned, immutable user identifier.
pub type UserId = i64;

/// A durable identity record.
///
/// `password_hash` holds bcrypt output. It is excluded from the
/// [`fmt::Debug`] output so that records can be logged safely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    /// Empty when absent.
    pub full_name: String,
    /// Empty when absent.
    pub profile_picture_url: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("profile_picture_url", &self.profile_picture_url)
            .finish()
    }
}

impl From<proto::User> for User {
    fn from(user: proto::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            profile_picture_url: user.profile_picture_url,
        }
    }
}

impl From<User> for proto::User {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            profile_picture_url: user.profile_picture_url,
        }
    }
}

/// Maps an optional text value onto the nullable-column convention.
///
/// Empty input becomes `None` so the store writes `NULL`.
pub fn to_nullable(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

/// Maps a nullable column back to a plain string (`NULL` reads as empty).
pub fn from_nullable(value: Option<String>) -> String {
    value.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_password_hash() {
        let user = User {
            id: 7,
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{user:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("$2b$12$secret"));
    }

    #[test]
    fn proto_conversion_preserves_every_field() {
        let user = User {
            id: 42,
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "A".to_string(),
            profile_picture_url: "https://cdn.example/a.png".to_string(),
        };
        let wire: proto::User = user.clone().into();
        assert_eq!(User::from(wire), user);
    }

    #[test]
    fn nullable_text_treats_empty_as_absent() {
        assert_eq!(to_nullable(""), None);
        assert_eq!(to_nullable("A"), Some("A"));
        assert_eq!(from_nullable(None), "");
        assert_eq!(from_nullable(Some("A".to_string())), "A");
    }
}
