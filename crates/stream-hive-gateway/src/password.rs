//! bcrypt hashing on the blocking thread pool.

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("password is longer than 72 bytes")]
    TooLong,
}

/// bcrypt only reads this many bytes of input; anything after is ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Work factor used for new hashes.
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hashes `password` with bcrypt at the given work factor. Passwords over
/// [`MAX_PASSWORD_BYTES`] are refused rather than truncated.
pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong);
    }
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Checks `password` against a stored bcrypt hash. A malformed stored hash is
/// reported as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    let matched = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).unwrap_or_else(|e| {
            tracing::warn!("Stored password hash is unusable: {e}");
            false
        })
    })
    .await?;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_and_differs_from_plaintext() {
        let hash = hash_password("p@ss1234".to_string(), HASH_COST).await.unwrap();
        assert_ne!(hash, "p@ss1234");
        assert!(hash.starts_with("$2b$12$"));
        assert!(verify_password("p@ss1234".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash_password("same".to_string(), 4).await.unwrap();
        let b = hash_password("same".to_string(), 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn overlong_password_is_refused() {
        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        assert!(hash_password(at_limit.clone(), 4).await.is_ok());

        let err = hash_password(format!("{at_limit}X"), 4).await.unwrap_err();
        assert!(matches!(err, PasswordError::TooLong));
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_a_mismatch() {
        assert!(!verify_password("p".to_string(), "not-a-hash".to_string()).await.unwrap());
    }
}
