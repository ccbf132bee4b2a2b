//! Signing key sources.
//!
//! Both providers read a PEM-encoded RSA private key (PKCS#1 or PKCS#8) from
//! disk. Replacing the file rotates the key for every provider: the
//! [`FileKeyProvider`] re-reads it on each call, the [`CachedKeyProvider`]
//! reloads it whenever the file's modification time changes.

use super::TokenError;
use jsonwebtoken::EncodingKey;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Source of the key used to sign one kind of token.
#[tonic::async_trait]
pub trait KeyProvider: Send + Sync + 'static {
    async fn current_key(&self) -> Result<Arc<EncodingKey>, TokenError>;
}

/// Reads and parses the key file on every call.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[tonic::async_trait]
impl KeyProvider for FileKeyProvider {
    async fn current_key(&self) -> Result<Arc<EncodingKey>, TokenError> {
        load_key(&self.path).await.map(Arc::new)
    }
}

struct CachedKey {
    modified: SystemTime,
    key: Arc<EncodingKey>,
}

/// Keeps the parsed key in memory until the file's modification time
/// changes.
pub struct CachedKeyProvider {
    path: PathBuf,
    cached: Mutex<Option<CachedKey>>,
}

impl CachedKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    async fn modified(&self) -> Result<SystemTime, TokenError> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
            .map_err(|source| TokenError::KeyRead {
                path: self.path.clone(),
                source,
            })
    }
}

#[tonic::async_trait]
impl KeyProvider for CachedKeyProvider {
    async fn current_key(&self) -> Result<Arc<EncodingKey>, TokenError> {
        let modified = self.modified().await?;

        let hit = self
            .cached
            .lock()
            .as_ref()
            .filter(|cached| cached.modified == modified)
            .map(|cached| Arc::clone(&cached.key));
        if let Some(key) = hit {
            return Ok(key);
        }

        let key = Arc::new(load_key(&self.path).await?);
        tracing::info!(path = %self.path.display(), "Loaded signing key");
        *self.cached.lock() = Some(CachedKey {
            modified,
            key: Arc::clone(&key),
        });
        Ok(key)
    }
}

/// Reads and parses an RSA private key in PEM form.
pub async fn load_key(path: &Path) -> Result<EncodingKey, TokenError> {
    let pem = tokio::fs::read(path)
        .await
        .map_err(|source| TokenError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
    EncodingKey::from_rsa_pem(&pem).map_err(|source| TokenError::KeyParse {
        path: path.to_path_buf(),
        source,
    })
}
