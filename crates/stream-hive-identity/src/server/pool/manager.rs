//! Bounded PostgreSQL connection pool with a background health check.
//!
//! [`ConnectionPool`] wraps a `sqlx` [`PgPool`] configured from
//! [`PoolConfig`]: at most `max_connections` are checked out at once, at least
//! `min_connections` are kept warm, and idle connections above the minimum are
//! closed after the idle timeout. Callers that acquire while the pool is
//! saturated wait for a connection to be released; the wait is bounded by the
//! caller's own deadline (the acquire timeout is only a backstop).
//!
//! A health-check task runs on a fixed interval until [`ConnectionPool::close`]
//! cancels it through a shared [`CancellationToken`].

use super::health::health_check_loop;
use crate::server::config::PoolConfig;
use core::time::Duration;
use parking_lot::Mutex;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Upper bound on how long an acquire may wait. Set well above the gateway's
/// 15 second request bound so the propagated request deadline fires first.
pub const ACQUIRE_TIMEOUT_BACKSTOP: Duration = Duration::from_secs(60);

/// The process-wide pool of store connections.
///
/// This is the only cross-request shared mutable resource of the identity
/// service; all store access goes through [`ConnectionPool::pool`].
pub struct ConnectionPool {
    pool: PgPool,
    shutdown_token: CancellationToken,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// Connects to the store and starts the health-check task.
    ///
    /// Connecting is eager: an unreachable store or a malformed connection
    /// string fails here, which aborts startup.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error when the first connection cannot be
    /// established.
    pub async fn connect(database_url: &str, config: PoolConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(ACQUIRE_TIMEOUT_BACKSTOP)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connection pool established"
        );

        Ok(Self::from_pool(pool, config))
    }

    /// Wraps an existing pool and starts the health-check task.
    pub fn from_pool(pool: PgPool, config: PoolConfig) -> Self {
        let shutdown_token = CancellationToken::new();
        let health_task = tokio::spawn(health_check_loop(
            pool.clone(),
            config,
            shutdown_token.clone(),
        ));

        Self {
            pool,
            shutdown_token,
            health_task: Mutex::new(Some(health_task)),
        }
    }

    /// The underlying pool handle. Cloning a [`PgPool`] is cheap and shares
    /// the same connection set.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Number of connections currently checked out.
    pub fn in_use(&self) -> u32 {
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX);
        self.pool.size().saturating_sub(idle)
    }

    /// Stops the health check and closes every connection.
    ///
    /// Waits up to 3 seconds for the health-check task to acknowledge
    /// cancellation, then waits for checked-out connections to be returned.
    pub async fn close(&self) {
        tracing::info!("Closing connection pool");
        self.shutdown_token.cancel();

        let handle = self.health_task.lock().take();
        if let Some(handle) = handle {
            match timeout(Duration::from_secs(3), handle).await {
                Ok(Ok(())) => tracing::debug!("Pool health check stopped"),
                Ok(Err(e)) => tracing::error!("Pool health check task failed: {e}"),
                Err(_) => tracing::warn!("Pool health check shutdown timed out"),
            }
        }

        self.pool.close().await;
        tracing::info!("Connection pool closed");
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
