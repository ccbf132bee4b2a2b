use crate::server::config::PoolConfig;
use sqlx::PgPool;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Background task that periodically verifies the store is reachable.
///
/// Every `health_check_interval` the task runs a trivial query through the
/// pool and logs the pool occupancy. `sqlx` replenishes connections up to
/// `min_connections` on its own; a failed ping is logged but never stops the
/// loop, so a store outage shows up in the logs and recovers without a
/// restart.
///
/// The loop exits once `shutdown_token` is cancelled.
pub async fn health_check_loop(pool: PgPool, config: PoolConfig, shutdown_token: CancellationToken) {
    tracing::trace!("Pool health check started");

    let mut ticker = interval(config.health_check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the pool was just verified by
    // `connect`.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown_token.cancelled() => break,
            _ = ticker.tick() => {
                match sqlx::query("SELECT 1").execute(&pool).await {
                    Ok(_) => tracing::debug!(
                        size = pool.size(),
                        idle = pool.num_idle(),
                        min_connections = config.min_connections,
                        max_connections = config.max_connections,
                        "Pool health check passed"
                    ),
                    Err(e) => tracing::warn!(
                        size = pool.size(),
                        idle = pool.num_idle(),
                        "Pool health check failed: {e}"
                    ),
                }
            }
        }
    }

    tracing::trace!("Pool health check stopped");
}
