use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use stream_hive_core::telemetry::init_telemetry;
use stream_hive_gateway::{
    api,
    client::GrpcIdentityClient,
    config::{GatewayArgs, GatewayConfig},
    state::AppState,
    token::{TokenIssuer, key::load_key},
    user_manager::UserManager,
};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = GatewayArgs::parse();
    let config = GatewayConfig::try_from(args)?;

    let providers = init_telemetry(&config.service_name, config.environment.log_format())?;
    log_startup_info(&config);
    check_signing_keys(&config).await;

    let client = GrpcIdentityClient::connect_lazy(&config.database_service_address)?;
    let state = AppState::new(
        UserManager::new(Arc::new(client)),
        TokenIssuer::from_config(&config.tokens),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on {addr}");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down successfully");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &GatewayConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting gateway with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting gateway {} ({}) on port {}, identity service at {}",
            config.service_name,
            config.environment,
            config.http_port,
            config.database_service_address
        );
    }
}

/// Keys are re-read when tokens are signed, so an unreadable key is reported
/// here but does not stop startup.
async fn check_signing_keys(config: &GatewayConfig) {
    let paths = core::iter::once(&config.tokens.access_key_path)
        .chain(config.tokens.refresh_key_path.as_ref());
    for path in paths {
        if let Err(e) = load_key(path).await {
            tracing::warn!("Signing key is not usable yet: {e}");
        }
    }
    if config.tokens.refresh_key_path.is_none() {
        tracing::warn!("JWT_REFRESH_TOKEN_PRIVATE_KEY_PATH is unset; no refresh tokens will be issued");
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
