use clap::Parser;
use std::sync::Arc;
use stream_hive_core::proto::{
    FILE_DESCRIPTOR_SET, identity_service_server::IdentityServiceServer,
};
use stream_hive_core::telemetry::{TelemetryProviders, init_telemetry};
use stream_hive_identity::server::{
    config::{CliArgs, ServerConfig},
    pool::ConnectionPool,
    service::UserDataService,
    store::{PgQueries, run_migrations},
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(&config.service_name, config.environment.log_format())?;
    log_startup_info(&config);

    // A pool that cannot be built is fatal; there is no degraded mode.
    let pool = Arc::new(ConnectionPool::connect(&config.database_url, config.pool).await?);

    if config.run_migrations {
        run_migrations(pool.pool()).await?;
        tracing::info!("Schema migrations applied");
    }

    let listener = TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Identity service listening on {}", config.server_addr);

    let res = run_server(listener, config, Arc::clone(&pool), providers).await;
    pool.close().await;
    res
}

async fn run_server(
    listener: TcpListener,
    config: ServerConfig,
    pool: Arc<ConnectionPool>,
    providers: TelemetryProviders,
) -> anyhow::Result<()> {
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<IdentityServiceServer<UserDataService>>()
        .await;

    let service = UserDataService::new(Arc::new(PgQueries::new(pool.pool().clone())));

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .max_concurrent_streams(Some(config.max_concurrent_streams))
        .http2_adaptive_window(Some(true))
        .add_service(health_service)
        .add_service(reflection)
        .add_service(IdentityServiceServer::new(service.clone()))
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown_signal(service, health_reporter, providers),
        )
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting identity service with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting identity service {} ({}) on {} with pool {}..{}",
            config.service_name,
            config.environment,
            config.server_addr,
            config.pool.min_connections,
            config.pool.max_connections
        );
    }
}

async fn shutdown_signal(
    service: UserDataService,
    health_reporter: HealthReporter,
    providers: TelemetryProviders,
) {
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

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<IdentityServiceServer<UserDataService>>()
        .await;

    // 2. Refuse new work; the pool is closed once the server has drained
    service.shutdown();

    // 3. Flush exported spans
    providers.shutdown();
}
