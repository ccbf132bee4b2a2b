use anyhow::{Context, bail};
use clap::Parser;
use core::fmt;
use core::time::Duration;
use percent_encoding::percent_decode_str;
use stream_hive_core::Environment;

/// Idle connections above the warm minimum are closed after this long.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval of the background pool health check.
pub const POOL_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime configuration for the `stream-hive-identity` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first when present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stream-hive-identity",
    version,
    about = "gRPC data-access service for Stream Hive user records"
)]
pub struct CliArgs {
    /// Logical service name attached to logs and exported spans.
    ///
    /// Environment variable: `SERVICE_NAME`
    #[arg(long, env = "SERVICE_NAME", default_value_t = String::from("database-service"))]
    pub service_name: String,

    /// Deployment tier: `production`, `staging`, `development`; anything else
    /// is treated as a local run.
    ///
    /// Environment variable: `APP_ENV`
    #[arg(long, env = "APP_ENV")]
    pub app_env: Option<String>,

    /// Port to listen on. Takes precedence over `SERVER_ADDR` when set.
    ///
    /// Environment variable: `GRPC_PORT`
    #[arg(long, env = "GRPC_PORT")]
    pub grpc_port: Option<u16>,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// PostgreSQL connection string. Percent-encoded characters (for example
    /// `%40` in a password) are decoded before use.
    ///
    /// Environment variable: `DATABASE_URL`
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Upper bound on concurrently checked-out database connections.
    ///
    /// Environment variable: `POOL_MAX_CONNECTIONS`
    #[arg(long, env = "POOL_MAX_CONNECTIONS", default_value_t = 30)]
    pub pool_max_connections: u32,

    /// Number of connections kept warm.
    ///
    /// Environment variable: `POOL_MIN_CONNECTIONS`
    #[arg(long, env = "POOL_MIN_CONNECTIONS", default_value_t = 10)]
    pub pool_min_connections: u32,

    /// Maximum concurrent HTTP/2 streams per client connection. Requests
    /// beyond this bound queue in the transport.
    ///
    /// Environment variable: `MAX_CONCURRENT_STREAMS`
    #[arg(long, env = "MAX_CONCURRENT_STREAMS", default_value_t = 100)]
    pub max_concurrent_streams: u32,

    /// Apply the embedded schema migrations before serving.
    ///
    /// Environment variable: `RUN_MIGRATIONS`
    #[arg(long, env = "RUN_MIGRATIONS", default_value_t = false)]
    pub run_migrations: bool,
}

/// Connection pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout: Duration,
    pub health_check_interval: Duration,
}

impl PoolConfig {
    pub fn new(max_connections: u32, min_connections: u32) -> anyhow::Result<Self> {
        if max_connections == 0 {
            bail!("POOL_MAX_CONNECTIONS must be greater than 0");
        }
        if min_connections > max_connections {
            bail!(
                "POOL_MIN_CONNECTIONS ({min_connections}) exceeds POOL_MAX_CONNECTIONS ({max_connections})"
            );
        }
        Ok(Self {
            max_connections,
            min_connections,
            idle_timeout: POOL_IDLE_TIMEOUT,
            health_check_interval: POOL_HEALTH_CHECK_INTERVAL,
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 30,
            min_connections: 10,
            idle_timeout: POOL_IDLE_TIMEOUT,
            health_check_interval: POOL_HEALTH_CHECK_INTERVAL,
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub service_name: String,
    pub environment: Environment,
    pub server_addr: String,
    pub database_url: String,
    pub pool: PoolConfig,
    pub max_concurrent_streams: u32,
    pub run_migrations: bool,
}

// Hand-written so the connection string (and its password) never reaches the
// startup log.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("service_name", &self.service_name)
            .field("environment", &self.environment)
            .field("server_addr", &self.server_addr)
            .field("database_url", &"<redacted>")
            .field("pool", &self.pool)
            .field("max_concurrent_streams", &self.max_concurrent_streams)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let database_url = decode_database_url(&args.database_url)?;
        if database_url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }

        if args.max_concurrent_streams == 0 {
            bail!("MAX_CONCURRENT_STREAMS must be greater than 0");
        }

        let pool = PoolConfig::new(args.pool_max_connections, args.pool_min_connections)?;

        let server_addr = match args.grpc_port {
            Some(port) => format!("0.0.0.0:{port}"),
            None => args.server_addr,
        };

        let environment = args
            .app_env
            .as_deref()
            .unwrap_or_default()
            .parse::<Environment>()
            .unwrap_or_default();

        Ok(Self {
            service_name: args.service_name,
            environment,
            server_addr,
            database_url,
            pool,
            max_concurrent_streams: args.max_concurrent_streams,
            run_migrations: args.run_migrations,
        })
    }
}

/// Decodes percent-escapes in a connection string (`%40` becomes `@`).
pub fn decode_database_url(raw: &str) -> anyhow::Result<String> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .context("DATABASE_URL is not valid UTF-8 after percent-decoding")?;
    Ok(decoded.into_owned())
}
