use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;
use stream_hive_core::Environment;

/// Server-side budget for one sign-up or login request, independent of any
/// client deadline.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Allowed range for `ACCESS_TOKEN_EXPIRY_HOURS`.
pub const ACCESS_TOKEN_EXPIRY_RANGE: core::ops::RangeInclusive<u32> = 1..=8;

/// Runtime configuration for the `stream-hive-gateway` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first when present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stream-hive-gateway",
    version,
    about = "Public HTTP gateway for Stream Hive sign-up and login"
)]
pub struct GatewayArgs {
    /// Logical service name attached to logs and exported spans.
    ///
    /// Environment variable: `SERVICE_NAME`
    #[arg(long, env = "SERVICE_NAME", default_value_t = String::from("api-stream-hive-gateway"))]
    pub service_name: String,

    /// Deployment tier: `production`, `staging`, `development`; anything else
    /// is treated as a local run.
    ///
    /// Environment variable: `APP_ENV`
    #[arg(long, env = "APP_ENV")]
    pub app_env: Option<String>,

    /// Port the HTTP listener binds on all interfaces.
    ///
    /// Environment variable: `HTTP_PORT`
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Address of the identity service. A bare `host:port` is treated as
    /// plain-text HTTP/2.
    ///
    /// Environment variable: `DATABASE_SERVICE_ADDRESS`
    #[arg(
        long,
        env = "DATABASE_SERVICE_ADDRESS",
        default_value_t = String::from("http://127.0.0.1:50051")
    )]
    pub database_service_address: String,

    /// Lifetime of access tokens in hours (1 to 8).
    ///
    /// Environment variable: `ACCESS_TOKEN_EXPIRY_HOURS`
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY_HOURS", default_value_t = 1)]
    pub access_token_expiry_hours: u32,

    /// Lifetime of refresh tokens in hours.
    ///
    /// Environment variable: `REFRESH_TOKEN_EXPIRY_HOURS`
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY_HOURS", default_value_t = 168)]
    pub refresh_token_expiry_hours: u32,

    /// PEM file (PKCS#1 or PKCS#8) holding the RSA key that signs access
    /// tokens.
    ///
    /// Environment variable: `JWT_ACCESS_TOKEN_PRIVATE_KEY_PATH`
    #[arg(long, env = "JWT_ACCESS_TOKEN_PRIVATE_KEY_PATH")]
    pub jwt_access_token_private_key_path: PathBuf,

    /// PEM file holding the RSA key that signs refresh tokens. When unset, no
    /// refresh token is issued.
    ///
    /// Environment variable: `JWT_REFRESH_TOKEN_PRIVATE_KEY_PATH`
    #[arg(long, env = "JWT_REFRESH_TOKEN_PRIVATE_KEY_PATH")]
    pub jwt_refresh_token_private_key_path: Option<PathBuf>,

    /// Keep parsed signing keys in memory, reloading when the file's
    /// modification time changes. Without it every signature re-reads the key
    /// file.
    ///
    /// Environment variable: `JWT_KEY_CACHE`
    #[arg(long, env = "JWT_KEY_CACHE", default_value_t = false)]
    pub jwt_key_cache: bool,
}

/// Token lifetimes and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub access_token_expiry: Duration,
    pub refresh_token_expiry: Duration,
    pub access_key_path: PathBuf,
    pub refresh_key_path: Option<PathBuf>,
    pub cache_keys: bool,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub service_name: String,
    pub environment: Environment,
    pub http_port: u16,
    pub database_service_address: String,
    pub tokens: TokenConfig,
}

impl TryFrom<GatewayArgs> for GatewayConfig {
    type Error = anyhow::Error;

    fn try_from(args: GatewayArgs) -> Result<Self, Self::Error> {
        if !ACCESS_TOKEN_EXPIRY_RANGE.contains(&args.access_token_expiry_hours) {
            bail!(
                "ACCESS_TOKEN_EXPIRY_HOURS must be between {} and {}, got {}",
                ACCESS_TOKEN_EXPIRY_RANGE.start(),
                ACCESS_TOKEN_EXPIRY_RANGE.end(),
                args.access_token_expiry_hours
            );
        }
        if args.refresh_token_expiry_hours == 0 {
            bail!("REFRESH_TOKEN_EXPIRY_HOURS must be greater than 0");
        }
        if args.database_service_address.trim().is_empty() {
            bail!("DATABASE_SERVICE_ADDRESS must not be empty");
        }

        let environment = args
            .app_env
            .as_deref()
            .unwrap_or_default()
            .parse::<Environment>()
            .unwrap_or_default();

        Ok(Self {
            service_name: args.service_name,
            environment,
            http_port: args.http_port,
            database_service_address: normalize_address(&args.database_service_address),
            tokens: TokenConfig {
                access_token_expiry: hours(args.access_token_expiry_hours),
                refresh_token_expiry: hours(args.refresh_token_expiry_hours),
                access_key_path: args.jwt_access_token_private_key_path,
                refresh_key_path: args.jwt_refresh_token_private_key_path,
                cache_keys: args.jwt_key_cache,
            },
        })
    }
}

const fn hours(n: u32) -> Duration {
    Duration::from_secs(n as u64 * 3600)
}

/// Prefixes `http://` onto a bare `host:port`.
pub fn normalize_address(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<GatewayConfig> {
        let mut argv = vec![
            "stream-hive-gateway",
            "--jwt-access-token-private-key-path",
            "/keys/access.pem",
        ];
        argv.extend_from_slice(extra);
        GatewayConfig::try_from(GatewayArgs::parse_from(argv))
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.service_name, "api-stream-hive-gateway");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.tokens.access_token_expiry, Duration::from_secs(3600));
        assert_eq!(
            config.tokens.refresh_token_expiry,
            Duration::from_secs(168 * 3600)
        );
        assert!(config.tokens.refresh_key_path.is_none());
        assert!(!config.tokens.cache_keys);
    }

    #[test]
    fn access_expiry_outside_range_is_rejected() {
        assert!(parse(&["--access-token-expiry-hours", "0"]).is_err());
        assert!(parse(&["--access-token-expiry-hours", "9"]).is_err());
        assert!(parse(&["--access-token-expiry-hours", "8"]).is_ok());
    }

    #[test]
    fn zero_refresh_expiry_is_rejected() {
        assert!(parse(&["--refresh-token-expiry-hours", "0"]).is_err());
    }

    #[test]
    fn bare_address_gets_a_scheme() {
        let config = parse(&["--database-service-address", "identity:50051"]).unwrap();
        assert_eq!(config.database_service_address, "http://identity:50051");

        assert_eq!(
            normalize_address("https://identity:50051"),
            "https://identity:50051"
        );
    }

    #[test]
    fn deployed_tier_is_recognised() {
        let config = parse(&["--app-env", "Staging"]).unwrap();
        assert_eq!(config.environment, Environment::Staging);
    }
}
