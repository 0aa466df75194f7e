//! Server configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use skinforge_core::secrets::KEY_SIZE;
use skinforge_mojang::MojangConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the credential key have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// This serving node's name, matched against account server bindings.
    pub server_name: String,
    /// Accounts at or above this error count leave the rotation.
    pub error_threshold: i32,
    /// Base request-pacing delay in seconds.
    pub min_account_delay_secs: i64,
    /// Hosts the URL follower may touch, comma-separated.
    pub follow_hosts: Vec<String>,
    /// Base directory for the temp-file roots.
    pub temp_dir: PathBuf,
    /// Public-ID encoder triple. Part of the catalog schema; never change
    /// it on an existing catalog.
    pub optimus_prime: u64,
    pub optimus_inverse: u64,
    pub optimus_random: u64,
    /// 32-byte credential key, base64 in `CREDENTIAL_KEY`.
    pub credential_key: [u8; KEY_SIZE],
    /// Upstream base URLs and timeout.
    pub mojang: MojangConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `3000`                   |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                     |
    /// | `SERVER_NAME`            | `default`                |
    /// | `ERROR_THRESHOLD`        | `10`                     |
    /// | `MIN_ACCOUNT_DELAY_SECS` | `200`                    |
    /// | `FOLLOW_ALLOWED_HOSTS`   | `novask.in,imgur.com`    |
    /// | `TEMP_DIR`               | `tmp`                    |
    /// | `OPTIMUS_PRIME`          | `1580030173`             |
    /// | `OPTIMUS_INVERSE`        | `59260789`               |
    /// | `OPTIMUS_RANDOM`         | `1163945558`             |
    /// | `CREDENTIAL_KEY`         | (required, base64)       |
    /// | `MOJANG_AUTH_URL`        | the real auth server     |
    /// | `MOJANG_ACCOUNT_URL`     | the real account API     |
    /// | `MOJANG_SERVICES_URL`    | the real services API    |
    /// | `MOJANG_SESSION_URL`     | the real session server  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let server_name = std::env::var("SERVER_NAME").unwrap_or_else(|_| "default".into());

        let error_threshold: i32 = std::env::var("ERROR_THRESHOLD")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("ERROR_THRESHOLD must be a valid i32");

        let min_account_delay_secs: i64 = std::env::var("MIN_ACCOUNT_DELAY_SECS")
            .unwrap_or_else(|_| "200".into())
            .parse()
            .expect("MIN_ACCOUNT_DELAY_SECS must be a valid i64");

        let follow_hosts: Vec<String> = std::env::var("FOLLOW_ALLOWED_HOSTS")
            .unwrap_or_else(|_| "novask.in,imgur.com".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let temp_dir = PathBuf::from(std::env::var("TEMP_DIR").unwrap_or_else(|_| "tmp".into()));

        let optimus_prime: u64 = std::env::var("OPTIMUS_PRIME")
            .unwrap_or_else(|_| "1580030173".into())
            .parse()
            .expect("OPTIMUS_PRIME must be a valid u64");
        let optimus_inverse: u64 = std::env::var("OPTIMUS_INVERSE")
            .unwrap_or_else(|_| "59260789".into())
            .parse()
            .expect("OPTIMUS_INVERSE must be a valid u64");
        let optimus_random: u64 = std::env::var("OPTIMUS_RANDOM")
            .unwrap_or_else(|_| "1163945558".into())
            .parse()
            .expect("OPTIMUS_RANDOM must be a valid u64");

        let credential_key = parse_credential_key(
            &std::env::var("CREDENTIAL_KEY").expect("CREDENTIAL_KEY must be set"),
        );

        let mut mojang = MojangConfig {
            timeout: Duration::from_secs(request_timeout_secs),
            ..MojangConfig::default()
        };
        if let Ok(url) = std::env::var("MOJANG_AUTH_URL") {
            mojang.auth_base = url;
        }
        if let Ok(url) = std::env::var("MOJANG_ACCOUNT_URL") {
            mojang.account_base = url;
        }
        if let Ok(url) = std::env::var("MOJANG_SERVICES_URL") {
            mojang.services_base = url;
        }
        if let Ok(url) = std::env::var("MOJANG_SESSION_URL") {
            mojang.session_base = url;
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            server_name,
            error_threshold,
            min_account_delay_secs,
            follow_hosts,
            temp_dir,
            optimus_prime,
            optimus_inverse,
            optimus_random,
            credential_key,
            mojang,
        }
    }
}

/// Decode the base64 credential key; must be exactly 32 bytes.
fn parse_credential_key(encoded: &str) -> [u8; KEY_SIZE] {
    let bytes = BASE64
        .decode(encoded)
        .expect("CREDENTIAL_KEY must be valid base64");
    bytes
        .try_into()
        .unwrap_or_else(|_| panic!("CREDENTIAL_KEY must decode to exactly {KEY_SIZE} bytes"))
}
