use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::fair_chance::{
    PolicyLoadError, PolicyPackFile, PolicyRegistry, UnknownMarketPolicy,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the gate service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub policy: PolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let pack_path = env::var("FCHA_POLICY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let unknown_market = match env::var("FCHA_UNKNOWN_MARKET") {
            Ok(raw) => raw
                .parse::<UnknownMarketPolicy>()
                .map_err(|_| ConfigError::InvalidUnknownMarketPolicy { value: raw })?,
            Err(_) => UnknownMarketPolicy::FailOpen,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            policy: PolicyConfig {
                pack_path,
                unknown_market,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where market profiles come from and how unknown markets resolve.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    /// Optional JSON pack loaded on top of the built-in packs.
    pub pack_path: Option<PathBuf>,
    pub unknown_market: UnknownMarketPolicy,
}

impl PolicyConfig {
    /// Build the registry once at start-up.
    pub fn registry(&self) -> Result<PolicyRegistry, PolicyLoadError> {
        let mut builder = PolicyRegistry::builder()
            .with_builtin_packs()
            .unknown_market(self.unknown_market);
        if let Some(path) = &self.pack_path {
            builder = builder.with_pack(PolicyPackFile::from_path(path)?);
        }
        builder.build()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUnknownMarketPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUnknownMarketPolicy { value } => write!(
                f,
                "FCHA_UNKNOWN_MARKET must be fail_open or fail_closed (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidUnknownMarketPolicy { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::fair_chance::{nyc_fcha_profile, MarketId};
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("FCHA_POLICY_PATH");
        env::remove_var("FCHA_UNKNOWN_MARKET");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.policy.pack_path.is_none());
        assert_eq!(config.policy.unknown_market, UnknownMarketPolicy::FailOpen);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_fail_closed_unknown_market_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FCHA_UNKNOWN_MARKET", "fail_closed");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.policy.unknown_market, UnknownMarketPolicy::FailClosed);

        let registry = config.policy.registry().expect("registry builds");
        assert!(registry.lookup(&MarketId::new("boise")).requires_gate);
        reset_env();
    }

    #[test]
    fn rejects_unrecognised_unknown_market_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FCHA_UNKNOWN_MARKET", "sometimes");
        match AppConfig::load() {
            Err(ConfigError::InvalidUnknownMarketPolicy { value }) => assert_eq!(value, "sometimes"),
            other => panic!("expected invalid unknown market policy, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn pack_file_can_update_the_builtin_nyc_profile() {
        let mut updated = nyc_fcha_profile();
        updated.policy_version = "2026.1".to_string();
        let path = env::temp_dir().join(format!("fcha-pack-{}.json", std::process::id()));
        let json = serde_json::to_string(&PolicyPackFile {
            profiles: vec![updated],
        })
        .expect("pack serialises");
        std::fs::write(&path, json).expect("pack written");

        let config = PolicyConfig {
            pack_path: Some(path.clone()),
            unknown_market: UnknownMarketPolicy::FailOpen,
        };
        let registry = config.registry();
        std::fs::remove_file(&path).ok();

        let registry = registry.expect("pack overrides built-in NYC");
        assert_eq!(
            registry.lookup(&MarketId::new("NYC")).policy_version,
            "2026.1"
        );
    }

    #[test]
    fn missing_pack_file_surfaces_io_error() {
        let config = PolicyConfig {
            pack_path: Some(PathBuf::from("/nonexistent/fcha-pack.json")),
            unknown_market: UnknownMarketPolicy::FailOpen,
        };
        assert!(matches!(config.registry(), Err(PolicyLoadError::Io(_))));
    }
}
