use std::env;
use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use engine::SyncConfig;
use foundation::Period;
use tracing::warn;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Remote data API connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    /// `(user, password)` from `user:pass`.
    pub basic_auth: Option<(String, Option<String>)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub addr: SocketAddr,
    pub api: ApiConfig,
    pub sync: SyncConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidAddr { value: String, source: AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddr { value, source } => {
                write!(f, "invalid MAPSYNC_ADDR {value:?}: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidAddr { source, .. } => Some(source),
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads every setting through `lookup`. Bad values fall back to their
    /// default with a warning; only the listen address is fatal.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr_raw = lookup("MAPSYNC_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr_raw.clone(),
                source,
            })?;

        let base_url = lookup("MAPSYNC_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let basic_auth = lookup("MAPSYNC_API_BASIC_AUTH")
            .filter(|v| !v.is_empty())
            .map(|v| match v.split_once(':') {
                Some((user, pass)) => (user.to_string(), Some(pass.to_string())),
                None => (v, None),
            });
        let timeout_ms = parse_or(&lookup, "MAPSYNC_API_TIMEOUT_MS", DEFAULT_API_TIMEOUT_MS);

        let defaults = SyncConfig::default();
        let ms = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(&lookup, key, default.as_millis() as u64))
        };
        let sync = SyncConfig {
            markers_debounce: ms("MAPSYNC_DEBOUNCE_MARKERS_MS", defaults.markers_debounce),
            boundaries_debounce: ms("MAPSYNC_DEBOUNCE_BOUNDARIES_MS", defaults.boundaries_debounce),
            stats_debounce: ms("MAPSYNC_DEBOUNCE_STATS_MS", defaults.stats_debounce),
            summary_debounce: ms("MAPSYNC_DEBOUNCE_SUMMARY_MS", defaults.summary_debounce),
            marker_limit: parse_or(&lookup, "MAPSYNC_MARKER_LIMIT", defaults.marker_limit),
            stats_enabled: flag(&lookup, "MAPSYNC_STATS_ENABLED"),
            period: parse_or::<Period>(&lookup, "MAPSYNC_PERIOD", defaults.period),
        };

        Ok(Self {
            addr,
            api: ApiConfig {
                base_url,
                basic_auth,
                timeout: Duration::from_millis(timeout_ms),
            },
            sync,
        })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("ignoring invalid {key}={raw:?}; using default");
            default
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
