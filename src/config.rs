// Configuration module
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Export pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Rows per streamed batch (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Pacing delay between batch writes in milliseconds (default: 100).
    /// Load-shedding throttle, not congestion control; 0 disables it.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Hard cap on the resolved span when no history was requested
    /// (default: 30 days)
    #[serde(default = "default_max_span_days")]
    pub max_span_days: i64,

    /// Default lookback window when no temporal params are supplied
    /// (default: 1 day)
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: i64,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: default_workers(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            pacing_delay_ms: default_pacing_delay_ms(),
            max_span_days: default_max_span_days(),
            default_lookback_days: default_lookback_days(),
        }
    }
}

fn default_workers() -> usize {
    0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_batch_size() -> u64 {
    1000
}

fn default_pacing_delay_ms() -> u64 {
    100
}

fn default_max_span_days() -> i64 {
    30
}

fn default_lookback_days() -> i64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.export.batch_size, 1000);
        assert_eq!(config.export.pacing_delay_ms, 100);
        assert_eq!(config.export.max_span_days, 30);
        assert_eq!(config.export.default_lookback_days, 1);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 3000

            [export]
            pacing_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.export.pacing_delay_ms, 0);
        assert_eq!(config.export.batch_size, 1000);
    }
}
