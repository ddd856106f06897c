use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use crate::http::HttpVersion;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to deserialize {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub buffer_size: usize,

    pub http_version: HttpVersion,
    pub max_path_size: usize,
    pub max_header_size: usize,
    pub max_body_size: u64,

    #[serde(deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub write_timeout: Duration,

    pub server_name: String,

    /// Environment mode handed to the finalizer (`"production"` hides error details).
    /// Falls back to the `TERMINUS_ENV` variable when unset.
    pub env: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            buffer_size: 4096,

            http_version: HttpVersion::V1_1,
            max_path_size: 1024,
            max_header_size: 8192,
            max_body_size: 1024 * 1024, // 1 MB

            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),

            server_name: "terminus/0.1".to_string(),

            env: None,
        }
    }
}

impl ServerConfig {
    pub fn try_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str::<ServerConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads `path`, falling back to the default config on any failure.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        match Self::try_from_file(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default config");
                ServerConfig::default()
            }
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 9000
            read_timeout = 0.5
            env = "production"
            http_version = "V1_0"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.read_timeout, Duration::from_millis(500));
        assert_eq!(config.env.as_deref(), Some("production"));
        assert_eq!(config.http_version, HttpVersion::V1_0);
        assert_eq!(config.max_body_size, ServerConfig::default().max_body_size);
    }

    #[test]
    fn negative_timeouts_are_rejected() {
        assert!(toml::from_str::<ServerConfig>("write_timeout = -1.0").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let err = ServerConfig::try_from_file("/nonexistent/terminus.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let config = ServerConfig::from_file("/nonexistent/terminus.toml");
        assert_eq!(config.port, ServerConfig::default().port);
    }
}
