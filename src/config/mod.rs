//! Viewer configuration
//!
//! Configuration is layered: defaults, then an optional TOML file, then
//! environment overrides. Command line flags are applied last by the binary.

mod schema;

pub use schema::*;

use std::path::Path;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Environment variable overriding `server_url`
pub const ENV_SERVER_URL: &str = "REMOTE_VIEWER_SERVER_URL";

impl ViewerConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults. Missing sections fall back to
    /// their defaults through `#[serde(default)]`.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&raw)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| AppError::Config(format!("Invalid config file: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var(ENV_SERVER_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
        {
            debug!("{} overrides server_url", ENV_SERVER_URL);
            self.server_url = url;
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("viewer.toml"))
            .await
            .unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("viewer.toml");
        tokio::fs::write(
            &path,
            r#"
server_url = "http://10.0.0.5:9000/"

[ice]
stun_servers = ["stun:stun.example.com:3478"]

[[ice.turn_servers]]
urls = ["turn:turn.example.com:3478?transport=udp"]
username = "viewer"
credential = "secret"

[media]
local_media = "placeholder"

[timeouts]
gathering_ms = 0
"#,
        )
        .await
        .unwrap();

        let config = ViewerConfig::load(&path).await.unwrap();
        assert_eq!(config.base_url(), "http://10.0.0.5:9000");
        assert_eq!(config.ice.stun_servers, vec!["stun:stun.example.com:3478"]);
        assert_eq!(config.ice.turn_servers.len(), 1);
        assert_eq!(config.media.local_media, LocalMediaMode::Placeholder);
        assert!(config.media.receive_video);
        assert_eq!(config.timeouts.gathering(), None);
        assert_eq!(config.timeouts.signaling_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let err = ViewerConfig::from_toml("server_url = [").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
