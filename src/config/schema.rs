use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};

/// Default negotiation server (the capture agent's HTTP port)
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:9000";

/// Default public STUN server
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Main viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base URL of the capture agent (catalog and signaling endpoints)
    pub server_url: String,
    /// Relay servers used for candidate discovery
    pub ice: IceConfig,
    /// Media requested from / offered to the remote side
    pub media: MediaConfig,
    /// Negotiation timeouts
    pub timeouts: TimeoutConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ice: IceConfig::default(),
            media: MediaConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Check the invariants negotiation relies on
    pub fn validate(&self) -> Result<()> {
        let server_url = self.server_url.trim();
        if server_url.is_empty() {
            return Err(AppError::Config("server_url cannot be empty".to_string()));
        }
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "server_url must be an http(s) URL: {}",
                server_url
            )));
        }

        if self.ice.stun_servers.is_empty() && self.ice.turn_servers.is_empty() {
            return Err(AppError::Config(
                "at least one STUN or TURN server is required".to_string(),
            ));
        }

        for url in &self.ice.stun_servers {
            if !(url.starts_with("stun:") || url.starts_with("stuns:")) {
                return Err(AppError::Config(format!("invalid STUN url: {}", url)));
            }
        }

        for turn in &self.ice.turn_servers {
            if turn.urls.is_empty() {
                return Err(AppError::Config("TURN server without urls".to_string()));
            }
            if turn.username.is_empty() || turn.credential.is_empty() {
                return Err(AppError::Config(format!(
                    "TURN server {} requires username and credential",
                    turn.urls[0]
                )));
            }
        }

        if !self.media.receive_audio && !self.media.receive_video {
            return Err(AppError::Config(
                "at least one of receive_audio / receive_video must be enabled".to_string(),
            ));
        }

        Ok(())
    }
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    /// STUN server URLs
    pub stun_servers: Vec<String>,
    /// TURN server configuration
    pub turn_servers: Vec<TurnServer>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            turn_servers: vec![],
        }
    }
}

/// TURN server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnServer {
    /// TURN server URLs (e.g., ["turn:turn.example.com:3478?transport=udp"])
    pub urls: Vec<String>,
    /// Username for TURN authentication
    pub username: String,
    /// Credential for TURN authentication
    pub credential: String,
}


/// How the outgoing local media source is obtained before offer creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalMediaMode {
    /// Receive-only session, no local track
    #[default]
    None,
    /// Attach a silent placeholder video track (for peers that expect a
    /// local media grant before they answer)
    Placeholder,
}

/// Media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Ask the remote side for audio
    pub receive_audio: bool,
    /// Ask the remote side for video
    pub receive_video: bool,
    /// Local media acquisition mode
    pub local_media: LocalMediaMode,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            receive_audio: false,
            receive_video: true,
            local_media: LocalMediaMode::None,
        }
    }
}

/// Timeout configuration, `0` disables a timeout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Candidate gathering timeout (ms)
    pub gathering_ms: u64,
    /// Signaling request timeout (ms)
    pub signaling_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            gathering_ms: 10_000,
            signaling_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn gathering(&self) -> Option<Duration> {
        non_zero_millis(self.gathering_ms)
    }

    pub fn signaling(&self) -> Option<Duration> {
        non_zero_millis(self.signaling_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
