//! Viewer session lifecycle
//!
//! A viewer owns at most one peer session. The [`SessionCoordinator`] drives
//! it through `Idle -> Negotiating -> Active -> Idle`.

mod coordinator;

pub use coordinator::{Collaborators, SessionCoordinator, SessionOptions};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::CaptureSource;
use crate::webrtc::{LocalMedia, PeerTransport, RemoteStream};

/// Coordinator state as seen by the presentation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session; initial and terminal
    #[default]
    Idle,
    /// Offer built or being built, signaling in flight
    Negotiating,
    /// Answer applied
    Active,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Negotiating => write!(f, "negotiating"),
            SessionState::Active => write!(f, "active"),
        }
    }
}

/// Snapshot of the active session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub source: CaptureSource,
    pub started_at: DateTime<Utc>,
    /// Whether an outgoing local track is attached
    pub local_media: bool,
    /// Remote stream, once the first track arrived
    pub remote_stream: Option<RemoteStream>,
}

/// The live negotiated connection, owned by the coordinator
pub(crate) struct PeerSession {
    id: String,
    source: CaptureSource,
    transport: Arc<dyn PeerTransport>,
    local_media: Option<LocalMedia>,
    remote_stream: Arc<Mutex<Option<RemoteStream>>>,
    started_at: DateTime<Utc>,
}

impl PeerSession {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            source: self.source,
            started_at: self.started_at,
            local_media: self.local_media.is_some(),
            remote_stream: self.remote_stream.lock().clone(),
        }
    }
}
