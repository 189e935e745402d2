//! Peer transport abstraction
//!
//! The coordinator and the gathering barrier talk to a peer connection only
//! through [`PeerTransport`]. The production implementation wraps a
//! `webrtc::RTCPeerConnection` (see [`super::peer`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

use super::signaling::SessionDescription;
use crate::config::IceConfig;
use crate::error::Result;

/// Media kinds requested from the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIntent {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaIntent {
    fn default() -> Self {
        Self {
            audio: false,
            video: true,
        }
    }
}

/// Candidate discovery event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateEvent {
    /// A connectivity candidate was discovered
    Candidate(String),
    /// The "no more candidates" sentinel
    Complete,
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Remote media stream published to the presentation layer
#[derive(Clone, Serialize)]
pub struct RemoteStream {
    pub stream_id: String,
    pub track_id: String,
    pub kind: MediaKind,
    /// Underlying RTP track, absent for non-WebRTC transports
    #[serde(skip)]
    pub track: Option<Arc<TrackRemote>>,
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .field("has_track", &self.track.is_some())
            .finish()
    }
}

/// Outgoing local media attached before offer creation
#[derive(Clone)]
pub struct LocalMedia {
    pub stream_id: String,
    pub track: Arc<TrackLocalStaticSample>,
}

impl std::fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMedia")
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// Called for inbound remote tracks
pub type RemoteStreamHandler = Box<dyn Fn(RemoteStream) + Send + Sync>;

/// A live peer connection, as seen by negotiation
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Register the candidate listener for one negotiation attempt.
    ///
    /// Replaces any previous listener. The listener is dropped once the
    /// returned receiver is dropped.
    fn candidate_events(&self) -> mpsc::UnboundedReceiver<CandidateEvent>;

    /// Create a local offer requesting the given media kinds
    async fn create_offer(&self, intent: MediaIntent) -> Result<SessionDescription>;

    /// Apply a description as the local description; starts candidate discovery
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    /// Current local description, including the candidates gathered so far
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Apply the remote answer
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Attach outgoing local media
    async fn add_local_media(&self, media: &LocalMedia) -> Result<()>;

    /// Register the inbound track handler
    fn on_remote_stream(&self, handler: RemoteStreamHandler);

    /// Release all transport resources
    async fn close(&self) -> Result<()>;
}

/// Creates peer transports
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, ice: &IceConfig) -> Result<Arc<dyn PeerTransport>>;
}
