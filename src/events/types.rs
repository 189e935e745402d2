//! Viewer event types
//!
//! Defines all event types that can be broadcast through the event bus.

use serde::Serialize;

use crate::error::AppError;
use crate::session::SessionState;
use crate::webrtc::RemoteStream;

/// Viewer event enumeration
///
/// Serialized as:
/// ```json
/// {
///   "event": "session.state_changed",
///   "data": { "state": "negotiating" }
/// }
/// ```
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ViewerEvent {
    /// Coordinator state changed
    #[serde(rename = "session.state_changed")]
    SessionStateChanged { state: SessionState },

    /// First inbound media of a session arrived
    #[serde(rename = "session.remote_stream")]
    RemoteStream { stream: RemoteStream },

    /// A start attempt or catalog load failed
    #[serde(rename = "viewer.error")]
    Error {
        /// Error kind: "catalog", "negotiation", "signaling", ...
        kind: String,
        message: String,
    },
}

impl ViewerEvent {
    pub fn error(err: &AppError) -> Self {
        Self::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    /// Get the event name (for filtering/routing)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionStateChanged { .. } => "session.state_changed",
            Self::RemoteStream { .. } => "session.remote_stream",
            Self::Error { .. } => "viewer.error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webrtc::MediaKind;

    #[test]
    fn test_event_name() {
        let event = ViewerEvent::SessionStateChanged {
            state: SessionState::Active,
        };
        assert_eq!(event.event_name(), "session.state_changed");

        let event = ViewerEvent::error(&AppError::Catalog("timeout".to_string()));
        assert_eq!(event.event_name(), "viewer.error");
    }

    #[test]
    fn test_serialization() {
        let event = ViewerEvent::RemoteStream {
            stream: RemoteStream {
                stream_id: "screen".to_string(),
                track_id: "video".to_string(),
                kind: MediaKind::Video,
                track: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "session.remote_stream");
        assert_eq!(json["data"]["stream"]["kind"], "video");
        assert!(json["data"]["stream"].get("track").is_none());

        let event = ViewerEvent::error(&AppError::Signaling("refused".to_string()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["kind"], "signaling");
        assert_eq!(json["data"]["message"], "Signaling failed: refused");
    }
}
