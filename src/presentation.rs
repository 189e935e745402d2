//! Presentation layer seam
//!
//! The coordinator never touches a display directly. Whatever renders the
//! selector, the start/stop control and the remote video implements
//! [`Presentation`] and reacts to these callbacks.

use crate::error::AppError;
use crate::session::SessionState;
use crate::webrtc::RemoteStream;

pub trait Presentation: Send + Sync {
    /// A start attempt or catalog load failed. Called once per failure.
    fn on_error(&self, error: &AppError);

    /// The first inbound media track of the current session arrived
    fn on_remote_stream(&self, stream: RemoteStream);

    /// The coordinator changed state. Always called after a start attempt
    /// settles, so a disabled start control can be re-enabled.
    fn on_session_state_change(&self, state: SessionState);
}
