//! Event system for viewer state notifications
//!
//! The [`EventBus`] is the default [`Presentation`]: it turns coordinator
//! callbacks into [`ViewerEvent`]s that any number of UI components can
//! subscribe to.

pub mod types;

pub use types::ViewerEvent;

use tokio::sync::broadcast;

use crate::error::AppError;
use crate::presentation::Presentation;
use crate::session::SessionState;
use crate::webrtc::RemoteStream;

/// Event channel capacity (ring buffer size)
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Event bus for broadcasting viewer events
///
/// # Example
///
/// ```no_run
/// use remote_viewer::events::{EventBus, ViewerEvent};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = rx.recv().await {
///         println!("Received event: {}", event.event_name());
///     }
/// });
/// ```
pub struct EventBus {
    tx: broadcast::Sender<ViewerEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to all subscribers
    ///
    /// If there are no active subscribers, the event is dropped.
    pub fn publish(&self, event: ViewerEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.tx.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Presentation for EventBus {
    fn on_error(&self, error: &AppError) {
        self.publish(ViewerEvent::error(error));
    }

    fn on_remote_stream(&self, stream: RemoteStream) {
        self.publish(ViewerEvent::RemoteStream { stream });
    }

    fn on_session_state_change(&self, state: SessionState) {
        self.publish(ViewerEvent::SessionStateChanged { state });
    }
}
