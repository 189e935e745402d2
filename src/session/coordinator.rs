//! Session lifecycle coordinator

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PeerSession, SessionInfo, SessionState};
use crate::catalog::{CaptureSource, SourceCatalog};
use crate::config::{IceConfig, ViewerConfig};
use crate::error::{AppError, Result};
use crate::presentation::Presentation;
use crate::webrtc::{
    gather_local_offer, LocalMediaProvider, MediaIntent, NegotiationRequest, PeerTransport,
    SignalingExchange, TransportFactory,
};

/// Negotiation parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Relay servers for candidate discovery
    pub ice: IceConfig,
    /// Media requested from the remote side
    pub intent: MediaIntent,
    /// Bound on candidate gathering, `None` waits indefinitely
    pub gathering_timeout: Option<Duration>,
}

impl SessionOptions {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            ice: config.ice.clone(),
            intent: MediaIntent {
                audio: config.media.receive_audio,
                video: config.media.receive_video,
            },
            gathering_timeout: config.timeouts.gathering(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

/// External collaborators driven by the coordinator
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn SourceCatalog>,
    pub transports: Arc<dyn TransportFactory>,
    pub signaling: Arc<dyn SignalingExchange>,
    pub local_media: Arc<dyn LocalMediaProvider>,
    pub presentation: Arc<dyn Presentation>,
}

enum Slot {
    Idle,
    Negotiating {
        attempt: u64,
        cancel: CancellationToken,
    },
    Active(PeerSession),
}

impl Slot {
    fn state(&self) -> SessionState {
        match self {
            Slot::Idle => SessionState::Idle,
            Slot::Negotiating { .. } => SessionState::Negotiating,
            Slot::Active(_) => SessionState::Active,
        }
    }
}

/// Owns the single peer session and drives its lifecycle.
///
/// `start`, `stop` and `teardown` are serialized: each runs to completion
/// before the next one touches the session. A `stop` issued while a `start`
/// is negotiating cancels that negotiation and waits for it to unwind.
pub struct SessionCoordinator {
    options: SessionOptions,
    collaborators: Collaborators,
    /// The session slot; never held across an await
    slot: Mutex<Slot>,
    /// Serializes start/stop/teardown
    operation: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<SessionState>,
    sources: RwLock<Vec<CaptureSource>>,
    selection: RwLock<Option<CaptureSource>>,
    next_attempt: AtomicU64,
    shut_down: AtomicBool,
}

impl SessionCoordinator {
    pub fn new(options: SessionOptions, collaborators: Collaborators) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            options,
            collaborators,
            slot: Mutex::new(Slot::Idle),
            operation: tokio::sync::Mutex::new(()),
            state_tx,
            sources: RwLock::new(Vec::new()),
            selection: RwLock::new(None),
            next_attempt: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.slot.lock().state()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Whether a session is retained
    pub fn has_session(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Active(_))
    }

    /// Snapshot of the active session
    pub fn session_info(&self) -> Option<SessionInfo> {
        match &*self.slot.lock() {
            Slot::Active(session) => Some(session.info()),
            _ => None,
        }
    }

    /// Fetch the capture catalog.
    ///
    /// Failures are reported to the presentation layer and leave the
    /// previous catalog untouched, so the load can simply be retried.
    pub async fn load_sources(&self) -> Result<Vec<CaptureSource>> {
        match self.collaborators.catalog.list_sources().await {
            Ok(sources) => {
                info!("Loaded {} capture sources", sources.len());
                *self.sources.write() = sources.clone();
                *self.selection.write() = None;
                Ok(sources)
            }
            Err(e) => {
                let err = match e {
                    AppError::Catalog(_) => e,
                    other => AppError::Catalog(other.to_string()),
                };
                warn!("{}", err);
                self.collaborators.presentation.on_error(&err);
                Err(err)
            }
        }
    }

    /// Sources from the last successful catalog load
    pub fn sources(&self) -> Vec<CaptureSource> {
        self.sources.read().clone()
    }

    /// Record the user's source selection
    pub fn select_source(&self, source: CaptureSource) {
        let sources = self.sources.read();
        if !sources.is_empty() && !sources.contains(&source) {
            warn!("Selected {} is not in the loaded catalog", source.label());
        }
        debug!("Selected {}", source.label());
        *self.selection.write() = Some(source);
    }

    /// Current selection, `None` until the user picks a source
    pub fn selected_source(&self) -> Option<CaptureSource> {
        *self.selection.read()
    }

    /// Negotiate a new session with the selected source.
    ///
    /// Rejected with [`AppError::Busy`] unless the coordinator is idle.
    /// Any other failure is reported once to the presentation layer, the
    /// partially built connection is closed and the state returns to idle.
    pub async fn start(&self) -> Result<SessionInfo> {
        let attempt = self.next_attempt.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        // The operation lock is taken and the slot moves to Negotiating in
        // one step under the slot lock, so `stop()` and `teardown()` never
        // observe a running start as idle.
        let _operation = {
            let mut slot = self.slot.lock();
            if self.shut_down.load(Ordering::SeqCst) {
                return Err(AppError::Busy("viewer is shutting down".to_string()));
            }
            if !matches!(*slot, Slot::Idle) {
                let state = slot.state();
                warn!("Start rejected, session is {}", state);
                return Err(AppError::Busy(format!("session is {}", state)));
            }
            let Ok(operation) = self.operation.try_lock() else {
                warn!("Start rejected, another session operation is running");
                return Err(AppError::Busy("session operation in progress".to_string()));
            };
            *slot = Slot::Negotiating {
                attempt,
                cancel: cancel.clone(),
            };
            operation
        };
        self.publish_state(SessionState::Negotiating);

        // The remote side falls back to its first screen as well.
        let source = self.selected_source().unwrap_or_default();
        info!("Negotiating session #{} for {}", attempt, source.label());

        let mut pending: Option<Arc<dyn PeerTransport>> = None;
        let outcome = self.negotiate(source, &cancel, &mut pending).await;

        // Commit under the slot lock so a concurrent stop either sees the
        // active session or has already cancelled this attempt.
        let settled = match outcome {
            Ok(session) => {
                let mut slot = self.slot.lock();
                if cancel.is_cancelled() {
                    Err((AppError::Cancelled, Some(session.transport)))
                } else {
                    let info = session.info();
                    *slot = Slot::Active(session);
                    Ok(info)
                }
            }
            Err(err) => Err((err, pending.take())),
        };

        match settled {
            Ok(info) => {
                info!(
                    "Session {} active for {}",
                    info.session_id,
                    info.source.label()
                );
                self.publish_state(SessionState::Active);
                Ok(info)
            }
            Err((err, transport)) => {
                if let Some(transport) = transport {
                    release(transport).await;
                }
                *self.slot.lock() = Slot::Idle;

                if err.is_reportable() {
                    warn!("Session #{} failed: {}", attempt, err);
                    self.collaborators.presentation.on_error(&err);
                } else {
                    info!("Session #{} cancelled", attempt);
                }
                self.publish_state(SessionState::Idle);
                Err(err)
            }
        }
    }

    /// Release the session and return to idle. A no-op when idle.
    ///
    /// While negotiating, cancels the negotiation and returns once the
    /// partially built connection has been released. A start that has not
    /// reached Negotiating yet is not affected.
    pub async fn stop(&self) {
        match &*self.slot.lock() {
            Slot::Idle => return,
            Slot::Negotiating { attempt, cancel } => {
                info!("Stop requested, cancelling negotiation #{}", attempt);
                cancel.cancel();
            }
            Slot::Active(_) => {}
        }

        let _operation = self.operation.lock().await;

        let session = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Active(session) => Some(session),
                other => {
                    *slot = other;
                    None
                }
            }
        };

        if let Some(session) = session {
            info!("Stopping session {}", session.id);
            release(session.transport).await;
            self.publish_state(SessionState::Idle);
        }
    }

    /// Process teardown: release any session and refuse new ones
    pub async fn teardown(&self) {
        {
            // Same lock as the start admission check: a start either is
            // already Negotiating here or will be rejected.
            let _slot = self.slot.lock();
            if self.shut_down.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        info!("Tearing down viewer session");
        self.stop().await;
    }

    async fn negotiate(
        &self,
        source: CaptureSource,
        cancel: &CancellationToken,
        pending: &mut Option<Arc<dyn PeerTransport>>,
    ) -> Result<PeerSession> {
        let local_media = until_cancelled(cancel, async {
            self.collaborators
                .local_media
                .acquire()
                .await
                .map_err(|e| match e {
                    AppError::MediaAcquisition(_) => e,
                    other => AppError::MediaAcquisition(other.to_string()),
                })
        })
        .await?;

        // Creation runs to completion so the new connection is always
        // tracked in `pending` and released on every later exit.
        let transport = self
            .collaborators
            .transports
            .create(&self.options.ice)
            .await?;
        *pending = Some(transport.clone());
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let remote_stream = Arc::new(Mutex::new(None));
        until_cancelled(cancel, async {
            if let Some(media) = &local_media {
                transport.add_local_media(media).await?;
            }

            {
                let remote_stream = remote_stream.clone();
                let presentation = self.collaborators.presentation.clone();
                transport.on_remote_stream(Box::new(move |stream| {
                    *remote_stream.lock() = Some(stream.clone());
                    presentation.on_remote_stream(stream);
                }));
            }

            let offer = gather_local_offer(
                transport.as_ref(),
                self.options.intent,
                self.options.gathering_timeout,
            )
            .await?;

            let request = NegotiationRequest::new(offer, source)?;
            let answer = self.collaborators.signaling.exchange(&request).await?;
            debug!("Applying answer ({} bytes)", answer.sdp.len());
            transport.set_remote_description(answer).await
        })
        .await?;

        Ok(PeerSession {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            transport,
            local_media,
            remote_stream,
            started_at: Utc::now(),
        })
    }

    fn publish_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
        self.collaborators.presentation.on_session_state_change(state);
    }
}

/// Run `step` unless the attempt is cancelled first
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = step => result,
    }
}

/// Close a transport; release must finish even if closing fails
async fn release(transport: Arc<dyn PeerTransport>) {
    if let Err(e) = transport.close().await {
        warn!("Failed to close peer connection: {}", e);
    }
}
