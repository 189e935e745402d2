//! In-process fakes for the negotiation seams

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use crate::catalog::{CaptureSource, SourceCatalog};
use crate::config::IceConfig;
use crate::error::{AppError, Result};
use crate::presentation::Presentation;
use crate::session::SessionState;
use crate::webrtc::{
    CandidateEvent, LocalMedia, LocalMediaProvider, MediaIntent, MediaKind, NegotiationRequest,
    PeerTransport, RemoteStream, RemoteStreamHandler, SessionDescription, SignalingExchange,
    TransportFactory,
};

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_http(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Poll `condition` until it holds, panicking after one second
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached within 1 s");
}

/// How a fake transport reports candidate discovery
#[derive(Debug, Clone)]
pub enum GatheringScript {
    /// Emit these candidates, then the sentinel
    Complete(Vec<String>),
    /// Never finish gathering
    Never,
}

impl GatheringScript {
    pub fn complete() -> Self {
        Self::Complete(vec![
            "candidate:1 1 udp 2130706431 10.0.0.2 50000 typ host".to_string(),
        ])
    }
}

pub struct FakeTransport {
    script: GatheringScript,
    fail_offer: bool,
    fail_remote: bool,
    calls: Mutex<Vec<&'static str>>,
    listener: Mutex<Option<mpsc::UnboundedSender<CandidateEvent>>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    track_handler: Mutex<Option<RemoteStreamHandler>>,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn new(script: GatheringScript) -> Self {
        Self {
            script,
            fail_offer: false,
            fail_remote: false,
            calls: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            track_handler: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn fail_offer(mut self) -> Self {
        self.fail_offer = true;
        self
    }

    pub fn fail_remote(mut self) -> Self {
        self.fail_remote = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    fn candidate_events(&self) -> mpsc::UnboundedReceiver<CandidateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock() = Some(tx);
        rx
    }

    async fn create_offer(&self, intent: MediaIntent) -> Result<SessionDescription> {
        self.record("create_offer");
        if self.fail_offer {
            return Err(AppError::Negotiation("offer rejected".to_string()));
        }
        let mut sdp = String::from("v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n");
        if intent.audio {
            sdp.push_str("m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=recvonly\r\n");
        }
        if intent.video {
            sdp.push_str("m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n");
        }
        Ok(SessionDescription::offer(sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.record("set_local_description");
        *self.local.lock() = Some(description);

        if let GatheringScript::Complete(candidates) = &self.script {
            for candidate in candidates {
                if let Some(local) = self.local.lock().as_mut() {
                    local.sdp.push_str(&format!("a={}\r\n", candidate));
                }
                if let Some(tx) = self.listener.lock().as_ref() {
                    let _ = tx.send(CandidateEvent::Candidate(candidate.clone()));
                }
            }
            if let Some(tx) = self.listener.lock().as_ref() {
                let _ = tx.send(CandidateEvent::Complete);
            }
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.record("set_remote_description");
        if self.fail_remote {
            return Err(AppError::Negotiation("invalid answer".to_string()));
        }
        *self.remote.lock() = Some(description);

        if let Some(handler) = self.track_handler.lock().as_ref() {
            handler(RemoteStream {
                stream_id: "screen".to_string(),
                track_id: "video".to_string(),
                kind: MediaKind::Video,
                track: None,
            });
        }
        Ok(())
    }

    async fn add_local_media(&self, _media: &LocalMedia) -> Result<()> {
        self.record("add_local_media");
        Ok(())
    }

    fn on_remote_stream(&self, handler: RemoteStreamHandler) {
        *self.track_handler.lock() = Some(handler);
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        self.closed.store(true, Ordering::SeqCst);
        *self.listener.lock() = None;
        *self.track_handler.lock() = None;
        Ok(())
    }
}

/// Builds fake transports and keeps them for inspection
pub struct FakeTransportFactory {
    make: Box<dyn Fn() -> FakeTransport + Send + Sync>,
    created: Mutex<Vec<Arc<FakeTransport>>>,
    delay: Option<Duration>,
    entered: Notify,
}

impl FakeTransportFactory {
    pub fn new(make: impl Fn() -> FakeTransport + Send + Sync + 'static) -> Self {
        Self {
            make: Box::new(make),
            created: Mutex::new(Vec::new()),
            delay: None,
            entered: Notify::new(),
        }
    }

    /// Hold each created transport for `delay` before handing it out
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Resolves once a transport has been built
    pub async fn wait_created(&self) {
        self.entered.notified().await;
    }

    pub fn created(&self) -> usize {
        self.created.lock().len()
    }

    /// The single transport created so far
    pub fn only(&self) -> Arc<FakeTransport> {
        let created = self.created.lock();
        assert_eq!(created.len(), 1, "expected exactly one transport");
        created[0].clone()
    }
}

#[async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn create(&self, _ice: &IceConfig) -> Result<Arc<dyn PeerTransport>> {
        let transport = Arc::new((self.make)());
        self.created.lock().push(transport.clone());
        self.entered.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let transport: Arc<dyn PeerTransport> = transport;
        Ok(transport)
    }
}

enum SignalingMode {
    Answer(String),
    Fail,
    Hang,
}

pub struct FakeSignaling {
    mode: SignalingMode,
    requests: Mutex<Vec<NegotiationRequest>>,
    entered: Notify,
}

impl FakeSignaling {
    fn with_mode(mode: SignalingMode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
            entered: Notify::new(),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::with_mode(SignalingMode::Answer(answer.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_mode(SignalingMode::Fail)
    }

    /// Never answers
    pub fn hanging() -> Self {
        Self::with_mode(SignalingMode::Hang)
    }

    pub fn requests(&self) -> Vec<NegotiationRequest> {
        self.requests.lock().clone()
    }

    /// Resolves once an exchange has started
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl SignalingExchange for FakeSignaling {
    async fn exchange(&self, request: &NegotiationRequest) -> Result<SessionDescription> {
        self.requests.lock().push(request.clone());
        self.entered.notify_one();
        match &self.mode {
            SignalingMode::Answer(answer) => Ok(SessionDescription::answer(answer.clone())),
            SignalingMode::Fail => Err(AppError::Signaling(
                "HTTP status server error (500 Internal Server Error)".to_string(),
            )),
            SignalingMode::Hang => std::future::pending().await,
        }
    }
}

pub struct FakeCatalog {
    screens: Option<Vec<CaptureSource>>,
}

impl FakeCatalog {
    pub fn with_screens(indices: &[u32]) -> Self {
        Self {
            screens: Some(indices.iter().copied().map(CaptureSource).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { screens: None }
    }
}

#[async_trait]
impl SourceCatalog for FakeCatalog {
    async fn list_sources(&self) -> Result<Vec<CaptureSource>> {
        self.screens
            .clone()
            .ok_or_else(|| AppError::Catalog("connection refused".to_string()))
    }
}

pub struct FailingMedia;

#[async_trait]
impl LocalMediaProvider for FailingMedia {
    async fn acquire(&self) -> Result<Option<LocalMedia>> {
        Err(AppError::MediaAcquisition("permission denied".to_string()))
    }
}

/// Records presentation callbacks
#[derive(Default)]
pub struct RecordingPresentation {
    states: Mutex<Vec<SessionState>>,
    errors: Mutex<Vec<String>>,
    streams: Mutex<Vec<RemoteStream>>,
}

impl RecordingPresentation {
    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().clone()
    }

    /// Error kinds, in report order
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }
}

impl Presentation for RecordingPresentation {
    fn on_error(&self, error: &AppError) {
        self.errors.lock().push(error.kind().to_string());
    }

    fn on_remote_stream(&self, stream: RemoteStream) {
        self.streams.lock().push(stream);
    }

    fn on_session_state_change(&self, state: SessionState) {
        self.states.lock().push(state);
    }
}
