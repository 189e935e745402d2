//! WebRTC peer connection transport

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::ice::mdns::MulticastDnsMode;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::config::rtc_configuration;
use super::mdns::{default_mdns_host_name, mdns_mode};
use super::signaling::{SdpType, SessionDescription};
use super::transport::{
    CandidateEvent, LocalMedia, MediaIntent, MediaKind, PeerTransport, RemoteStream,
    RemoteStreamHandler, TransportFactory,
};
use crate::config::IceConfig;
use crate::error::{AppError, Result};

type CandidateListener = Arc<Mutex<Option<mpsc::UnboundedSender<CandidateEvent>>>>;
type TrackListener = Arc<Mutex<Option<RemoteStreamHandler>>>;

/// Peer connection wrapper with event handling
pub struct RtcPeerTransport {
    /// Transport ID, used in logs
    id: String,
    /// WebRTC peer connection
    pc: Arc<RTCPeerConnection>,
    /// Listener for the negotiation attempt currently gathering
    candidate_listener: CandidateListener,
    /// Inbound track handler
    track_listener: TrackListener,
}

impl RtcPeerTransport {
    /// Create a new peer connection
    pub async fn new(ice: &IceConfig, id: String) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| AppError::Negotiation(format!("Failed to register codecs: {}", e)))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine).map_err(|e| {
            AppError::Negotiation(format!("Failed to register interceptors: {}", e))
        })?;

        let mut setting_engine = SettingEngine::default();
        let mode = mdns_mode();
        setting_engine.set_ice_multicast_dns_mode(mode);
        if mode == MulticastDnsMode::QueryAndGather {
            setting_engine.set_multicast_dns_host_name(default_mdns_host_name(&id));
        }
        debug!("WebRTC mDNS mode: {:?} (transport {})", mode, id);

        let api = APIBuilder::new()
            .with_setting_engine(setting_engine)
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = api
            .new_peer_connection(rtc_configuration(ice))
            .await
            .map_err(|e| {
                AppError::Negotiation(format!("Failed to create peer connection: {}", e))
            })?;

        let transport = Self {
            id,
            pc: Arc::new(pc),
            candidate_listener: Arc::new(Mutex::new(None)),
            track_listener: Arc::new(Mutex::new(None)),
        };
        transport.setup_event_handlers();

        Ok(transport)
    }

    /// Set up peer connection event handlers
    fn setup_event_handlers(&self) {
        let id = self.id.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                info!("Transport {} connection state: {:?}", id, s);
                Box::pin(async {})
            }));

        let listener = self.candidate_listener.clone();
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let event = match candidate {
                    Some(c) => CandidateEvent::Candidate(
                        c.to_json().map(|j| j.candidate).unwrap_or_default(),
                    ),
                    None => CandidateEvent::Complete,
                };

                trace!("Candidate event: {:?}", event);
                let mut slot = listener.lock();
                let delivered = slot.as_ref().map(|tx| tx.send(event).is_ok());
                if delivered == Some(false) {
                    // Receiver gone: the attempt that registered it is over.
                    *slot = None;
                }
                Box::pin(async {})
            }));

        let tracks = self.track_listener.clone();
        let published = Arc::new(AtomicBool::new(false));
        let id = self.id.clone();
        self.pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let stream = RemoteStream {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind: media_kind(track.kind()),
                    track: Some(track),
                };
                info!(
                    "Transport {} received remote {} track {}",
                    id, stream.kind, stream.track_id
                );

                // Only the first inbound track publishes the stream.
                if !published.swap(true, Ordering::SeqCst) {
                    if let Some(handler) = tracks.lock().as_ref() {
                        handler(stream);
                    }
                }
                Box::pin(async {})
            },
        ));
    }

    /// Add a receive-only transceiver for every requested kind the
    /// connection does not carry yet
    async fn ensure_transceivers(&self, intent: MediaIntent) -> Result<()> {
        let existing: Vec<RTPCodecType> = self
            .pc
            .get_transceivers()
            .await
            .iter()
            .map(|t| t.kind())
            .collect();

        let wanted = [
            (intent.video, RTPCodecType::Video),
            (intent.audio, RTPCodecType::Audio),
        ];
        for (enabled, kind) in wanted {
            if !enabled || existing.contains(&kind) {
                continue;
            }
            self.pc
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .map_err(|e| {
                    AppError::Negotiation(format!("Failed to add {:?} transceiver: {}", kind, e))
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    fn candidate_events(&self) -> mpsc::UnboundedReceiver<CandidateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.candidate_listener.lock() = Some(tx);
        rx
    }

    async fn create_offer(&self, intent: MediaIntent) -> Result<SessionDescription> {
        self.ensure_transceivers(intent).await?;

        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to create offer: {}", e)))?;

        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let sdp = to_rtc_description(description)?;
        self.pc
            .set_local_description(sdp)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to set local description: {}", e)))
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let local = self.pc.local_description().await?;
        let sdp_type = match local.sdp_type {
            RTCSdpType::Offer => SdpType::Offer,
            RTCSdpType::Answer => SdpType::Answer,
            _ => return None,
        };
        Some(SessionDescription {
            sdp_type,
            sdp: local.sdp,
        })
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let sdp = to_rtc_description(description)?;
        self.pc
            .set_remote_description(sdp)
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to set remote description: {}", e)))
    }

    async fn add_local_media(&self, media: &LocalMedia) -> Result<()> {
        let track: Arc<dyn TrackLocal + Send + Sync> = media.track.clone();
        self.pc
            .add_track(track)
            .await
            .map_err(|e| AppError::MediaAcquisition(format!("Failed to add local track: {}", e)))?;

        info!("Local media stream {} attached to {}", media.stream_id, self.id);
        Ok(())
    }

    fn on_remote_stream(&self, handler: RemoteStreamHandler) {
        *self.track_listener.lock() = Some(handler);
    }

    async fn close(&self) -> Result<()> {
        self.candidate_listener.lock().take();
        self.track_listener.lock().take();

        self.pc
            .close()
            .await
            .map_err(|e| AppError::Negotiation(format!("Failed to close peer connection: {}", e)))?;

        debug!("Transport {} closed", self.id);
        Ok(())
    }
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    };
    parsed.map_err(|e| AppError::Negotiation(format!("Invalid SDP: {}", e)))
}

fn media_kind(kind: RTPCodecType) -> MediaKind {
    match kind {
        RTPCodecType::Audio => MediaKind::Audio,
        RTPCodecType::Video => MediaKind::Video,
        _ => MediaKind::Unknown,
    }
}

/// Creates [`RtcPeerTransport`]s with fresh IDs
#[derive(Debug, Default, Clone)]
pub struct RtcTransportFactory;

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(&self, ice: &IceConfig) -> Result<Arc<dyn PeerTransport>> {
        let id = uuid::Uuid::new_v4().to_string();
        let transport = RtcPeerTransport::new(ice, id).await?;
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IceConfig;
    use crate::webrtc::gather::gather_local_offer;

    fn host_only() -> IceConfig {
        IceConfig {
            stun_servers: vec![],
            turn_servers: vec![],
        }
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(media_kind(RTPCodecType::Video), MediaKind::Video);
        assert_eq!(media_kind(RTPCodecType::Audio), MediaKind::Audio);
        assert_eq!(media_kind(RTPCodecType::Unspecified), MediaKind::Unknown);
    }

    #[tokio::test]
    async fn test_gathers_video_only_offer() {
        let transport = RtcPeerTransport::new(&host_only(), "test".to_string())
            .await
            .unwrap();

        let offer = gather_local_offer(
            &transport,
            MediaIntent {
                audio: false,
                video: true,
            },
            Some(std::time::Duration::from_secs(10)),
        )
        .await
        .unwrap();

        assert_eq!(offer.sdp_type, SdpType::Offer);
        assert!(offer.sdp.contains("m=video"));
        assert!(!offer.sdp.contains("m=audio"));
        assert!(offer.sdp.contains("a=recvonly"));

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_invalid_answer() {
        let transport = RtcPeerTransport::new(&host_only(), "test".to_string())
            .await
            .unwrap();

        let result = transport
            .set_remote_description(SessionDescription::answer("not sdp"))
            .await;
        assert!(matches!(result, Err(AppError::Negotiation(_))));

        transport.close().await.unwrap();
    }
}
