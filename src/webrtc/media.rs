//! Local media acquisition
//!
//! Some peers only answer offers that carry a local media section, so the
//! coordinator asks a provider for an outgoing source before building the
//! offer. Acquisition is best-effort: most providers return nothing.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use super::transport::LocalMedia;
use crate::config::LocalMediaMode;
use crate::error::Result;

/// VP8 clock rate
const VIDEO_CLOCK_RATE: u32 = 90000;

/// Provides the optional outgoing media source for a session
#[async_trait]
pub trait LocalMediaProvider: Send + Sync {
    async fn acquire(&self) -> Result<Option<LocalMedia>>;
}

/// Receive-only sessions
#[derive(Debug, Default, Clone)]
pub struct NoLocalMedia;

#[async_trait]
impl LocalMediaProvider for NoLocalMedia {
    async fn acquire(&self) -> Result<Option<LocalMedia>> {
        Ok(None)
    }
}

/// Attaches a video track that never sends samples
#[derive(Debug, Default, Clone)]
pub struct PlaceholderVideoSource;

#[async_trait]
impl LocalMediaProvider for PlaceholderVideoSource {
    async fn acquire(&self) -> Result<Option<LocalMedia>> {
        let stream_id = format!("viewer-{}", uuid::Uuid::new_v4());
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: VIDEO_CLOCK_RATE,
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.clone(),
        ));
        debug!("Created placeholder local video stream {}", stream_id);

        Ok(Some(LocalMedia { stream_id, track }))
    }
}

/// Provider for the configured local media mode
pub fn provider_for(mode: LocalMediaMode) -> Arc<dyn LocalMediaProvider> {
    match mode {
        LocalMediaMode::None => Arc::new(NoLocalMedia),
        LocalMediaMode::Placeholder => Arc::new(PlaceholderVideoSource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::track::track_local::TrackLocal;

    #[tokio::test]
    async fn test_no_local_media() {
        assert!(provider_for(LocalMediaMode::None)
            .acquire()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_placeholder_video() {
        let media = provider_for(LocalMediaMode::Placeholder)
            .acquire()
            .await
            .unwrap()
            .unwrap();
        assert!(media.stream_id.starts_with("viewer-"));
        assert_eq!(media.track.stream_id(), media.stream_id);
        assert_eq!(media.track.id(), "video");
    }
}
