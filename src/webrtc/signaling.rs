//! WebRTC signaling types and the offer/answer exchange

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::CaptureSource;
use crate::error::{AppError, Result};

/// Role of a session description in the offer/answer exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Answer => write!(f, "answer"),
        }
    }
}

/// SDP tagged with its role. Never mutated, only replaced by a new negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One negotiation attempt: the finalized local offer plus the chosen source
#[derive(Debug, Clone)]
pub struct NegotiationRequest {
    pub offer: SessionDescription,
    pub screen: CaptureSource,
}

impl NegotiationRequest {
    pub fn new(offer: SessionDescription, screen: CaptureSource) -> Result<Self> {
        if offer.sdp_type != SdpType::Offer {
            return Err(AppError::Negotiation(format!(
                "expected an offer, got {}",
                offer.sdp_type
            )));
        }
        Ok(Self { offer, screen })
    }

    fn body(&self) -> SessionRequest<'_> {
        SessionRequest {
            offer: &self.offer.sdp,
            screen: self.screen,
        }
    }
}

/// `POST /api/session` request body
#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    offer: &'a str,
    screen: CaptureSource,
}

/// `POST /api/session` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub answer: String,
}

/// Carries one negotiation request to the remote side and returns its answer
#[async_trait]
pub trait SignalingExchange: Send + Sync {
    async fn exchange(&self, request: &NegotiationRequest) -> Result<SessionDescription>;
}

/// Signaling over the agent's HTTP API. A single attempt, no retry.
pub struct HttpSignaling {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpSignaling {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SignalingExchange for HttpSignaling {
    async fn exchange(&self, request: &NegotiationRequest) -> Result<SessionDescription> {
        let url = format!("{}/api/session", self.base_url);
        debug!(
            "Sending offer ({} bytes) for screen {} to {}",
            request.offer.sdp.len(),
            request.screen,
            url
        );

        let mut builder = self.client.post(&url).json(&request.body());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Signaling(format!("Request to {} failed: {}", url, e)))?;

        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Signaling(format!("Invalid session response: {}", e)))?;

        info!("Received answer for screen {}", request.screen);
        Ok(SessionDescription::answer(body.answer))
    }
}
