//! Candidate gathering barrier
//!
//! Turns incremental candidate discovery into a single awaitable offer.
//! Trickle candidates are never exposed; the offer is returned only after the
//! transport signals that discovery is complete.

use std::time::Duration;
use tracing::{debug, trace};

use super::signaling::SessionDescription;
use super::transport::{CandidateEvent, MediaIntent, PeerTransport};
use crate::error::{AppError, Result};

/// Create and apply a local offer, wait for candidate discovery to finish,
/// then return the finalized local description.
///
/// `timeout` bounds the wait for the end-of-candidates sentinel. With `None`
/// the barrier waits for as long as the transport keeps discovering.
pub async fn gather_local_offer(
    transport: &dyn PeerTransport,
    intent: MediaIntent,
    timeout: Option<Duration>,
) -> Result<SessionDescription> {
    // Listener goes in first so the sentinel cannot be missed.
    let mut events = transport.candidate_events();

    let offer = transport.create_offer(intent).await?;
    transport.set_local_description(offer).await?;
    debug!("Local offer applied, waiting for candidate gathering");

    let wait = async {
        let mut discovered = 0usize;
        while let Some(event) = events.recv().await {
            match event {
                CandidateEvent::Candidate(candidate) => {
                    discovered += 1;
                    trace!("Local candidate: {}", candidate);
                }
                CandidateEvent::Complete => return Ok(discovered),
            }
        }
        Err(AppError::Negotiation(
            "candidate listener closed before gathering completed".to_string(),
        ))
    };

    let discovered = match timeout {
        Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
            AppError::Negotiation(format!(
                "candidate gathering did not complete within {} ms",
                limit.as_millis()
            ))
        })??,
        None => wait.await?,
    };
    drop(events);

    let local = transport.local_description().await.ok_or_else(|| {
        AppError::Negotiation("local description missing after gathering".to_string())
    })?;

    debug!(
        "Candidate gathering complete: {} candidates, offer {} bytes",
        discovered,
        local.sdp.len()
    );
    Ok(local)
}
