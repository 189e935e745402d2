//! Capture source catalog
//!
//! The remote agent lists its capture sources at `GET /api/screens`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{AppError, Result};

/// A capture target known to the remote side, identified by its index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureSource(pub u32);

impl CaptureSource {
    pub fn index(&self) -> u32 {
        self.0
    }

    /// Human readable label, screens are numbered from 1
    pub fn label(&self) -> String {
        format!("Screen {}", self.0 + 1)
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry as sent by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub index: u32,
}

/// `GET /api/screens` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreensResponse {
    pub screens: Vec<ScreenEntry>,
}

impl ScreensResponse {
    pub fn into_sources(self) -> Vec<CaptureSource> {
        self.screens
            .into_iter()
            .map(|s| CaptureSource(s.index))
            .collect()
    }
}

/// Source of the capture catalog
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<CaptureSource>>;
}

/// Catalog client for the agent's HTTP API
pub struct HttpSourceCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSourceCatalog {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceCatalog for HttpSourceCatalog {
    async fn list_sources(&self) -> Result<Vec<CaptureSource>> {
        let url = format!("{}/api/screens", self.base_url);
        debug!("Fetching capture sources from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Catalog(format!("Request to {} failed: {}", url, e)))?;

        let body: ScreensResponse = response
            .json()
            .await
            .map_err(|e| AppError::Catalog(format!("Invalid catalog response: {}", e)))?;

        Ok(body.into_sources())
    }
}
