use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load capture sources: {0}")]
    Catalog(String),

    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Signaling failed: {0}")]
    Signaling(String),

    #[error("Local media unavailable: {0}")]
    MediaAcquisition(String),

    #[error("Session busy: {0}")]
    Busy(String),

    #[error("Negotiation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short machine-readable kind, used in events and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Catalog(_) => "catalog",
            AppError::Negotiation(_) => "negotiation",
            AppError::Signaling(_) => "signaling",
            AppError::MediaAcquisition(_) => "media_acquisition",
            AppError::Busy(_) => "busy",
            AppError::Cancelled => "cancelled",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// Whether the error should reach the presentation error channel.
    ///
    /// Rejected and cancelled starts are not failures of a negotiation attempt.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, AppError::Busy(_) | AppError::Cancelled)
    }
}

/// Result type alias for the viewer
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_reportable() {
        let err = AppError::Signaling("connection refused".to_string());
        assert_eq!(err.kind(), "signaling");
        assert!(err.is_reportable());
        assert_eq!(err.to_string(), "Signaling failed: connection refused");

        assert!(!AppError::Cancelled.is_reportable());
        assert!(!AppError::Busy("negotiating".to_string()).is_reportable());
    }
}
