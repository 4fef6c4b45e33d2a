use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    /// No option chain, no price history, or the provider refused the symbol.
    /// The orchestrator skips the symbol on this variant.
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Request error: {0}")]
    Request(String),

    /// Transport failure, 429 or 5xx. The only errors the NSE client retries.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Non-JSON response: {0}")]
    NonJsonResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScreenError {
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        ScreenError::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Errors a data collaborator can raise for a single symbol. These never
    /// abort a batch.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            ScreenError::DataUnavailable { .. }
                | ScreenError::Request(_)
                | ScreenError::Transient(_)
                | ScreenError::NonJsonResponse(_)
                | ScreenError::Parse(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ScreenError::Transient(_))
    }
}

impl From<reqwest::Error> for ScreenError {
    fn from(err: reqwest::Error) -> Self {
        ScreenError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for ScreenError {
    fn from(err: serde_json::Error) -> Self {
        ScreenError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_skippable() {
        let err = ScreenError::unavailable("INFY", "empty option chain");
        assert!(err.is_data_unavailable());
        assert_eq!(err.to_string(), "Data unavailable for INFY: empty option chain");
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ScreenError::Transient("503 Service Unavailable".to_string()).is_retryable());
        assert!(!ScreenError::Request("Client error 404".to_string()).is_retryable());
        assert!(!ScreenError::NonJsonResponse("<html>".to_string()).is_retryable());
        assert!(ScreenError::Transient("timeout".to_string()).is_data_unavailable());
    }

    #[test]
    fn test_io_is_not_skippable() {
        let err = ScreenError::from(std::io::Error::other("disk full"));
        assert!(!err.is_data_unavailable());
    }
}
