//! Adapter-boundary error taxonomy.
//!
//! Every failure class below is converted into an error snapshot at the
//! adapter boundary; none of them propagate into the poller or the gateway.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// No secret available for the service
    #[error("{0}")]
    CredentialMissing(String),
    /// Credential rejected or expired by the remote service
    #[error("{0}")]
    Auth(String),
    /// Connection or timeout failure
    #[error("Connection failed: {0}")]
    Network(String),
    /// Non-success HTTP status (message includes the status and context)
    #[error("{0}")]
    Http(String),
    /// Malformed remote response
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Network(e.to_string())
    }
}
