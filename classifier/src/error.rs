//! Error types for the classification client

use thiserror::Error;

/// Errors that keep a classification request from reaching the service
///
/// A service that answers with an error status or an unusable body is not
/// an error here; the client reports it as `Classified::Unavailable`.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// The upload could not be encoded as a multipart form
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// HTTP request failed (connection refused, timeout, ...)
    #[error("Request failed: {0}")]
    RequestFailed(String),
}
