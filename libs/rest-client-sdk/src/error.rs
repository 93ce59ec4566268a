use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by an HTTP transport while executing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport task aborted: {0}")]
    Aborted(String),
}

/// Error types surfaced by request handling and response resolution
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request (URI, headers, entity) could not be prepared.
    #[error("Request build error: {0}")]
    Build(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport rejected the request before it was sent.
    #[error("Submission failed: {0}")]
    Submit(#[source] TransportError),

    /// The request was sent but did not produce a response.
    ///
    /// The cause is shared so that every resolver of the same pending
    /// response observes the same failure.
    #[error("Execution failed: {0}")]
    Execution(#[source] Arc<TransportError>),

    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    #[error("Request was cancelled")]
    Cancelled,

    /// A blocking resolution was attempted on a thread driven by a tokio
    /// runtime. Await the response instead.
    #[error("Cannot block on a response from within an async runtime")]
    BlockingInAsyncContext,

    #[error("Connection handler is shut down")]
    Closed,

    #[error("Entity error: {0}")]
    Entity(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        ClientError::Execution(Arc::new(err))
    }
}
