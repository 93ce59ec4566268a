//! Seam between the connection handler and an HTTP engine.
//!
//! A transport accepts a fully-described [`NativeRequest`] and returns a
//! future of the [`NativeResponse`]. Submission itself is synchronous so
//! that requests the engine rejects outright fail inside `handle`, before
//! anything is spawned.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::Stream;
use http::{HeaderMap, Method, StatusCode};
use rest_client_sdk::{ClientConfig, ClientError, TransportError};
use tokio::runtime::Handle;
use url::Url;

use crate::entity_writer::EntityWriter;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Raw response body as delivered by the engine.
pub type BodyStream = BoxStream<Result<Bytes, io::Error>>;

/// In-flight execution of a submitted request.
pub type ResponseFuture = BoxFuture<'static, Result<NativeResponse, TransportError>>;

/// Request in the shape a transport consumes.
pub struct NativeRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<EntityWriter>,
}

impl fmt::Debug for NativeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Response as produced by a transport.
pub struct NativeResponse {
    pub status: StatusCode,
    /// Reason phrase when the engine exposes one.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    /// `None` when the response carries no entity.
    pub body: Option<BodyStream>,
}

impl fmt::Debug for NativeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .finish()
    }
}

impl NativeResponse {
    /// Status message: the engine's reason phrase, or the canonical one.
    #[must_use]
    pub fn message(&self) -> String {
        self.reason
            .clone()
            .or_else(|| self.status.canonical_reason().map(str::to_owned))
            .unwrap_or_default()
    }
}

/// An asynchronous HTTP engine shared by all requests of a handler.
pub trait HttpTransport: Send + Sync {
    /// Hand `request` to the engine.
    ///
    /// The returned future is spawned by the caller on its runtime.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when the engine refuses the request.
    fn submit(&self, request: NativeRequest) -> Result<ResponseFuture, TransportError>;
}

/// Creates the transport a handler opens lazily on its first request.
pub trait TransportFactory: Send + Sync {
    /// # Errors
    /// Returns [`ClientError::Config`] when `config` cannot be honoured.
    fn create(&self, config: &ClientConfig, runtime: &Handle) -> Result<Arc<dyn HttpTransport>, ClientError>;
}
