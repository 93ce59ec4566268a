//! Connection handler bridging the synchronous handler contract to an async
//! HTTP engine.

use std::fmt;
use std::io;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, HeaderValue};
use http::Method;
use parking_lot::RwLock;
use rest_client_sdk::{
    BodyReader, ClientConfig, ClientError, ClientRequest, ConnectionHandler, HandlerContext, ResponseHead,
    TransportError,
};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};
use url::Url;

use crate::entity_writer::EntityWriter;
use crate::future_response::FutureClientResponse;
use crate::pending::PendingResponse;
use crate::reqwest_transport::ReqwestTransportFactory;
use crate::transport::{HttpTransport, NativeRequest, NativeResponse, ResponseFuture, TransportFactory};

/// Submits requests to a shared [`HttpTransport`] without waiting for them.
///
/// The transport is opened on the first request (from that request's
/// [`ClientConfig`] attribute) unless one is supplied up front, reused by all
/// later requests, and released by [`shutdown`](Self::shutdown).
///
/// Requests run as tasks on the runtime given at construction, which must be a
/// multi-thread runtime: resolving a response blocks on it.
pub struct AsyncConnectionHandler {
    runtime: Handle,
    factory: Arc<dyn TransportFactory>,
    transport: RwLock<TransportSlot>,
}

enum TransportSlot {
    Unopened,
    Open(Arc<dyn HttpTransport>),
    Closed,
}

impl TransportSlot {
    fn current(&self) -> Option<Result<Arc<dyn HttpTransport>, ClientError>> {
        match self {
            TransportSlot::Unopened => None,
            TransportSlot::Open(transport) => Some(Ok(transport.clone())),
            TransportSlot::Closed => Some(Err(ClientError::Closed)),
        }
    }
}

impl fmt::Debug for AsyncConnectionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.transport.read() {
            TransportSlot::Unopened => "unopened",
            TransportSlot::Open(_) => "open",
            TransportSlot::Closed => "closed",
        };
        f.debug_struct("AsyncConnectionHandler")
            .field("transport", &state)
            .finish_non_exhaustive()
    }
}

impl AsyncConnectionHandler {
    /// Handler opening a `reqwest` transport on first use.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self::with_factory(runtime, ReqwestTransportFactory)
    }

    #[must_use]
    pub fn with_factory(runtime: Handle, factory: impl TransportFactory + 'static) -> Self {
        Self {
            runtime,
            factory: Arc::new(factory),
            transport: RwLock::new(TransportSlot::Unopened),
        }
    }

    /// Handler using an already opened transport.
    #[must_use]
    pub fn with_transport(runtime: Handle, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            runtime,
            factory: Arc::new(ReqwestTransportFactory),
            transport: RwLock::new(TransportSlot::Open(transport)),
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Whether a transport is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(&*self.transport.read(), TransportSlot::Open(_))
    }

    /// Release the transport. Requests already submitted keep running; new
    /// requests fail with [`ClientError::Closed`].
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.transport.write(), TransportSlot::Closed);
        if matches!(previous, TransportSlot::Open(_)) {
            debug!("Connection handler shut down; transport released");
        }
    }

    /// Submit `request` and return its pending response immediately.
    ///
    /// # Errors
    /// - [`ClientError::Closed`] after [`shutdown`](Self::shutdown)
    /// - [`ClientError::Config`] when a transport must be opened, or an entity
    ///   encoded, and the request carries no [`ClientConfig`]
    /// - [`ClientError::Build`] when the entity cannot be serialized
    /// - [`ClientError::Submit`] when the transport rejects the request
    pub fn submit(&self, request: ClientRequest, context: &HandlerContext) -> Result<PendingResponse, ClientError> {
        let transport = self.transport_for(&request)?;
        let request = Arc::new(request);

        let body = match request.entity() {
            None => None,
            Some(_) => {
                let config = config_of(&request)?;
                EntityWriter::for_request(&request, context, config.chunked)?
            }
        };

        let mut headers = request.headers().clone();
        if let Some(writer) = &body {
            if !headers.contains_key(CONTENT_TYPE) {
                if let Some(value) = writer
                    .content_type()
                    .and_then(|media| HeaderValue::from_str(media.as_ref()).ok())
                {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
        }

        let native = NativeRequest {
            method: request.method().clone(),
            url: request.uri().clone(),
            headers,
            body,
        };

        let future = transport.submit(native).map_err(|e| {
            warn!(
                method = %request.method(),
                uri = %request.uri(),
                error = %e,
                "Request submission failed"
            );
            ClientError::Submit(e)
        })?;

        let task = self.runtime.spawn(track_completion(
            request.method().clone(),
            request.uri().clone(),
            future,
        ));

        Ok(PendingResponse::new(self.runtime.clone(), task, request, context.clone()))
    }

    /// Run a response body through the context's input adapters.
    ///
    /// # Errors
    /// Returns the first adapter failure.
    pub fn adapt_input(body: BodyReader, head: &ResponseHead, context: &HandlerContext) -> io::Result<BodyReader> {
        context.adapt_input(body, head)
    }

    fn transport_for(&self, request: &ClientRequest) -> Result<Arc<dyn HttpTransport>, ClientError> {
        if let Some(current) = self.transport.read().current() {
            return current;
        }

        let mut slot = self.transport.write();
        if let Some(current) = slot.current() {
            return current;
        }

        let config = config_of(request)?;
        let transport = self.factory.create(config, &self.runtime)?;
        *slot = TransportSlot::Open(transport.clone());
        debug!(uri = %request.uri(), "Opened transport on first request");
        Ok(transport)
    }
}

impl ConnectionHandler for AsyncConnectionHandler {
    type Response = FutureClientResponse;

    fn handle(&self, request: ClientRequest, context: &HandlerContext) -> Result<FutureClientResponse, ClientError> {
        self.submit(request, context).map(FutureClientResponse::new)
    }
}

fn config_of(request: &ClientRequest) -> Result<&ClientConfig, ClientError> {
    request
        .attribute::<ClientConfig>()
        .ok_or_else(|| ClientError::Config(format!("Request to {} carries no ClientConfig attribute", request.uri())))
}

/// Logs how a request task ended. Dropped unsettled means aborted.
struct CompletionTracker {
    method: Method,
    url: Url,
    settled: bool,
}

impl Drop for CompletionTracker {
    fn drop(&mut self) {
        if !self.settled {
            debug!(method = %self.method, url = %self.url, "Request cancelled");
        }
    }
}

async fn track_completion(method: Method, url: Url, future: ResponseFuture) -> Result<NativeResponse, TransportError> {
    let mut tracker = CompletionTracker {
        method,
        url,
        settled: false,
    };

    let result = future.await;
    tracker.settled = true;

    match &result {
        Ok(response) => debug!(
            method = %tracker.method,
            url = %tracker.url,
            status = %response.status,
            "Request completed"
        ),
        Err(e) => error!(
            method = %tracker.method,
            url = %tracker.url,
            error = %e,
            "Request failed"
        ),
    }
    result
}
