//! Handler context and stream adapters.
//!
//! A [`HandlerContext`] carries ordered chains of stream adapters. The
//! connection handler wraps the outgoing entity writer with the output chain
//! and the incoming body reader with the input chain; the first registered
//! adapter is applied first and therefore sits closest to the wire.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use http::{HeaderMap, StatusCode};

use crate::request::ClientRequest;

/// Response body as a blocking byte source.
pub type BodyReader = Box<dyn Read + Send>;

/// Request body sink.
pub type BodyWriter = Box<dyn Write + Send>;

/// Status line and headers of a response, available before its body is read.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Wraps the body reader of an incoming response.
pub trait InputStreamAdapter: Send + Sync {
    /// # Errors
    /// Returns an I/O error if the adapter cannot wrap the stream.
    fn adapt(&self, input: BodyReader, head: &ResponseHead) -> io::Result<BodyReader>;
}

/// Wraps the writer an outgoing request entity is serialized into.
pub trait OutputStreamAdapter: Send + Sync {
    /// # Errors
    /// Returns an I/O error if the adapter cannot wrap the stream.
    fn adapt(&self, output: BodyWriter, request: &ClientRequest) -> io::Result<BodyWriter>;
}

/// Per-request processing context.
#[derive(Clone, Default)]
pub struct HandlerContext {
    input_adapters: Vec<Arc<dyn InputStreamAdapter>>,
    output_adapters: Vec<Arc<dyn OutputStreamAdapter>>,
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("input_adapters", &self.input_adapters.len())
            .field("output_adapters", &self.output_adapters.len())
            .finish()
    }
}

impl HandlerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_input_adapter<A: InputStreamAdapter + 'static>(mut self, adapter: A) -> Self {
        self.input_adapters.push(Arc::new(adapter));
        self
    }

    #[must_use]
    pub fn with_output_adapter<A: OutputStreamAdapter + 'static>(mut self, adapter: A) -> Self {
        self.output_adapters.push(Arc::new(adapter));
        self
    }

    #[must_use]
    pub fn input_adapters(&self) -> &[Arc<dyn InputStreamAdapter>] {
        &self.input_adapters
    }

    #[must_use]
    pub fn output_adapters(&self) -> &[Arc<dyn OutputStreamAdapter>] {
        &self.output_adapters
    }

    /// Run `input` through the input adapter chain.
    ///
    /// # Errors
    /// Returns the first adapter failure.
    pub fn adapt_input(&self, input: BodyReader, head: &ResponseHead) -> io::Result<BodyReader> {
        self.input_adapters
            .iter()
            .try_fold(input, |reader, adapter| adapter.adapt(reader, head))
    }

    /// Run `output` through the output adapter chain.
    ///
    /// # Errors
    /// Returns the first adapter failure.
    pub fn adapt_output(&self, output: BodyWriter, request: &ClientRequest) -> io::Result<BodyWriter> {
        self.output_adapters
            .iter()
            .try_fold(output, |writer, adapter| adapter.adapt(writer, request))
    }
}
