//! Resource-oriented facade over a [`ConnectionHandler`].

use std::fmt;
use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::Method;
use mime::Mime;
use rest_client_sdk::{ClientConfig, ClientError, ClientRequest, ClientRequestBuilder, ConnectionHandler, EntityProducer, HandlerContext};
use tracing::debug;

use crate::handler::AsyncConnectionHandler;

/// Entry point for issuing requests: binds a configuration and a context to
/// a connection handler.
pub struct RestClient<H = AsyncConnectionHandler> {
    config: ClientConfig,
    context: HandlerContext,
    handler: Arc<H>,
}

impl<H> fmt::Debug for RestClient<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<H> Clone for RestClient<H> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            context: self.context.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<H: ConnectionHandler> RestClient<H> {
    #[must_use]
    pub fn new(config: ClientConfig, handler: Arc<H>) -> Self {
        Self {
            config,
            context: HandlerContext::new(),
            handler,
        }
    }

    /// Use `context` (stream adapters) for every request of this client.
    #[must_use]
    pub fn with_context(mut self, context: HandlerContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Start a request against `url`.
    #[must_use]
    pub fn resource(&self, url: impl Into<String>) -> Resource<H> {
        Resource {
            handler: self.handler.clone(),
            context: self.context.clone(),
            builder: ClientRequest::builder()
                .uri(url)
                .attribute(self.config.clone()),
        }
    }
}

/// A single request being assembled; consumed by one of the verbs.
pub struct Resource<H = AsyncConnectionHandler> {
    handler: Arc<H>,
    context: HandlerContext,
    builder: ClientRequestBuilder,
}

impl<H> fmt::Debug for Resource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").finish_non_exhaustive()
    }
}

impl<H: ConnectionHandler> Resource<H> {
    /// Add an `Accept` media type. May be called repeatedly.
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] when the media type is not a valid
    /// header value.
    pub fn accept(self, media: &Mime) -> Result<Self, ClientError> {
        self.header(ACCEPT, media.as_ref())
    }

    /// # Errors
    /// Returns [`ClientError::Build`] when the media type is not a valid
    /// header value.
    pub fn content_type(self, media: &Mime) -> Result<Self, ClientError> {
        self.header(CONTENT_TYPE, media.as_ref())
    }

    /// # Errors
    /// Returns [`ClientError::Build`] for an invalid name or value.
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, ClientError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: fmt::Display,
        V::Error: fmt::Display,
    {
        self.builder = self.builder.header(key, value)?;
        Ok(self)
    }

    /// Attach a typed request attribute.
    #[must_use]
    pub fn attribute<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.builder = self.builder.attribute(value);
        self
    }

    /// # Errors
    /// Returns the handler's error.
    pub fn get(self) -> Result<H::Response, ClientError> {
        self.dispatch(Method::GET)
    }

    /// # Errors
    /// Returns the handler's error.
    pub fn delete(self) -> Result<H::Response, ClientError> {
        self.dispatch(Method::DELETE)
    }

    /// # Errors
    /// Returns the handler's error.
    pub fn post<E: EntityProducer + 'static>(self, entity: E) -> Result<H::Response, ClientError> {
        self.invoke(Method::POST, entity)
    }

    /// # Errors
    /// Returns the handler's error.
    pub fn put<E: EntityProducer + 'static>(self, entity: E) -> Result<H::Response, ClientError> {
        self.invoke(Method::PUT, entity)
    }

    /// Send `entity` with an arbitrary method.
    ///
    /// # Errors
    /// Returns the handler's error.
    pub fn invoke<E: EntityProducer + 'static>(mut self, method: Method, entity: E) -> Result<H::Response, ClientError> {
        self.builder = self.builder.entity(entity);
        self.dispatch(method)
    }

    fn dispatch(self, method: Method) -> Result<H::Response, ClientError> {
        let request = self.builder.method(method).build()?;
        debug!(method = %request.method(), uri = %request.uri(), "Dispatching request");
        self.handler.handle(request, &self.context)
    }
}
