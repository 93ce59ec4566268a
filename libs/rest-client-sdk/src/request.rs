use std::fmt;
use std::sync::Arc;

use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::entity::EntityProducer;
use crate::error::ClientError;

/// Typed attribute bag shared between a request and its response.
pub type Attributes = Extensions;

/// Outgoing request descriptor handed to a connection handler.
///
/// Immutable once built. Cloning is cheap: the entity is shared.
#[derive(Clone)]
pub struct ClientRequest {
    method: Method,
    uri: Url,
    headers: HeaderMap,
    entity: Option<Arc<dyn EntityProducer>>,
    attributes: Attributes,
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRequest")
            .field("method", &self.method)
            .field("uri", &self.uri.as_str())
            .field("headers", &self.headers)
            .field("entity", &self.entity.is_some())
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl ClientRequest {
    #[must_use]
    pub fn builder() -> ClientRequestBuilder {
        ClientRequestBuilder::default()
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn entity(&self) -> Option<&Arc<dyn EntityProducer>> {
        self.entity.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Typed attribute lookup.
    #[must_use]
    pub fn attribute<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.attributes.get::<T>()
    }
}

/// Builder for [`ClientRequest`]
#[derive(Default)]
pub struct ClientRequestBuilder {
    method: Option<Method>,
    uri: Option<String>,
    headers: HeaderMap,
    entity: Option<Arc<dyn EntityProducer>>,
    attributes: Attributes,
}

impl ClientRequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Append a header value. Repeated names keep every value in order.
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] for an invalid name or value.
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, ClientError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: fmt::Display,
        V::Error: fmt::Display,
    {
        let key = key
            .try_into()
            .map_err(|e| ClientError::Build(format!("Invalid header name: {e}")))?;
        let value = value
            .try_into()
            .map_err(|e| ClientError::Build(format!("Invalid header value: {e}")))?;
        self.headers.append(key, value);
        Ok(self)
    }

    /// Like [`header`](Self::header), but a `None` value is skipped.
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] for an invalid name or value.
    pub fn header_opt<K, V>(self, key: K, value: Option<V>) -> Result<Self, ClientError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: fmt::Display,
        V::Error: fmt::Display,
    {
        match value {
            Some(value) => self.header(key, value),
            None => Ok(self),
        }
    }

    /// Append every value of `headers`.
    #[must_use]
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn entity<E: EntityProducer + 'static>(mut self, entity: E) -> Self {
        self.entity = Some(Arc::new(entity));
        self
    }

    #[must_use]
    pub fn shared_entity(mut self, entity: Arc<dyn EntityProducer>) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Set a typed attribute, replacing any previous value of the same type.
    #[must_use]
    pub fn attribute<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.attributes.insert(value);
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] when the URI is missing or malformed.
    pub fn build(self) -> Result<ClientRequest, ClientError> {
        let method = self.method.unwrap_or(Method::GET);
        let uri = self
            .uri
            .ok_or_else(|| ClientError::Build("Request URI is required".into()))?;
        let uri = Url::parse(&uri).map_err(|e| ClientError::Build(format!("Invalid URI '{uri}': {e}")))?;

        Ok(ClientRequest {
            method,
            uri,
            headers: self.headers,
            entity: self.entity,
            attributes: self.attributes,
        })
    }
}
