use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use mime::Mime;
use parking_lot::Mutex;

use crate::context::BodyReader;
use crate::entity::FromEntity;
use crate::error::ClientError;
use crate::request::Attributes;

/// Accessor contract of a client response.
///
/// Every accessor is fallible so that deferred implementations can surface a
/// resolution failure from whichever accessor first forces it. A response
/// that is already materialized never fails on the plain getters.
pub trait ClientResponse {
    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn status(&self) -> Result<StatusCode, ClientError>;

    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn set_status(&self, status: StatusCode) -> Result<(), ClientError>;

    /// Status message (reason phrase).
    ///
    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn message(&self) -> Result<String, ClientError>;

    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn set_message(&self, message: &str) -> Result<(), ClientError>;

    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn headers(&self) -> Result<HeaderMap, ClientError>;

    /// Snapshot of the attribute bag.
    ///
    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn attributes(&self) -> Result<Attributes, ClientError>;

    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn attribute<T: Clone + Send + Sync + 'static>(&self) -> Result<Option<T>, ClientError>;

    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn set_attribute<T: Clone + Send + Sync + 'static>(&self, value: T) -> Result<(), ClientError>;

    /// Read the entity (once) and decode it as `T`.
    ///
    /// The body is drained on first use and cached, so the entity can be
    /// decoded repeatedly and as different types.
    ///
    /// # Errors
    /// Returns an I/O error while reading the body, or the decoding error.
    fn entity<T: FromEntity>(&self) -> Result<T, ClientError>;

    /// Replace the entity.
    ///
    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn set_entity(&self, entity: Entity) -> Result<(), ClientError>;

    /// Take the body stream, leaving the response without an entity.
    ///
    /// # Errors
    /// Returns the resolution failure of a deferred response.
    fn take_body(&self) -> Result<BodyReader, ClientError>;

    /// Drain and discard the entity.
    ///
    /// # Errors
    /// Returns an I/O error while draining.
    fn consume_content(&self) -> Result<(), ClientError>;
}

/// Response entity.
pub enum Entity {
    /// No entity, or an entity that was consumed.
    Empty,
    /// Body not yet read.
    Reader(BodyReader),
    /// Body read into memory.
    Bytes(Bytes),
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Empty => write!(f, "Entity::Empty"),
            Entity::Reader(_) => write!(f, "Entity::Reader(..)"),
            Entity::Bytes(bytes) => f.debug_tuple("Entity::Bytes").field(&bytes.len()).finish(),
        }
    }
}

impl From<Bytes> for Entity {
    fn from(bytes: Bytes) -> Self {
        Entity::Bytes(bytes)
    }
}

/// A fully-formed response: status line, headers, attributes and body.
///
/// Shared between all resolvers of one pending response, hence the interior
/// mutability behind the setters.
pub struct MaterializedResponse {
    state: Mutex<ResponseState>,
}

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    message: String,
    headers: HeaderMap,
    attributes: Attributes,
    entity: Entity,
}

impl fmt::Debug for MaterializedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MaterializedResponse")
            .field("status", &state.status)
            .field("message", &state.message)
            .field("headers", &state.headers)
            .field("entity", &state.entity)
            .finish_non_exhaustive()
    }
}

impl MaterializedResponse {
    pub fn new(
        status: StatusCode,
        message: impl Into<String>,
        headers: HeaderMap,
        attributes: Attributes,
        body: BodyReader,
    ) -> Self {
        Self {
            state: Mutex::new(ResponseState {
                status,
                message: message.into(),
                headers,
                attributes,
                entity: Entity::Reader(body),
            }),
        }
    }

    fn content_type(headers: &HeaderMap) -> Option<Mime> {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

impl ClientResponse for MaterializedResponse {
    fn status(&self) -> Result<StatusCode, ClientError> {
        Ok(self.state.lock().status)
    }

    fn set_status(&self, status: StatusCode) -> Result<(), ClientError> {
        self.state.lock().status = status;
        Ok(())
    }

    fn message(&self) -> Result<String, ClientError> {
        Ok(self.state.lock().message.clone())
    }

    fn set_message(&self, message: &str) -> Result<(), ClientError> {
        message.clone_into(&mut self.state.lock().message);
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        Ok(self.state.lock().headers.clone())
    }

    fn attributes(&self) -> Result<Attributes, ClientError> {
        Ok(self.state.lock().attributes.clone())
    }

    fn attribute<T: Clone + Send + Sync + 'static>(&self) -> Result<Option<T>, ClientError> {
        Ok(self.state.lock().attributes.get::<T>().cloned())
    }

    fn set_attribute<T: Clone + Send + Sync + 'static>(&self, value: T) -> Result<(), ClientError> {
        self.state.lock().attributes.insert(value);
        Ok(())
    }

    fn entity<T: FromEntity>(&self) -> Result<T, ClientError> {
        let mut state = self.state.lock();
        let content = match std::mem::replace(&mut state.entity, Entity::Empty) {
            Entity::Empty => Bytes::new(),
            Entity::Bytes(bytes) => bytes,
            Entity::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Bytes::from(buf)
            }
        };
        state.entity = Entity::Bytes(content.clone());
        let content_type = Self::content_type(&state.headers);
        drop(state);
        T::from_entity(content, content_type.as_ref())
    }

    fn set_entity(&self, entity: Entity) -> Result<(), ClientError> {
        self.state.lock().entity = entity;
        Ok(())
    }

    fn take_body(&self) -> Result<BodyReader, ClientError> {
        let entity = std::mem::replace(&mut self.state.lock().entity, Entity::Empty);
        Ok(match entity {
            Entity::Empty => Box::new(io::empty()),
            Entity::Reader(reader) => reader,
            Entity::Bytes(bytes) => Box::new(io::Cursor::new(bytes)),
        })
    }

    fn consume_content(&self) -> Result<(), ClientError> {
        let entity = std::mem::replace(&mut self.state.lock().entity, Entity::Empty);
        if let Entity::Reader(mut reader) = entity {
            io::copy(&mut reader, &mut io::sink())?;
        }
        Ok(())
    }
}
