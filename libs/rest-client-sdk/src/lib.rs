//! Contracts for the deferred REST client.
//!
//! This crate holds the framework-level model shared by connection handlers
//! and their callers:
//!
//! - [`ClientRequest`]: method, URI, headers, optional entity and a typed
//!   attribute bag (which carries the [`ClientConfig`])
//! - [`HandlerContext`]: ordered input/output stream adapter chains
//! - [`ClientResponse`]: the response accessor contract, implemented by the
//!   eagerly built [`MaterializedResponse`]
//! - [`ConnectionHandler`]: the entry point a transport integration implements
//!
//! Implementations live in the `rest-client` crate.

mod config;
mod context;
mod entity;
mod error;
mod handler;
mod request;
mod response;

pub use config::{ClientConfig, ENV_PREFIX};
pub use context::{
    BodyReader, BodyWriter, HandlerContext, InputStreamAdapter, OutputStreamAdapter, ResponseHead,
};
pub use entity::{EntityProducer, FromEntity, Json};
pub use error::{ClientError, TransportError};
pub use handler::ConnectionHandler;
pub use request::{Attributes, ClientRequest, ClientRequestBuilder};
pub use response::{ClientResponse, Entity, MaterializedResponse};

// Re-export commonly used types from dependencies
pub use http::{HeaderMap, Method, StatusCode};
pub use url::Url;
