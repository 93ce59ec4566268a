//! Deferred REST client
//!
//! An [`AsyncConnectionHandler`] submits requests to an asynchronous HTTP
//! engine and returns immediately. The response is materialized later, when
//! the caller resolves the returned handle:
//!
//! - blocking: [`PendingResponse::get`] / [`PendingResponse::get_timeout`]
//! - awaited: [`PendingResponse::resolve`]
//! - polled: [`PendingResponse::is_done`], then `get`
//!
//! Materialization happens once per request; every resolver observes the
//! same [`MaterializedResponse`](rest_client_sdk::MaterializedResponse).
//!
//! # Examples
//!
//! ## Blocking
//!
//! ```no_run
//! use std::sync::Arc;
//! use rest_client::{AsyncConnectionHandler, RestClient};
//! use rest_client_sdk::{ClientConfig, ClientResponse};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let handler = Arc::new(AsyncConnectionHandler::new(runtime.handle().clone()));
//! let client = RestClient::new(ClientConfig::default(), handler.clone());
//!
//! let response = client
//!     .resource("http://services.odata.org/V3/OData/OData.svc/Products?$format=json")
//!     .accept(&mime::APPLICATION_JSON)?
//!     .get()?;
//! let feed: serde_json::Value = response.entity()?;
//! println!("{}", feed["value"]);
//!
//! handler.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Polled
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rest_client::{AsyncConnectionHandler, RestClient};
//! use rest_client_sdk::{ClientConfig, ClientResponse};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let handler = Arc::new(AsyncConnectionHandler::new(runtime.handle().clone()));
//! let client = RestClient::new(ClientConfig::default(), handler);
//!
//! let pending = client.resource("http://localhost:8080/items").get()?.into_pending();
//! while !pending.is_done() {
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//! let response = pending.get()?;
//! println!("{}", response.status()?);
//! # Ok(())
//! # }
//! ```

mod client;
mod entity_writer;
mod future_response;
mod gzip;
mod handler;
mod pending;
mod reqwest_transport;
mod transport;

pub use client::{Resource, RestClient};
pub use entity_writer::EntityWriter;
pub use future_response::FutureClientResponse;
pub use gzip::{GzipInputAdapter, GzipOutputAdapter};
pub use handler::AsyncConnectionHandler;
pub use pending::PendingResponse;
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportFactory};
pub use transport::{BodyStream, BoxStream, HttpTransport, NativeRequest, NativeResponse, ResponseFuture, TransportFactory};
