use std::io;
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::redirect::Policy;
use rest_client_sdk::{ClientConfig, ClientError, TransportError};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::transport::{BodyStream, HttpTransport, NativeRequest, NativeResponse, ResponseFuture, TransportFactory};

/// Redirect hops followed when redirects are enabled.
const MAX_REDIRECTS: usize = 10;

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    runtime: Handle,
}

impl ReqwestTransport {
    /// Build a transport honouring `config`.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] for an invalid proxy or when the
    /// client cannot be built.
    pub fn from_config(config: &ClientConfig, runtime: &Handle) -> Result<Self, ClientError> {
        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };
        let mut builder = reqwest::Client::builder().redirect(redirect);

        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout() {
            builder = builder.read_timeout(timeout);
        }
        if config.max_pooled_connections > 0 {
            builder = builder.pool_max_idle_per_host(config.max_pooled_connections);
        }
        if let Some(proxy) = config.proxy_url() {
            let proxy = reqwest::Proxy::all(&proxy)
                .map_err(|e| ClientError::Config(format!("Invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        if config.insecure_skip_hostname_verification {
            warn!(
                "TLS hostname verification is DISABLED for this client; \
                 connections are open to man-in-the-middle attacks"
            );
            builder = builder.danger_accept_invalid_hostnames(true);
        }

        // The connector binds to the runtime it is built in.
        let client = {
            let _guard = runtime.enter();
            builder.build()
        }
        .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        debug!(
            follow_redirects = config.follow_redirects,
            max_pooled_connections = config.max_pooled_connections,
            "Created reqwest transport"
        );

        Ok(Self {
            client,
            runtime: runtime.clone(),
        })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl HttpTransport for ReqwestTransport {
    fn submit(&self, request: NativeRequest) -> Result<ResponseFuture, TransportError> {
        let NativeRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(writer) = body {
            builder = match writer.buffered() {
                // Sets Content-Length.
                Some(content) => builder.body(content.clone()),
                None => builder.body(reqwest::Body::wrap_stream(writer.into_stream(&self.runtime))),
            };
        }
        let native = builder.build().map_err(map_reqwest_error)?;

        let client = self.client.clone();
        Ok(Box::pin(async move {
            let response = client.execute(native).await.map_err(map_reqwest_error)?;
            Ok(into_native_response(response))
        }))
    }
}

/// Opens a [`ReqwestTransport`] from the first request's configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestTransportFactory;

impl TransportFactory for ReqwestTransportFactory {
    fn create(&self, config: &ClientConfig, runtime: &Handle) -> Result<Arc<dyn HttpTransport>, ClientError> {
        Ok(Arc::new(ReqwestTransport::from_config(config, runtime)?))
    }
}

fn into_native_response(response: reqwest::Response) -> NativeResponse {
    let status = response.status();
    // hyper keeps the wire phrase only when it differs from the canonical one.
    let reason = response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
    let headers = response.headers().clone();
    let body = if response.content_length() == Some(0) {
        None
    } else {
        let stream: BodyStream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        Some(stream)
    };

    NativeResponse {
        status,
        reason,
        headers,
        body,
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Protocol(e.to_string())
    }
}
