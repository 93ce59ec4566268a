#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;
use rest_client::{BodyStream, HttpTransport, NativeRequest, NativeResponse, ResponseFuture, TransportFactory};
use rest_client_sdk::{
    BodyReader, ClientConfig, ClientError, ClientRequest, InputStreamAdapter, ResponseHead, TransportError,
};
use tokio::runtime::{Handle, Runtime};

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

pub fn request(method: Method, uri: &str) -> ClientRequest {
    ClientRequest::builder()
        .method(method)
        .uri(uri)
        .attribute(ClientConfig::default())
        .build()
        .unwrap()
}

/// What a [`FakeTransport`] saw for one submitted request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
    pub chunked: bool,
    pub repeatable: bool,
    pub body: Option<Vec<u8>>,
}

enum Outcome {
    Respond,
    Fail(&'static str),
    Reject,
}

/// In-process transport answering every request with a canned response
/// after a delay.
pub struct FakeTransport {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    delay: Duration,
    outcome: Outcome,
    recorded: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Some(Bytes::from_static(body.as_bytes())),
            delay: Duration::ZERO,
            outcome: Outcome::Respond,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            ..Self::ok("")
        }
    }

    pub fn failing(reason: &'static str) -> Self {
        Self {
            outcome: Outcome::Fail(reason),
            ..Self::ok("")
        }
    }

    pub fn rejecting() -> Self {
        Self {
            outcome: Outcome::Reject,
            ..Self::ok("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .append(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().clone()
    }
}

impl HttpTransport for FakeTransport {
    fn submit(&self, request: NativeRequest) -> Result<ResponseFuture, TransportError> {
        if matches!(self.outcome, Outcome::Reject) {
            return Err(TransportError::InvalidRequest("rejected by fake transport".into()));
        }

        let body = request.body.as_ref().map(|writer| {
            let sink = Capture::default();
            writer.write_to(Box::new(sink.clone())).unwrap();
            sink.take()
        });
        self.recorded.lock().push(Recorded {
            method: request.method.clone(),
            url: request.url.to_string(),
            headers: request.headers.clone(),
            content_length: request.body.as_ref().and_then(rest_client::EntityWriter::content_length),
            chunked: request.body.as_ref().is_some_and(rest_client::EntityWriter::is_chunked),
            repeatable: request.body.as_ref().is_some_and(rest_client::EntityWriter::is_repeatable),
            body,
        });

        let delay = self.delay;
        let status = self.status;
        let headers = self.headers.clone();
        let content = self.body.clone();
        let failure = match self.outcome {
            Outcome::Fail(reason) => Some(reason),
            _ => None,
        };

        Ok(Box::pin(async move {
            tokio::time::sleep(delay).await;
            if let Some(reason) = failure {
                return Err(TransportError::Connection(reason.into()));
            }
            let body = content.map(|bytes| -> BodyStream {
                Box::pin(stream::iter(vec![Ok::<_, io::Error>(bytes)]))
            });
            Ok(NativeResponse {
                status,
                reason: None,
                headers,
                body,
            })
        }))
    }
}

/// Factory handing out one shared fake transport and counting calls.
pub struct CountingFactory {
    pub transport: Arc<FakeTransport>,
    pub created: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(transport: FakeTransport) -> Self {
        Self {
            transport: Arc::new(transport),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl TransportFactory for CountingFactory {
    fn create(&self, _config: &ClientConfig, _runtime: &Handle) -> Result<Arc<dyn HttpTransport>, ClientError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }
}

/// Input adapter that only counts how often it was applied.
#[derive(Clone, Default)]
pub struct CountingAdapter {
    pub applied: Arc<AtomicUsize>,
}

impl InputStreamAdapter for CountingAdapter {
    fn adapt(&self, input: BodyReader, _head: &ResponseHead) -> io::Result<BodyReader> {
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
