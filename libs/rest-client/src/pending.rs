//! Deferred response handle.
//!
//! A [`PendingResponse`] owns the task executing one request. The response is
//! materialized the first time a caller resolves the handle and cached for
//! every later (or concurrent) resolver.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rest_client_sdk::{
    BodyReader, ClientError, ClientRequest, HandlerContext, MaterializedResponse, ResponseHead, TransportError,
};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, timeout_at};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, warn};

use crate::handler::AsyncConnectionHandler;
use crate::transport::NativeResponse;

type TransportTask = JoinHandle<Result<NativeResponse, TransportError>>;

/// Handle to a submitted request whose response is not yet materialized.
///
/// Cloning is cheap; clones share the same task and the same cached
/// response.
#[derive(Clone)]
pub struct PendingResponse {
    shared: Arc<Shared>,
}

struct Shared {
    runtime: Handle,
    request: Arc<ClientRequest>,
    context: HandlerContext,
    abort: AbortHandle,
    cancelled: AtomicBool,
    slot: Mutex<Slot>,
}

enum Slot {
    Pending(TransportTask),
    Settled(Settled),
}

#[derive(Clone)]
enum Settled {
    Resolved(Arc<MaterializedResponse>),
    Failed(Arc<TransportError>),
    Cancelled,
}

impl Settled {
    fn to_result(&self) -> Result<Arc<MaterializedResponse>, ClientError> {
        match self {
            Settled::Resolved(response) => Ok(response.clone()),
            Settled::Failed(cause) => Err(ClientError::Execution(cause.clone())),
            Settled::Cancelled => Err(ClientError::Cancelled),
        }
    }
}

impl fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResponse")
            .field("method", self.shared.request.method())
            .field("uri", &self.shared.request.uri().as_str())
            .field("done", &self.is_done())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PendingResponse {
    pub(crate) fn new(
        runtime: Handle,
        task: TransportTask,
        request: Arc<ClientRequest>,
        context: HandlerContext,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                runtime,
                request,
                context,
                abort: task.abort_handle(),
                cancelled: AtomicBool::new(false),
                slot: Mutex::new(Slot::Pending(task)),
            }),
        }
    }

    /// The request this handle was submitted for.
    #[must_use]
    pub fn request(&self) -> &ClientRequest {
        &self.shared.request
    }

    /// Whether the request finished, failed or was cancelled. Never blocks.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.shared.abort.is_finished()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Abort the request if it has not finished yet.
    ///
    /// Returns `false` when the request already completed or was already
    /// cancelled. A materialized response is never affected.
    #[must_use = "`false` means the request was not aborted"]
    pub fn cancel(&self) -> bool {
        if self.shared.abort.is_finished() || self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shared.abort.abort();
        debug!(
            method = %self.shared.request.method(),
            uri = %self.shared.request.uri(),
            "Pending response cancelled"
        );
        true
    }

    /// Block until the response is available.
    ///
    /// Call it from a plain thread. On a thread that carries a tokio runtime
    /// context (async tasks, `spawn_blocking` closures) it returns
    /// [`ClientError::BlockingInAsyncContext`]; use [`resolve`](Self::resolve)
    /// there.
    ///
    /// # Errors
    /// [`ClientError::Execution`] when the transport failed,
    /// [`ClientError::Cancelled`] when the request was cancelled,
    /// [`ClientError::BlockingInAsyncContext`] as described above.
    pub fn get(&self) -> Result<Arc<MaterializedResponse>, ClientError> {
        self.block_on_settle(None)
    }

    /// Like [`get`](Self::get), waiting at most `timeout`, including time
    /// spent behind another resolver. On timeout the handle stays unresolved
    /// and can be resolved later.
    ///
    /// # Errors
    /// [`ClientError::Timeout`] in addition to the errors of `get`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Arc<MaterializedResponse>, ClientError> {
        self.block_on_settle(Some(timeout))
    }

    fn block_on_settle(&self, timeout: Option<Duration>) -> Result<Arc<MaterializedResponse>, ClientError> {
        if Handle::try_current().is_ok() {
            warn!(
                uri = %self.shared.request.uri(),
                "Blocking resolution refused inside an async runtime"
            );
            return Err(ClientError::BlockingInAsyncContext);
        }
        self.shared.runtime.block_on(self.shared.settle(timeout))
    }

    /// Await the response.
    ///
    /// The body of the returned response is a blocking reader: read it from a
    /// blocking thread (for instance inside `spawn_blocking`).
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub async fn resolve(&self) -> Result<Arc<MaterializedResponse>, ClientError> {
        self.shared.settle(None).await
    }

    /// Await the response for at most `timeout`.
    ///
    /// # Errors
    /// Same as [`get_timeout`](Self::get_timeout).
    pub async fn resolve_timeout(&self, timeout: Duration) -> Result<Arc<MaterializedResponse>, ClientError> {
        self.shared.settle(Some(timeout)).await
    }
}

impl Shared {
    async fn settle(&self, timeout: Option<Duration>) -> Result<Arc<MaterializedResponse>, ClientError> {
        // One deadline covers waiting for the slot and for the task.
        let deadline = timeout.map(|limit| (Instant::now() + limit, limit));

        let mut slot = match deadline {
            Some((at, limit)) => timeout_at(at, self.slot.lock())
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => self.slot.lock().await,
        };

        let settled = match &mut *slot {
            Slot::Settled(settled) => return settled.to_result(),
            Slot::Pending(_) if self.cancelled.load(Ordering::SeqCst) => Settled::Cancelled,
            Slot::Pending(task) => {
                let joined = match deadline {
                    Some((at, limit)) => timeout_at(at, task).await.map_err(|_| ClientError::Timeout(limit))?,
                    None => task.await,
                };
                match joined {
                    // Not bounded: the task output has been taken. Resolvers
                    // after an interrupted build see it as aborted.
                    Ok(Ok(native)) => {
                        *slot = Slot::Settled(Settled::Failed(Arc::new(TransportError::Aborted(
                            "response materialization interrupted".to_owned(),
                        ))));
                        self.materialize(native).await
                    }
                    Ok(Err(cause)) => Settled::Failed(Arc::new(cause)),
                    Err(e) if e.is_cancelled() => Settled::Cancelled,
                    Err(e) => Settled::Failed(Arc::new(TransportError::Aborted(e.to_string()))),
                }
            }
        };

        let result = settled.to_result();
        *slot = Slot::Settled(settled);
        result
    }

    /// Build the response off the async workers: input adapters may read
    /// from the body while wrapping it.
    async fn materialize(&self, native: NativeResponse) -> Settled {
        let runtime = self.runtime.clone();
        let request = self.request.clone();
        let context = self.context.clone();

        let built = self
            .runtime
            .spawn_blocking(move || build_response(native, &request, &context, runtime))
            .await;

        match built {
            Ok(Ok(response)) => Settled::Resolved(Arc::new(response)),
            Ok(Err(e)) => Settled::Failed(Arc::new(TransportError::Io(e))),
            Err(e) => Settled::Failed(Arc::new(TransportError::Aborted(e.to_string()))),
        }
    }
}

fn build_response(
    native: NativeResponse,
    request: &ClientRequest,
    context: &HandlerContext,
    runtime: Handle,
) -> io::Result<MaterializedResponse> {
    let message = native.message();
    let head = ResponseHead {
        status: native.status,
        headers: native.headers,
    };

    let raw: BodyReader = match native.body {
        Some(stream) => Box::new(SyncIoBridge::new_with_handle(StreamReader::new(stream), runtime)),
        None => Box::new(io::empty()),
    };
    let body = AsyncConnectionHandler::adapt_input(raw, &head, context)?;

    debug!(uri = %request.uri(), status = %head.status, "Response materialized");
    Ok(MaterializedResponse::new(
        head.status,
        message,
        head.headers,
        request.attributes().clone(),
        body,
    ))
}
