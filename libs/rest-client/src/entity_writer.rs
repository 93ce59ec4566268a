//! Outgoing request body.
//!
//! An [`EntityWriter`] either buffers the whole entity up front (exact
//! length, safe to retransmit) or keeps the producer and re-runs it for every
//! transmission (unknown length, streamed).

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use futures::{future, stream};
use parking_lot::Mutex;
use rest_client_sdk::{BodyWriter, ClientError, ClientRequest, EntityProducer, HandlerContext};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::transport::BodyStream;

/// Chunks in flight between a streaming producer and the transport.
const STREAM_CHANNEL_DEPTH: usize = 16;

/// Request entity prepared for a transport.
pub struct EntityWriter {
    request: Arc<ClientRequest>,
    producer: Arc<dyn EntityProducer>,
    context: HandlerContext,
    chunked: bool,
    content: Option<Bytes>,
}

impl fmt::Debug for EntityWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityWriter")
            .field("chunked", &self.chunked)
            .field("content_length", &self.content_length())
            .finish_non_exhaustive()
    }
}

impl EntityWriter {
    /// Prepare the entity of `request`, or `None` if it has none.
    ///
    /// Without `chunked` the entity is serialized immediately through the
    /// context's output adapters.
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] when eager serialization fails.
    pub fn for_request(
        request: &Arc<ClientRequest>,
        context: &HandlerContext,
        chunked: bool,
    ) -> Result<Option<Self>, ClientError> {
        let Some(producer) = request.entity().cloned() else {
            return Ok(None);
        };

        let mut writer = Self {
            request: request.clone(),
            producer,
            context: context.clone(),
            chunked,
            content: None,
        };

        if !chunked {
            let buffer = SharedBuffer::default();
            writer
                .produce(Box::new(buffer.clone()))
                .map_err(|e| ClientError::Build(format!("Failed to serialize request entity: {e}")))?;
            writer.content = Some(buffer.into_bytes());
        }

        Ok(Some(writer))
    }

    /// Exact byte length, or `None` when streamed (unknown length).
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content
            .as_ref()
            .and_then(|content| u64::try_from(content.len()).ok())
    }

    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.content.is_none()
    }

    /// Whether the entity can be sent again (for instance on redirect).
    #[must_use]
    pub fn is_repeatable(&self) -> bool {
        self.content.is_some()
    }

    /// Media type advertised by the entity producer.
    #[must_use]
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.producer.content_type()
    }

    /// The serialized entity, if it was buffered.
    #[must_use]
    pub fn buffered(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    /// Write the entity to `sink`, replaying the buffer or running the
    /// producer through a fresh adapter chain.
    ///
    /// # Errors
    /// Returns the producer's, an adapter's or the sink's I/O error.
    pub fn write_to(&self, mut sink: BodyWriter) -> io::Result<()> {
        match &self.content {
            Some(content) => {
                sink.write_all(content)?;
                sink.flush()
            }
            None => self.produce(sink),
        }
    }

    /// Turn the entity into a byte stream for an async engine.
    ///
    /// A streamed entity is produced on a blocking thread of `runtime` and
    /// handed over chunk by chunk.
    #[must_use]
    pub fn into_stream(self, runtime: &Handle) -> BodyStream {
        if let Some(content) = self.content {
            return Box::pin(stream::once(future::ready(Ok(content))));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_DEPTH);
        runtime.spawn_blocking(move || {
            let sink = ChannelWriter { tx: tx.clone() };
            if let Err(e) = self.produce(Box::new(sink)) {
                debug!(error = %e, "Streaming request entity failed");
                if tx.blocking_send(Err(e)).is_err() {
                    debug!("Request body receiver already dropped");
                }
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }

    fn produce(&self, sink: BodyWriter) -> io::Result<()> {
        let mut out = self.context.adapt_output(sink, &self.request)?;
        self.producer.write_to(&mut out)?;
        out.flush()
    }
}

/// In-memory sink that stays readable after the adapter chain is dropped.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn into_bytes(self) -> Bytes {
        Bytes::from(std::mem::take(&mut *self.0.lock()))
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Blocking writer feeding a body channel.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "request body receiver dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
