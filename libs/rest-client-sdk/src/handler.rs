use crate::context::HandlerContext;
use crate::error::ClientError;
use crate::request::ClientRequest;

/// Terminal handler of a request chain: turns a request into a response.
///
/// Asynchronous handlers return as soon as the request is submitted; their
/// `Response` type resolves later.
pub trait ConnectionHandler: Send + Sync {
    type Response;

    /// Submit `request`.
    ///
    /// # Errors
    /// Returns a [`ClientError`] when the request cannot be prepared or
    /// submitted. Transport failures of deferred handlers surface later,
    /// from the response.
    fn handle(&self, request: ClientRequest, context: &HandlerContext) -> Result<Self::Response, ClientError>;
}
