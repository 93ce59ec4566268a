use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use rest_client_sdk::{
    Attributes, BodyReader, ClientError, ClientResponse, Entity, FromEntity, MaterializedResponse,
};

use crate::pending::PendingResponse;

/// [`ClientResponse`] over a [`PendingResponse`].
///
/// Every accessor first resolves the pending response (blocking), then
/// delegates to the cached materialized response. A resolution failure is
/// returned from whichever accessor forced it.
#[derive(Debug, Clone)]
pub struct FutureClientResponse {
    pending: PendingResponse,
}

impl FutureClientResponse {
    #[must_use]
    pub fn new(pending: PendingResponse) -> Self {
        Self { pending }
    }

    #[must_use]
    pub fn pending(&self) -> &PendingResponse {
        &self.pending
    }

    #[must_use]
    pub fn into_pending(self) -> PendingResponse {
        self.pending
    }

    fn resolved(&self) -> Result<Arc<MaterializedResponse>, ClientError> {
        self.pending.get()
    }
}

impl From<PendingResponse> for FutureClientResponse {
    fn from(pending: PendingResponse) -> Self {
        Self::new(pending)
    }
}

impl ClientResponse for FutureClientResponse {
    fn status(&self) -> Result<StatusCode, ClientError> {
        self.resolved()?.status()
    }

    fn set_status(&self, status: StatusCode) -> Result<(), ClientError> {
        self.resolved()?.set_status(status)
    }

    fn message(&self) -> Result<String, ClientError> {
        self.resolved()?.message()
    }

    fn set_message(&self, message: &str) -> Result<(), ClientError> {
        self.resolved()?.set_message(message)
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        self.resolved()?.headers()
    }

    fn attributes(&self) -> Result<Attributes, ClientError> {
        self.resolved()?.attributes()
    }

    fn attribute<T: Clone + Send + Sync + 'static>(&self) -> Result<Option<T>, ClientError> {
        self.resolved()?.attribute()
    }

    fn set_attribute<T: Clone + Send + Sync + 'static>(&self, value: T) -> Result<(), ClientError> {
        self.resolved()?.set_attribute(value)
    }

    fn entity<T: FromEntity>(&self) -> Result<T, ClientError> {
        self.resolved()?.entity()
    }

    fn set_entity(&self, entity: Entity) -> Result<(), ClientError> {
        self.resolved()?.set_entity(entity)
    }

    fn take_body(&self) -> Result<BodyReader, ClientError> {
        self.resolved()?.take_body()
    }

    fn consume_content(&self) -> Result<(), ClientError> {
        self.resolved()?.consume_content()
    }
}
