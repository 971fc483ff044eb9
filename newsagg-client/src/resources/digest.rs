use newsagg_core::{ApiResponse, DigestStats, EntityId, TransportResult};

use super::call;
use crate::transport::{ApiRequest, Transport};

pub struct DigestApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> DigestApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn trigger_all(&self) -> TransportResult<ApiResponse<String>> {
        call(self.transport, ApiRequest::post("/digest/trigger-all")).await
    }

    pub async fn trigger_one(&self, user_id: EntityId) -> TransportResult<ApiResponse<String>> {
        call(self.transport, ApiRequest::post(format!("/digest/trigger/{}", user_id))).await
    }

    pub async fn stats(&self) -> TransportResult<ApiResponse<DigestStats>> {
        call(self.transport, ApiRequest::get("/digest/stats")).await
    }
}
