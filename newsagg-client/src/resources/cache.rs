use newsagg_core::{ApiResponse, CacheStats, TransportResult};

use super::call;
use crate::transport::{ApiRequest, Transport};

/// Server-side cache administration.
pub struct CacheApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> CacheApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn stats(&self) -> TransportResult<ApiResponse<CacheStats>> {
        call(self.transport, ApiRequest::get("/cache/stats")).await
    }

    pub async fn evict_articles(&self) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::delete("/cache/articles")).await
    }

    pub async fn evict_sources(&self) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::delete("/cache/sources")).await
    }

    pub async fn evict_all(&self) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::delete("/cache")).await
    }
}
