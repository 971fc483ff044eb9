use newsagg_core::{ApiResponse, CrawlLog, CrawlResult, CrawlStats, EntityId, TransportResult};

use super::call;
use crate::transport::{ApiRequest, Transport};

pub struct CrawlerApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> CrawlerApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Starts crawling every active source. The server answers before the
    /// crawl finishes; `data` is a status line.
    pub async fn crawl_all(&self) -> TransportResult<ApiResponse<String>> {
        call(self.transport, ApiRequest::post("/crawler/crawl-all")).await
    }

    pub async fn crawl_one(&self, source_id: EntityId) -> TransportResult<ApiResponse<CrawlResult>> {
        call(self.transport, ApiRequest::post(format!("/crawler/crawl/{}", source_id))).await
    }

    pub async fn stats(&self) -> TransportResult<ApiResponse<CrawlStats>> {
        call(self.transport, ApiRequest::get("/crawler/stats")).await
    }

    pub async fn logs(&self, source_id: EntityId) -> TransportResult<ApiResponse<Vec<CrawlLog>>> {
        call(self.transport, ApiRequest::get(format!("/crawler/logs/{}", source_id))).await
    }
}
