use newsagg_core::{ApiResponse, ArticleSummary, EntityId, TransportResult};

use super::call;
use crate::transport::{ApiRequest, Transport};

pub struct BookmarksApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> BookmarksApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> TransportResult<ApiResponse<Vec<ArticleSummary>>> {
        call(self.transport, ApiRequest::get("/bookmarks")).await
    }

    pub async fn add(&self, article_id: EntityId) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::post(format!("/bookmarks/{}", article_id))).await
    }

    pub async fn remove(&self, article_id: EntityId) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::delete(format!("/bookmarks/{}", article_id))).await
    }
}
