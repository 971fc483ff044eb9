use newsagg_core::{ApiResponse, ArticleDetail, ArticleSummary, EntityId, Page, TransportResult};

use super::call;
use crate::transport::{ApiRequest, Transport};

/// Filters for the article listing. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub source_id: Option<EntityId>,
}

impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn source_id(mut self, source_id: EntityId) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Query-string pairs. Empty `category`/`search` are treated as unset.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size".to_string(), size.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("category".to_string(), category.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        if let Some(source_id) = self.source_id {
            pairs.push(("sourceId".to_string(), source_id.to_string()));
        }
        pairs
    }
}

pub struct ArticlesApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> ArticlesApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn list(&self, query: &ArticleQuery) -> TransportResult<ApiResponse<Page<ArticleSummary>>> {
        call(
            self.transport,
            ApiRequest::get("/articles").with_query(query.to_pairs()),
        )
        .await
    }

    pub async fn get(&self, id: EntityId) -> TransportResult<ApiResponse<ArticleDetail>> {
        call(self.transport, ApiRequest::get(format!("/articles/{}", id))).await
    }
}
