use newsagg_core::{ApiResponse, EntityId, Source, SourceRequest, TransportResult};

use super::{call, encode};
use crate::transport::{ApiRequest, Transport};

/// RSS source management.
pub struct SourcesApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> SourcesApi<'a> {
    pub(super) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> TransportResult<ApiResponse<Vec<Source>>> {
        call(self.transport, ApiRequest::get("/sources")).await
    }

    pub async fn list_by_category(&self, category: &str) -> TransportResult<ApiResponse<Vec<Source>>> {
        let query = vec![("category".to_string(), category.to_string())];
        call(self.transport, ApiRequest::get("/sources").with_query(query)).await
    }

    pub async fn categories(&self) -> TransportResult<ApiResponse<Vec<String>>> {
        call(self.transport, ApiRequest::get("/sources/categories")).await
    }

    pub async fn get(&self, id: EntityId) -> TransportResult<ApiResponse<Source>> {
        call(self.transport, ApiRequest::get(format!("/sources/{}", id))).await
    }

    pub async fn create(&self, request: &SourceRequest) -> TransportResult<ApiResponse<Source>> {
        let body = encode(request)?;
        call(self.transport, ApiRequest::post("/sources").with_body(body)).await
    }

    pub async fn update(
        &self,
        id: EntityId,
        request: &SourceRequest,
    ) -> TransportResult<ApiResponse<Source>> {
        let body = encode(request)?;
        call(self.transport, ApiRequest::put(format!("/sources/{}", id)).with_body(body)).await
    }

    pub async fn toggle(&self, id: EntityId) -> TransportResult<ApiResponse<Source>> {
        call(self.transport, ApiRequest::patch(format!("/sources/{}/toggle", id))).await
    }

    pub async fn delete(&self, id: EntityId) -> TransportResult<ApiResponse<()>> {
        call(self.transport, ApiRequest::delete(format!("/sources/{}", id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::Recording;
    use crate::transport::HttpMethod;
    use serde_json::json;

    fn source_json() -> serde_json::Value {
        json!({
            "id": 3,
            "name": "Antara",
            "url": "https://www.antaranews.com/rss/terkini.xml",
            "websiteUrl": "https://www.antaranews.com",
            "category": "nasional",
            "active": true,
            "lastCrawledAt": "2024-05-01T08:30:00",
            "crawlStatus": "SUCCESS",
            "createdAt": null
        })
    }

    #[tokio::test]
    async fn test_toggle_uses_patch() {
        let transport = Recording::replying(source_json());
        let source = SourcesApi::new(&transport).toggle(3).await.unwrap().into_data();
        assert!(source.is_active);

        let request = transport.last();
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.path, "/sources/3/toggle");
    }

    #[tokio::test]
    async fn test_update_sends_body() {
        let transport = Recording::replying(source_json());
        let request = SourceRequest {
            name: "Antara".to_string(),
            url: "https://www.antaranews.com/rss/terkini.xml".to_string(),
            website_url: None,
            category: "nasional".to_string(),
            is_active: Some(false),
        };
        SourcesApi::new(&transport).update(3, &request).await.unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.path, "/sources/3");
        let body = sent.body.unwrap();
        assert_eq!(body["isActive"], false);
        assert!(body.get("websiteUrl").is_none());
    }

    #[tokio::test]
    async fn test_list_by_category_query() {
        let transport = Recording::replying(json!([]));
        SourcesApi::new(&transport)
            .list_by_category("teknologi")
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.path, "/sources");
        assert_eq!(sent.query, vec![("category".to_string(), "teknologi".to_string())]);
    }
}
