//! Typed resource clients over a [`Transport`].
//!
//! Each accessor maps typed parameters to one request and decodes the
//! `{success, message, data, timestamp}` envelope. No state, no caching.

mod articles;
mod auth;
mod bookmarks;
mod cache;
mod crawler;
mod digest;
mod sources;
mod users;

pub use articles::{ArticleQuery, ArticlesApi};
pub use auth::AuthApi;
pub use bookmarks::BookmarksApi;
pub use cache::CacheApi;
pub use crawler::CrawlerApi;
pub use digest::DigestApi;
pub use sources::SourcesApi;
pub use users::UsersApi;

use std::fmt;
use std::sync::Arc;

use newsagg_core::{ApiResponse, TransportError, TransportResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::transport::{ApiRequest, Transport};

/// Entry point to every resource family.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn articles(&self) -> ArticlesApi<'_> {
        ArticlesApi::new(self.transport.as_ref())
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self.transport.as_ref())
    }

    pub fn bookmarks(&self) -> BookmarksApi<'_> {
        BookmarksApi::new(self.transport.as_ref())
    }

    pub fn sources(&self) -> SourcesApi<'_> {
        SourcesApi::new(self.transport.as_ref())
    }

    pub fn crawler(&self) -> CrawlerApi<'_> {
        CrawlerApi::new(self.transport.as_ref())
    }

    pub fn digest(&self) -> DigestApi<'_> {
        DigestApi::new(self.transport.as_ref())
    }

    pub fn cache(&self) -> CacheApi<'_> {
        CacheApi::new(self.transport.as_ref())
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self.transport.as_ref())
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

async fn call<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: ApiRequest,
) -> TransportResult<ApiResponse<T>> {
    let value = transport.send(request).await?;
    decode_envelope(value)
}

/// Decode a response envelope.
///
/// An empty body or an envelope without `data` decodes with `data: null`,
/// which is what write endpoints returning nothing produce.
pub fn decode_envelope<T: DeserializeOwned>(value: Value) -> TransportResult<ApiResponse<T>> {
    let value = match value {
        Value::Null => serde_json::json!({ "success": true, "message": "", "data": null }),
        Value::Object(mut map) => {
            map.entry("data").or_insert(Value::Null);
            Value::Object(map)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|err| TransportError::Decode(err.to_string()))
}

fn encode<B: Serialize>(body: &B) -> TransportResult<Value> {
    serde_json::to_value(body)
        .map_err(|err| TransportError::Decode(format!("Failed to encode request body: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsagg_core::Source;
    use serde_json::json;

    #[test]
    fn test_decode_envelope_with_missing_data() {
        let response: ApiResponse<()> =
            decode_envelope(json!({"success": true, "message": "Bookmark dihapus"})).unwrap();
        assert!(response.success);
        assert_eq!(response.message, "Bookmark dihapus");
    }

    #[test]
    fn test_decode_envelope_from_empty_body() {
        let response: ApiResponse<()> = decode_envelope(Value::Null).unwrap();
        assert!(response.success);
    }

    #[test]
    fn test_decode_envelope_shape_mismatch() {
        let result: TransportResult<ApiResponse<Vec<Source>>> =
            decode_envelope(json!({"success": true, "data": {"not": "a list"}}));
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }
}
