//! News aggregator test utilities
//!
//! Shared test infrastructure for the workspace:
//! - A scripted in-memory [`Transport`] that records every request
//! - Proptest generators for wire types
//! - Fixtures for common entities
//! - Assertions over `TransportError` results

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use newsagg_client::{ApiRequest, HttpMethod, SessionStore, Transport, UnauthorizedHook};
use serde_json::Value;

pub use newsagg_core::{
    ApiResponse, ArticleSummary, AuthResponse, CrawlResult, CrawlStats, DigestStats, EntityId,
    Page, Role, Source, TransportError, TransportResult, UserProfile,
};

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// Canned answer for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Wrapped in a successful `{success, message, data}` envelope.
    Data(Value),
    Error(TransportError),
}

impl Reply {
    pub fn data(data: Value) -> Self {
        Reply::Data(data)
    }

    /// Serialize `value` as the envelope's `data`.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => Reply::Data(data),
            Err(err) => Reply::Error(TransportError::Decode(err.to_string())),
        }
    }

    pub fn error(error: TransportError) -> Self {
        Reply::Error(error)
    }
}

/// A request as the transport saw it, with the credential read at dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub credential: Option<String>,
}

#[derive(Default)]
struct Script {
    routes: HashMap<(HttpMethod, String), VecDeque<Reply>>,
    log: Vec<RecordedRequest>,
}

/// In-memory transport answering from per-route reply queues.
///
/// Replies for a route are consumed in order; the last one repeats. An
/// unscripted route answers `404`. With an [`UnauthorizedHook`] attached, an
/// `Unauthorized` reply fires the hook just like the HTTP transport does.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    latency: Option<Duration>,
    session: Option<SessionStore>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, leaving room for concurrent callers to pile up.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Record the session's credential with each request.
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.session = Some(hook.session().clone());
        self.on_unauthorized = Some(hook);
        self
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `reply` for `method path`.
    pub fn reply(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        self.script()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Drop queued replies for `method path` and queue `reply` instead.
    pub fn replace(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        let mut script = self.script();
        let queue = script.routes.entry((method, path.to_string())).or_default();
        queue.clear();
        queue.push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().log.clone()
    }

    /// Number of requests sent to `method path`.
    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.script()
            .log
            .iter()
            .filter(|r| r.request.method == method && r.request.path == path)
            .count()
    }

    pub fn total(&self) -> usize {
        self.script().log.len()
    }

    pub fn clear_log(&self) {
        self.script().log.clear();
    }

    fn next_reply(&self, request: &ApiRequest) -> Reply {
        let mut script = self.script();
        let credential = self
            .session
            .as_ref()
            .and_then(|s| s.credential())
            .map(|c| c.expose().to_string());
        script.log.push(RecordedRequest {
            request: request.clone(),
            credential,
        });

        let key = (request.method, request.path.clone());
        let reply = match script.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        reply.unwrap_or_else(|| {
            Reply::Error(TransportError::api(
                format!("No scripted response for {}", request),
                404,
            ))
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> TransportResult<Value> {
        let reply = self.next_reply(&request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match reply {
            Reply::Data(data) => Ok(serde_json::json!({
                "success": true,
                "message": "OK",
                "data": data,
            })),
            Reply::Error(error) => {
                if error.is_unauthorized() {
                    if let Some(hook) = &self.on_unauthorized {
                        hook.fire();
                    }
                }
                Err(error)
            }
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for wire types.

    use super::*;
    use newsagg_client::ArticleQuery;
    use newsagg_core::DigestFrequency;
    use proptest::prelude::*;

    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        1i64..10_000
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::User)]
    }

    pub fn arb_category() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["nasional", "teknologi", "ekonomi", "olahraga", ""])
            .prop_map(str::to_string)
    }

    /// Article filters, including empty strings the client must drop.
    pub fn arb_article_query() -> impl Strategy<Value = ArticleQuery> {
        (
            prop::option::of(0u32..20),
            prop::option::of(prop::sample::select(vec![6u32, 12, 24])),
            prop::option::of(arb_category()),
            prop::option::of("[a-z ]{0,8}"),
            prop::option::of(arb_entity_id()),
        )
            .prop_map(|(page, size, category, search, source_id)| ArticleQuery {
                page,
                size,
                category,
                search,
                source_id,
            })
    }

    pub fn arb_user_profile() -> impl Strategy<Value = UserProfile> {
        (
            arb_entity_id(),
            "[a-z]{3,8}",
            arb_role(),
            any::<bool>(),
            prop::collection::vec(arb_category(), 0..3),
        )
            .prop_map(|(id, name, role, digest_enabled, categories)| UserProfile {
                id,
                email: format!("{}@example.com", name),
                full_name: name,
                digest_enabled,
                digest_frequency: DigestFrequency::Daily,
                categories,
                role,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities for common scenarios.

    use super::*;
    use newsagg_core::{CrawlOutcome, DigestFrequency};

    pub fn article_summary(id: EntityId) -> ArticleSummary {
        ArticleSummary {
            id,
            title: format!("Berita {}", id),
            url: format!("https://news.example.com/{}", id),
            description: Some("Ringkasan berita".to_string()),
            thumbnail_url: None,
            author: None,
            category: "nasional".to_string(),
            source_name: "Antara".to_string(),
            source_id: 3,
            published_at: None,
            view_count: 0,
        }
    }

    /// One page of summaries for `ids`.
    pub fn article_page(ids: &[EntityId], number: u32, last: bool) -> Page<ArticleSummary> {
        let content: Vec<_> = ids.iter().copied().map(article_summary).collect();
        Page {
            total_elements: content.len() as u64,
            total_pages: number + 1,
            number,
            size: 12,
            first: number == 0,
            last,
            empty: content.is_empty(),
            content,
        }
    }

    pub fn source(id: EntityId, active: bool) -> Source {
        Source {
            id,
            name: format!("Sumber {}", id),
            url: format!("https://source{}.example.com/rss", id),
            website_url: None,
            category: "nasional".to_string(),
            is_active: active,
            last_crawled_at: None,
            crawl_status: None,
            created_at: None,
        }
    }

    pub fn user_profile(id: EntityId, role: Role) -> UserProfile {
        UserProfile {
            id,
            email: format!("user{}@example.com", id),
            full_name: format!("Pengguna {}", id),
            digest_enabled: false,
            digest_frequency: DigestFrequency::Daily,
            categories: vec![],
            role,
        }
    }

    pub fn auth_response(token: &str, user_id: EntityId, role: &str) -> AuthResponse {
        AuthResponse {
            token: token.to_string(),
            user_id,
            email: format!("user{}@example.com", user_id),
            full_name: format!("Pengguna {}", user_id),
            digest_enabled: false,
            digest_frequency: DigestFrequency::Daily,
            categories: vec![],
            role: role.to_string(),
        }
    }

    pub fn crawl_result(source_name: &str) -> CrawlResult {
        CrawlResult {
            status: CrawlOutcome::Success,
            source_name: source_name.to_string(),
            articles_found: 10,
            articles_saved: 2,
            duration_ms: 640,
            error_message: None,
        }
    }

    pub fn crawl_stats(saved_today: u64) -> CrawlStats {
        CrawlStats {
            articles_saved_today: saved_today,
            total_active_sources: 5,
        }
    }

    pub fn digest_stats() -> DigestStats {
        DigestStats {
            sent_today: 4,
            failed_today: 0,
            total_users: 12,
        }
    }

    /// Cache stats as the server reports them with Redis enabled.
    pub fn cache_stats() -> Value {
        serde_json::json!({
            "articles": { "keyCount": 3, "keys": ["articles::0", "articles::1", "articles::2"] },
            "article_detail": { "keyCount": 1, "keys": ["article_detail::9"] },
            "sources": { "keyCount": 1, "keys": ["sources::all"] }
        })
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over transport results.

    use super::*;

    #[track_caller]
    pub fn assert_unauthorized<T: std::fmt::Debug>(result: &TransportResult<T>) {
        match result {
            Err(TransportError::Unauthorized { .. }) => {}
            other => panic!("Expected Unauthorized, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_api_error<T: std::fmt::Debug>(result: &TransportResult<T>, status: u16) {
        match result {
            Err(TransportError::Api { status: got, .. }) => {
                assert_eq!(*got, status, "Wrong status in Api error")
            }
            other => panic!("Expected Api error with status {}, got: {:?}", status, other),
        }
    }

    /// The error carries a message fit for direct display.
    #[track_caller]
    pub fn assert_displayable<T: std::fmt::Debug>(result: &TransportResult<T>) {
        match result {
            Err(error) => assert!(!error.message().trim().is_empty(), "Empty message: {:?}", error),
            Ok(value) => panic!("Expected an error, got Ok: {:?}", value),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
