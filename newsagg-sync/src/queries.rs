//! Typed reads over the query cache.
//!
//! One accessor per read resource. Each accessor owns the resource's key,
//! its freshness window and the loader that reaches the resource client, so
//! callers only ever ask for data by meaning.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use newsagg_client::{ApiClient, ArticleQuery, SessionStore};
use newsagg_core::{
    ApiResponse, ArticleDetail, ArticleSummary, CacheStats, CrawlLog, CrawlStats, DigestStats,
    EntityId, Page, Source, TransportError, TransportResult, UserProfile,
};
use newsagg_query::{FetchOptions, KeyPattern, QueryCache, ResourceKind, Subscription};

use crate::keys;

/// Freshness of content that changes on crawl or admin edits.
pub const CONTENT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Freshness of crawler statistics and logs.
pub const MONITOR_STALE_TIME: Duration = Duration::from_secs(30);

/// Polling interval for crawler, cache and digest statistics.
pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(30);

const MONITORING: &[KeyPattern] = &[
    KeyPattern::of_kind(ResourceKind::CrawlerStats),
    KeyPattern::of_kind(ResourceKind::CacheStats),
    KeyPattern::of_kind(ResourceKind::DigestStats),
];

/// Read accessors sharing one cache, client and session.
#[derive(Clone)]
pub struct Queries {
    cache: QueryCache,
    client: ApiClient,
    session: SessionStore,
}

impl Queries {
    pub fn new(cache: QueryCache, client: ApiClient, session: SessionStore) -> Self {
        Self {
            cache,
            client,
            session,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn content() -> FetchOptions {
        FetchOptions::new().stale_time(CONTENT_STALE_TIME)
    }

    fn user_scoped(&self) -> FetchOptions {
        Self::content().enabled(self.session.is_authenticated())
    }

    fn polled() -> FetchOptions {
        FetchOptions::new().refetch_interval(MONITOR_POLL_INTERVAL)
    }

    pub fn articles(&self, query: ArticleQuery) -> Subscription<Page<ArticleSummary>> {
        let client = self.client.clone();
        self.cache
            .fetch(keys::article_list(&query), Self::content(), move || {
                let client = client.clone();
                let query = query.clone();
                async move { client.articles().list(&query).await.map(ApiResponse::into_data) }
            })
    }

    pub fn article(&self, id: EntityId) -> Subscription<ArticleDetail> {
        let client = self.client.clone();
        self.cache
            .fetch(keys::article_detail(id), Self::content(), move || {
                let client = client.clone();
                async move { client.articles().get(id).await.map(ApiResponse::into_data) }
            })
    }

    pub fn sources(&self) -> Subscription<Vec<Source>> {
        let client = self.client.clone();
        self.cache.fetch(keys::sources(), Self::content(), move || {
            let client = client.clone();
            async move { client.sources().list().await.map(ApiResponse::into_data) }
        })
    }

    pub fn sources_by_category(&self, category: &str) -> Subscription<Vec<Source>> {
        let client = self.client.clone();
        let category = category.to_string();
        self.cache.fetch(
            keys::sources_by_category(&category),
            Self::content(),
            move || {
                let client = client.clone();
                let category = category.clone();
                async move {
                    client
                        .sources()
                        .list_by_category(&category)
                        .await
                        .map(ApiResponse::into_data)
                }
            },
        )
    }

    pub fn source(&self, id: EntityId) -> Subscription<Source> {
        let client = self.client.clone();
        self.cache
            .fetch(keys::source_detail(id), Self::content(), move || {
                let client = client.clone();
                async move { client.sources().get(id).await.map(ApiResponse::into_data) }
            })
    }

    pub fn categories(&self) -> Subscription<Vec<String>> {
        let client = self.client.clone();
        self.cache.fetch(keys::categories(), Self::content(), move || {
            let client = client.clone();
            async move { client.sources().categories().await.map(ApiResponse::into_data) }
        })
    }

    /// The user's bookmarks. Never fetched while logged out.
    pub fn bookmarks(&self) -> Subscription<Vec<ArticleSummary>> {
        let client = self.client.clone();
        self.cache.fetch(keys::bookmarks(), self.user_scoped(), move || {
            let client = client.clone();
            async move { client.bookmarks().list().await.map(ApiResponse::into_data) }
        })
    }

    /// Ids of bookmarked articles; empty while logged out.
    pub async fn bookmark_ids(&self) -> TransportResult<HashSet<EntityId>> {
        if !self.session.is_authenticated() {
            return Ok(HashSet::new());
        }
        let mut subscription = self.bookmarks();
        let bookmarks = settle(&mut subscription).await?;
        Ok(bookmarks.iter().map(|article| article.id).collect())
    }

    /// Crawler statistics, polled while subscribed.
    pub fn crawler_stats(&self) -> Subscription<CrawlStats> {
        let client = self.client.clone();
        let options = Self::polled().stale_time(MONITOR_STALE_TIME);
        self.cache.fetch(keys::crawler_stats(), options, move || {
            let client = client.clone();
            async move { client.crawler().stats().await.map(ApiResponse::into_data) }
        })
    }

    pub fn crawl_logs(&self, source_id: EntityId) -> Subscription<Vec<CrawlLog>> {
        let client = self.client.clone();
        let options = FetchOptions::new().stale_time(MONITOR_STALE_TIME);
        self.cache.fetch(keys::crawl_logs(source_id), options, move || {
            let client = client.clone();
            async move { client.crawler().logs(source_id).await.map(ApiResponse::into_data) }
        })
    }

    /// Server cache statistics, polled while subscribed.
    pub fn cache_stats(&self) -> Subscription<CacheStats> {
        let client = self.client.clone();
        self.cache.fetch(keys::cache_stats(), Self::polled(), move || {
            let client = client.clone();
            async move { client.cache().stats().await.map(ApiResponse::into_data) }
        })
    }

    /// Digest statistics, polled while subscribed.
    pub fn digest_stats(&self) -> Subscription<DigestStats> {
        let client = self.client.clone();
        self.cache.fetch(keys::digest_stats(), Self::polled(), move || {
            let client = client.clone();
            async move { client.digest().stats().await.map(ApiResponse::into_data) }
        })
    }

    /// The logged-in user's profile. Never fetched while logged out.
    pub fn profile(&self) -> Subscription<UserProfile> {
        let client = self.client.clone();
        self.cache.fetch(keys::profile(), self.user_scoped(), move || {
            let client = client.clone();
            async move { client.users().me().await.map(ApiResponse::into_data) }
        })
    }

    /// Force every monitoring statistic to reload.
    pub fn refresh_monitoring(&self) -> usize {
        self.cache.invalidate_all(MONITORING)
    }
}

/// Wait for `subscription` to settle and return its outcome.
pub async fn settle<T: Send + Sync + 'static>(
    subscription: &mut Subscription<T>,
) -> TransportResult<Arc<T>> {
    let state = subscription.settled().await;
    state.result().unwrap_or_else(|| {
        Err(TransportError::Network(format!(
            "{} was not fetched",
            subscription.key()
        )))
    })
}
