//! Writes and the cache invalidations that follow them.
//!
//! Every write goes through [`MutationCoordinator`]. The coordinator awaits
//! the write, and only once the server has confirmed it does it invalidate
//! the keys [`MutationKind::invalidates`] lists. A failed write returns its
//! error untouched and leaves the cache exactly as it was. Writes are never
//! retried.

use std::fmt;
use std::future::Future;

use newsagg_client::{ApiClient, SessionStore};
use newsagg_core::{
    ApiResponse, AuthResponse, CrawlResult, EntityId, LoginRequest, PreferenceRequest,
    RegisterRequest, Source, SourceRequest, TransportResult, UserProfile,
};
use newsagg_query::{KeyPattern, QueryCache, ResourceKind};
use tracing::{info, warn};

use crate::keys::ARTICLE_LISTS;

// ============================================================================
// INVALIDATION TABLE
// ============================================================================

const SOURCE_WRITE: &[KeyPattern] = &[
    KeyPattern::of_kind(ResourceKind::Sources),
    KeyPattern::of_kind(ResourceKind::Categories),
];

const CRAWL_ONE: &[KeyPattern] = &[
    KeyPattern::of_kind(ResourceKind::CrawlerStats),
    KeyPattern::of_kind(ResourceKind::Sources),
    ARTICLE_LISTS,
];

const CRAWL_ALL: &[KeyPattern] = &[
    KeyPattern::of_kind(ResourceKind::CrawlerStats),
    KeyPattern::of_kind(ResourceKind::Sources),
];

const BOOKMARK_WRITE: &[KeyPattern] = &[KeyPattern::of_kind(ResourceKind::Bookmarks)];

const CACHE_EVICTION: &[KeyPattern] = &[KeyPattern::of_kind(ResourceKind::CacheStats)];

const USER_SCOPED: &[KeyPattern] = &[
    KeyPattern::of_kind(ResourceKind::Bookmarks),
    KeyPattern::of_kind(ResourceKind::Profile),
];

const PROFILE_WRITE: &[KeyPattern] = &[KeyPattern::of_kind(ResourceKind::Profile)];

const NOTHING: &[KeyPattern] = &[];

/// Every write the client can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateSource,
    UpdateSource,
    ToggleSource,
    DeleteSource,
    CrawlOne,
    CrawlAll,
    AddBookmark,
    RemoveBookmark,
    EvictArticleCache,
    EvictSourceCache,
    EvictAllCache,
    TriggerDigestAll,
    TriggerDigestOne,
    Login,
    Register,
    Logout,
    UpdatePreferences,
}

impl MutationKind {
    /// Cache entries made stale by a successful write of this kind.
    ///
    /// For [`MutationKind::Logout`] the entries are removed rather than
    /// refetched, since there is no longer a credential to fetch them with.
    pub const fn invalidates(self) -> &'static [KeyPattern] {
        match self {
            MutationKind::CreateSource
            | MutationKind::UpdateSource
            | MutationKind::ToggleSource
            | MutationKind::DeleteSource => SOURCE_WRITE,
            MutationKind::CrawlOne => CRAWL_ONE,
            MutationKind::CrawlAll => CRAWL_ALL,
            MutationKind::AddBookmark | MutationKind::RemoveBookmark => BOOKMARK_WRITE,
            MutationKind::EvictArticleCache
            | MutationKind::EvictSourceCache
            | MutationKind::EvictAllCache => CACHE_EVICTION,
            // Digest stats are polled on their own schedule.
            MutationKind::TriggerDigestAll | MutationKind::TriggerDigestOne => NOTHING,
            MutationKind::Login | MutationKind::Register => NOTHING,
            MutationKind::Logout => USER_SCOPED,
            MutationKind::UpdatePreferences => PROFILE_WRITE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::CreateSource => "create_source",
            MutationKind::UpdateSource => "update_source",
            MutationKind::ToggleSource => "toggle_source",
            MutationKind::DeleteSource => "delete_source",
            MutationKind::CrawlOne => "crawl_one",
            MutationKind::CrawlAll => "crawl_all",
            MutationKind::AddBookmark => "add_bookmark",
            MutationKind::RemoveBookmark => "remove_bookmark",
            MutationKind::EvictArticleCache => "evict_article_cache",
            MutationKind::EvictSourceCache => "evict_source_cache",
            MutationKind::EvictAllCache => "evict_all_cache",
            MutationKind::TriggerDigestAll => "trigger_digest_all",
            MutationKind::TriggerDigestOne => "trigger_digest_one",
            MutationKind::Login => "login",
            MutationKind::Register => "register",
            MutationKind::Logout => "logout",
            MutationKind::UpdatePreferences => "update_preferences",
        }
    }

    pub fn all() -> &'static [MutationKind] {
        &[
            MutationKind::CreateSource,
            MutationKind::UpdateSource,
            MutationKind::ToggleSource,
            MutationKind::DeleteSource,
            MutationKind::CrawlOne,
            MutationKind::CrawlAll,
            MutationKind::AddBookmark,
            MutationKind::RemoveBookmark,
            MutationKind::EvictArticleCache,
            MutationKind::EvictSourceCache,
            MutationKind::EvictAllCache,
            MutationKind::TriggerDigestAll,
            MutationKind::TriggerDigestOne,
            MutationKind::Login,
            MutationKind::Register,
            MutationKind::Logout,
            MutationKind::UpdatePreferences,
        ]
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

/// Runs writes through the resource clients and keeps the cache coherent.
#[derive(Clone)]
pub struct MutationCoordinator {
    client: ApiClient,
    cache: QueryCache,
    session: SessionStore,
}

impl MutationCoordinator {
    pub fn new(client: ApiClient, cache: QueryCache, session: SessionStore) -> Self {
        Self {
            client,
            cache,
            session,
        }
    }

    /// Await `write`; on success invalidate what `kind` depends on.
    pub async fn mutate<T, Fut>(&self, kind: MutationKind, write: Fut) -> TransportResult<T>
    where
        Fut: Future<Output = TransportResult<T>>,
    {
        match write.await {
            Ok(value) => {
                let touched = self.cache.invalidate_all(kind.invalidates());
                info!(mutation = %kind, invalidated = touched, "mutation succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(mutation = %kind, error = %err, "mutation failed");
                Err(err)
            }
        }
    }

    pub async fn create_source(&self, request: &SourceRequest) -> TransportResult<ApiResponse<Source>> {
        self.mutate(MutationKind::CreateSource, self.client.sources().create(request))
            .await
    }

    pub async fn update_source(
        &self,
        id: EntityId,
        request: &SourceRequest,
    ) -> TransportResult<ApiResponse<Source>> {
        self.mutate(MutationKind::UpdateSource, self.client.sources().update(id, request))
            .await
    }

    pub async fn toggle_source(&self, id: EntityId) -> TransportResult<ApiResponse<Source>> {
        self.mutate(MutationKind::ToggleSource, self.client.sources().toggle(id))
            .await
    }

    pub async fn delete_source(&self, id: EntityId) -> TransportResult<ApiResponse<()>> {
        self.mutate(MutationKind::DeleteSource, self.client.sources().delete(id))
            .await
    }

    pub async fn crawl_one(&self, source_id: EntityId) -> TransportResult<ApiResponse<CrawlResult>> {
        self.mutate(MutationKind::CrawlOne, self.client.crawler().crawl_one(source_id))
            .await
    }

    pub async fn crawl_all(&self) -> TransportResult<ApiResponse<String>> {
        self.mutate(MutationKind::CrawlAll, self.client.crawler().crawl_all())
            .await
    }

    pub async fn add_bookmark(&self, article_id: EntityId) -> TransportResult<ApiResponse<()>> {
        self.mutate(MutationKind::AddBookmark, self.client.bookmarks().add(article_id))
            .await
    }

    pub async fn remove_bookmark(&self, article_id: EntityId) -> TransportResult<ApiResponse<()>> {
        self.mutate(
            MutationKind::RemoveBookmark,
            self.client.bookmarks().remove(article_id),
        )
        .await
    }

    pub async fn evict_article_cache(&self) -> TransportResult<ApiResponse<()>> {
        self.mutate(MutationKind::EvictArticleCache, self.client.cache().evict_articles())
            .await
    }

    pub async fn evict_source_cache(&self) -> TransportResult<ApiResponse<()>> {
        self.mutate(MutationKind::EvictSourceCache, self.client.cache().evict_sources())
            .await
    }

    pub async fn evict_all_cache(&self) -> TransportResult<ApiResponse<()>> {
        self.mutate(MutationKind::EvictAllCache, self.client.cache().evict_all())
            .await
    }

    pub async fn trigger_digest_all(&self) -> TransportResult<ApiResponse<String>> {
        self.mutate(MutationKind::TriggerDigestAll, self.client.digest().trigger_all())
            .await
    }

    pub async fn trigger_digest_one(&self, user_id: EntityId) -> TransportResult<ApiResponse<String>> {
        self.mutate(
            MutationKind::TriggerDigestOne,
            self.client.digest().trigger_one(user_id),
        )
        .await
    }

    /// Log in and establish the session from the response.
    pub async fn login(&self, request: &LoginRequest) -> TransportResult<ApiResponse<AuthResponse>> {
        let response = self
            .mutate(MutationKind::Login, self.client.auth().login(request))
            .await?;
        self.session.set_from_auth(&response.data);
        Ok(response)
    }

    /// Register and establish the session from the response.
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> TransportResult<ApiResponse<AuthResponse>> {
        let response = self
            .mutate(MutationKind::Register, self.client.auth().register(request))
            .await?;
        self.session.set_from_auth(&response.data);
        Ok(response)
    }

    /// Drop the session and every cached entry scoped to the user.
    ///
    /// Purely local; the server keeps no session state to tear down.
    pub fn logout(&self) -> usize {
        self.session.clear();
        let removed: usize = MutationKind::Logout
            .invalidates()
            .iter()
            .map(|pattern| self.cache.remove(pattern))
            .sum();
        info!(mutation = %MutationKind::Logout, removed, "logged out");
        removed
    }

    /// Save preferences; the stored principal picks up the new values.
    pub async fn update_preferences(
        &self,
        request: &PreferenceRequest,
    ) -> TransportResult<ApiResponse<UserProfile>> {
        let response = self
            .mutate(
                MutationKind::UpdatePreferences,
                self.client.users().update_preferences(request),
            )
            .await?;
        if let Some(credential) = self.session.credential() {
            self.session.set(credential, response.data.clone());
        }
        Ok(response)
    }
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("cached_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}
