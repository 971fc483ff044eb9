//! Cache keys for every read resource.
//!
//! Queries and mutations build their keys here so an invalidation pattern
//! and the key it targets can never drift apart.

use newsagg_client::ArticleQuery;
use newsagg_core::EntityId;
use newsagg_query::{KeyPart, KeyPattern, QueryKey, ResourceKind};

const LIST: &[KeyPart] = &[KeyPart::Tag("list")];

/// Every article listing, whatever its filters.
pub const ARTICLE_LISTS: KeyPattern = KeyPattern::with_prefix(ResourceKind::Articles, LIST);

pub fn article_list(query: &ArticleQuery) -> QueryKey {
    QueryKey::new(ResourceKind::Articles)
        .tag("list")
        .opt_int(query.page.map(i64::from))
        .opt_int(query.size.map(i64::from))
        .opt_text(query.category.as_deref().filter(|c| !c.is_empty()))
        .opt_text(query.search.as_deref().filter(|s| !s.is_empty()))
        .opt_int(query.source_id)
}

pub fn article_detail(id: EntityId) -> QueryKey {
    QueryKey::new(ResourceKind::Articles).tag("detail").int(id)
}

pub fn sources() -> QueryKey {
    QueryKey::new(ResourceKind::Sources).tag("list")
}

pub fn sources_by_category(category: &str) -> QueryKey {
    QueryKey::new(ResourceKind::Sources)
        .tag("by-category")
        .text(category)
}

pub fn source_detail(id: EntityId) -> QueryKey {
    QueryKey::new(ResourceKind::Sources).tag("detail").int(id)
}

pub fn categories() -> QueryKey {
    QueryKey::new(ResourceKind::Categories)
}

pub fn bookmarks() -> QueryKey {
    QueryKey::new(ResourceKind::Bookmarks)
}

pub fn crawler_stats() -> QueryKey {
    QueryKey::new(ResourceKind::CrawlerStats)
}

pub fn crawl_logs(source_id: EntityId) -> QueryKey {
    QueryKey::new(ResourceKind::CrawlLogs).int(source_id)
}

pub fn cache_stats() -> QueryKey {
    QueryKey::new(ResourceKind::CacheStats)
}

pub fn digest_stats() -> QueryKey {
    QueryKey::new(ResourceKind::DigestStats)
}

pub fn profile() -> QueryKey {
    QueryKey::new(ResourceKind::Profile)
}
