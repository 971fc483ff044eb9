//! Entity and request types exchanged with the aggregator API.
//!
//! Field names follow the server's camelCase JSON. These are fetch results,
//! not domain objects: the client never mutates them locally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{CrawlLogStatus, CrawlOutcome, CrawlStatus, DigestFrequency, Role};
use crate::{EntityId, Timestamp};

// ============================================================================
// ARTICLES
// ============================================================================

/// Article as it appears in feed listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: EntityId,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    pub category: String,
    pub source_name: String,
    pub source_id: EntityId,
    pub published_at: Option<Timestamp>,
    #[serde(default)]
    pub view_count: u64,
}

/// Full article, including scraped content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    pub id: EntityId,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    pub category: String,
    pub source_name: String,
    pub source_website_url: Option<String>,
    pub source_id: EntityId,
    pub published_at: Option<Timestamp>,
    #[serde(default)]
    pub view_count: u64,
    /// The server may emit either `isScraped` or `scraped`.
    #[serde(default, alias = "scraped")]
    pub is_scraped: bool,
    pub created_at: Option<Timestamp>,
}

// ============================================================================
// SOURCES
// ============================================================================

/// RSS source managed by admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub website_url: Option<String>,
    pub category: String,
    #[serde(alias = "active")]
    pub is_active: bool,
    pub last_crawled_at: Option<Timestamp>,
    pub crawl_status: Option<CrawlStatus>,
    pub created_at: Option<Timestamp>,
}

/// Create/update payload for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

// ============================================================================
// CRAWLER
// ============================================================================

/// Outcome of crawling a single source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub status: CrawlOutcome,
    pub source_name: String,
    pub articles_found: u32,
    pub articles_saved: u32,
    pub duration_ms: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Today's crawl counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub articles_saved_today: u64,
    pub total_active_sources: u64,
}

/// One historical crawl of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlLog {
    pub id: EntityId,
    pub status: CrawlLogStatus,
    #[serde(default)]
    pub articles_found: u32,
    #[serde(default)]
    pub articles_saved: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub crawled_at: Option<Timestamp>,
}

// ============================================================================
// CACHE / DIGEST
// ============================================================================

/// Keys held by one server-side cache bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub key_count: u64,
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Server cache statistics keyed by bucket name.
///
/// When the server runs without Redis the map holds plain strings
/// (`mode`, `info`) instead of bucket objects, hence `serde_json::Value`.
pub type CacheStats = BTreeMap<String, serde_json::Value>;

/// Today's digest delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestStats {
    pub sent_today: u64,
    pub failed_today: u64,
    pub total_users: u64,
}

// ============================================================================
// AUTH / USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_frequency: Option<DigestFrequency>,
}

/// Payload returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: EntityId,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub digest_enabled: bool,
    #[serde(default)]
    pub digest_frequency: DigestFrequency,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Raw role string; see [`Role::from_wire`].
    #[serde(default)]
    pub role: String,
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: EntityId,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub digest_enabled: bool,
    #[serde(default)]
    pub digest_frequency: DigestFrequency,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub role: Role,
}

impl From<&AuthResponse> for UserProfile {
    fn from(auth: &AuthResponse) -> Self {
        Self {
            id: auth.user_id,
            email: auth.email.clone(),
            full_name: auth.full_name.clone(),
            digest_enabled: auth.digest_enabled,
            digest_frequency: auth.digest_frequency,
            categories: auth.categories.clone(),
            role: Role::from_wire(&auth.role),
        }
    }
}

/// Body for `PUT /users/me/preferences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRequest {
    pub categories: Vec<String>,
    pub digest_enabled: bool,
    pub digest_frequency: DigestFrequency,
}
