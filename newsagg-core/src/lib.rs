//! News aggregator client core - wire types
//!
//! Pure data structures exchanged with the aggregator API, plus the error
//! taxonomy shared by every layer above. No I/O lives here.

pub mod entities;
pub mod enums;
pub mod envelope;
pub mod error;

pub use entities::{
    ArticleDetail, ArticleSummary, AuthResponse, CacheInfo, CacheStats, CrawlLog, CrawlResult,
    CrawlStats, DigestStats, LoginRequest, PreferenceRequest, RegisterRequest, Source,
    SourceRequest, UserProfile,
};
pub use enums::{CrawlLogStatus, CrawlOutcome, CrawlStatus, DigestFrequency, Role};
pub use envelope::{ApiResponse, Page};
pub use error::{TransportError, TransportResult, DEFAULT_ERROR_MESSAGE};

/// Numeric identifier used by every server-side entity.
pub type EntityId = i64;

/// Timestamp as emitted by the server (local time, no offset).
pub type Timestamp = chrono::NaiveDateTime;
