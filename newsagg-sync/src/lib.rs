//! News aggregator sync layer
//!
//! Ties the session-aware client to the query cache: typed reads with their
//! freshness windows, writes followed by the invalidations they imply, and
//! the wiring used by the `newsagg` binary.

pub mod app;
pub mod buckets;
pub mod command;
pub mod error;
pub mod keys;
pub mod mutation;
pub mod queries;
pub mod telemetry;
pub mod ui;

pub use app::{App, FEED_PAGE_SIZE};
pub use buckets::{evict_target, EvictTarget};
pub use command::{Cli, Command};
pub use error::{AppError, AppResult};
pub use mutation::{MutationCoordinator, MutationKind};
pub use queries::{
    settle, Queries, CONTENT_STALE_TIME, MONITOR_POLL_INTERVAL, MONITOR_STALE_TIME,
};
pub use ui::{SourceModal, UiState};
