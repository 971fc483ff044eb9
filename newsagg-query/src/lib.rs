//! News aggregator client - query cache
//!
//! Keyed, deduplicating cache of server reads. Views subscribe to a
//! [`QueryKey`]; the cache decides whether to serve the stored value, attach
//! to an in-flight fetch or start a new one, and drops responses that an
//! invalidation has superseded.

pub mod cache;
pub mod config;
pub mod key;
pub mod state;

pub use cache::{QueryCache, SubscriberId, Subscription};
pub use config::{FetchOptions, QueryConfig};
pub use key::{KeyPart, KeyPattern, QueryKey, ResourceKind};
pub use state::{QueryState, QueryStatus};
