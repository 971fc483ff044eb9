//! Server cache buckets and the eviction each one maps to.

use std::fmt;

/// Which server-side eviction endpoint a bucket is flushed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictTarget {
    Articles,
    Sources,
    All,
}

impl fmt::Display for EvictTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictTarget::Articles => f.write_str("articles"),
            EvictTarget::Sources => f.write_str("sources"),
            EvictTarget::All => f.write_str("all"),
        }
    }
}

/// Bucket names as the server reports them in its cache stats.
const BUCKET_TARGETS: &[(&str, EvictTarget)] = &[
    ("articles", EvictTarget::Articles),
    ("article_detail", EvictTarget::Articles),
    ("search", EvictTarget::Articles),
    ("sources", EvictTarget::Sources),
    ("categories", EvictTarget::Sources),
];

/// Eviction for `bucket`. Unknown buckets flush everything.
pub fn evict_target(bucket: &str) -> EvictTarget {
    BUCKET_TARGETS
        .iter()
        .find(|(name, _)| *name == bucket)
        .map(|(_, target)| *target)
        .unwrap_or(EvictTarget::All)
}
