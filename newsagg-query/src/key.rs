//! Structural cache keys and invalidation patterns.
//!
//! A [`QueryKey`] is an ordered tuple of a [`ResourceKind`] and typed
//! [`KeyPart`]s. Keys compare structurally: the same kind with the same part
//! values is the same entry. A [`KeyPattern`] selects every key of one kind
//! whose parts start with the pattern's prefix. Matching never goes through
//! string formatting, so `Tag("detail")` and `Text("detail")` stay distinct
//! and no two kinds can collide.

use std::borrow::Cow;
use std::fmt;

/// Category of fetchable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Articles,
    Sources,
    Categories,
    Bookmarks,
    CrawlerStats,
    CacheStats,
    DigestStats,
    CrawlLogs,
    Profile,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Articles => "articles",
            ResourceKind::Sources => "sources",
            ResourceKind::Categories => "categories",
            ResourceKind::Bookmarks => "bookmarks",
            ResourceKind::CrawlerStats => "crawler-stats",
            ResourceKind::CacheStats => "cache-stats",
            ResourceKind::DigestStats => "digest-stats",
            ResourceKind::CrawlLogs => "crawl-logs",
            ResourceKind::Profile => "profile",
        }
    }

    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Articles,
            ResourceKind::Sources,
            ResourceKind::Categories,
            ResourceKind::Bookmarks,
            ResourceKind::CrawlerStats,
            ResourceKind::CacheStats,
            ResourceKind::DigestStats,
            ResourceKind::CrawlLogs,
            ResourceKind::Profile,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed component of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    /// Fixed discriminator chosen by the code, e.g. `list` or `detail`.
    Tag(&'static str),
    Int(i64),
    Text(String),
    /// An optional parameter that was not set.
    Absent,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Tag(tag) => write!(f, "{}", tag),
            KeyPart::Int(value) => write!(f, "{}", value),
            KeyPart::Text(value) => write!(f, "{:?}", value),
            KeyPart::Absent => f.write_str("-"),
        }
    }
}

/// Identity of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    kind: ResourceKind,
    parts: Vec<KeyPart>,
}

impl QueryKey {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            parts: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: &'static str) -> Self {
        self.parts.push(KeyPart::Tag(tag));
        self
    }

    pub fn int(mut self, value: i64) -> Self {
        self.parts.push(KeyPart::Int(value));
        self
    }

    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.parts.push(KeyPart::Text(value.into()));
        self
    }

    pub fn opt_int(mut self, value: Option<i64>) -> Self {
        self.parts.push(value.map(KeyPart::Int).unwrap_or(KeyPart::Absent));
        self
    }

    pub fn opt_text(mut self, value: Option<&str>) -> Self {
        self.parts.push(
            value
                .map(|v| KeyPart::Text(v.to_string()))
                .unwrap_or(KeyPart::Absent),
        );
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for part in &self.parts {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

/// Selects every key of one kind whose parts begin with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    kind: ResourceKind,
    prefix: Cow<'static, [KeyPart]>,
}

impl KeyPattern {
    /// Every key of `kind`. Usable in `const` tables.
    pub const fn of_kind(kind: ResourceKind) -> Self {
        Self {
            kind,
            prefix: Cow::Borrowed(&[]),
        }
    }

    /// Keys of `kind` whose parts start with the static `prefix`.
    pub const fn with_prefix(kind: ResourceKind, prefix: &'static [KeyPart]) -> Self {
        Self {
            kind,
            prefix: Cow::Borrowed(prefix),
        }
    }

    /// Exactly `key` and any key extending it.
    pub fn from_key(key: &QueryKey) -> Self {
        Self {
            kind: key.kind,
            prefix: Cow::Owned(key.parts.clone()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn prefix(&self) -> &[KeyPart] {
        &self.prefix
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        self.kind == key.kind && key.parts.starts_with(&self.prefix)
    }
}

impl From<ResourceKind> for KeyPattern {
    fn from(kind: ResourceKind) -> Self {
        KeyPattern::of_kind(kind)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for part in self.prefix.iter() {
            write!(f, "/{}", part)?;
        }
        f.write_str("/*")
    }
}
