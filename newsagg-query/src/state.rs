//! Observable state of a cache entry.
//!
//! The status enum alone cannot express "old value visible, refetch in
//! flight", so [`QueryState`] carries the value, the last error and an
//! `is_fetching` flag alongside it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use newsagg_core::TransportError;

/// Lifecycle status of a cache entry.
///
/// `Loading` only appears before the first value arrives. Revalidation of an
/// entry that already holds a value keeps `Success`/`Error` and raises
/// [`QueryState::is_fetching`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one entry, as seen by a subscriber.
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<TransportError>,
    pub is_fetching: bool,
    /// Marked stale by an invalidation and not yet refreshed.
    pub is_invalidated: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            is_invalidated: false,
            updated_at: None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// A previously obtained value is visible while a refetch is in flight.
    pub fn is_revalidating(&self) -> bool {
        self.is_fetching && self.data.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    /// Settled outcome: `None` while idle or loading.
    pub fn result(&self) -> Option<Result<Arc<T>, TransportError>> {
        match self.status {
            QueryStatus::Success => self.data.clone().map(Ok),
            QueryStatus::Error => self.error.clone().map(Err),
            QueryStatus::Idle | QueryStatus::Loading => None,
        }
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_invalidated: self.is_invalidated,
            updated_at: self.updated_at,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("is_invalidated", &self.is_invalidated)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
