//! Reactive query cache.
//!
//! Each [`QueryKey`] maps to one entry that tracks the last value, the last
//! error, its subscribers and at most one outstanding fetch. Fetches run on
//! spawned Tokio tasks; everything else is synchronous bookkeeping under a
//! single mutex that is never held across an await point.
//!
//! # Ordering
//!
//! Every fetch is tagged with an attempt number drawn from one cache-wide
//! counter. An entry remembers only its latest issued attempt, and a response
//! is applied only if it carries that number. An invalidation that lands while
//! a fetch is in flight issues a new attempt, so the older response (which may
//! predate the mutation) is dropped whichever order the two arrive in.
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::new(QueryConfig::default());
//! let mut sub = cache.fetch(key, FetchOptions::new().stale_time(five_min), move || {
//!     let client = client.clone();
//!     async move { client.sources().list().await }
//! });
//! let state = sub.settled().await;
//! ```

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use newsagg_core::{TransportError, TransportResult};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{FetchOptions, QueryConfig};
use crate::key::{KeyPattern, QueryKey};
use crate::state::{QueryState, QueryStatus};

type ErasedValue = Arc<dyn Any + Send + Sync>;
type ErasedLoader = Arc<dyn Fn() -> BoxFuture<'static, TransportResult<ErasedValue>> + Send + Sync>;

/// Handle identifying one subscriber of one entry.
pub type SubscriberId = u64;

// ============================================================================
// ENTRY TABLE
// ============================================================================

struct Entry {
    status: QueryStatus,
    value: Option<ErasedValue>,
    error: Option<TransportError>,
    updated_at: Option<DateTime<Utc>>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    stale_time: Duration,
    enabled: bool,
    subscribers: HashSet<SubscriberId>,
    /// Latest issued attempt that has not resolved yet.
    pending_attempt: Option<u64>,
    loader: Option<ErasedLoader>,
    idle_since: Option<Instant>,
    /// Generation of the poller currently driving this entry.
    poller: Option<u64>,
    notify: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            status: QueryStatus::Idle,
            value: None,
            error: None,
            updated_at: None,
            fetched_at: None,
            invalidated: false,
            stale_time: Duration::ZERO,
            enabled: true,
            subscribers: HashSet::new(),
            pending_attempt: None,
            loader: None,
            idle_since: None,
            poller: None,
            notify,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) >= self.stale_time,
            None => true,
        }
    }

    fn notify(&self) {
        self.notify.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let data = match &self.value {
            Some(value) => match Arc::clone(value).downcast::<T>() {
                Ok(data) => Some(data),
                Err(_) => {
                    warn!(key = %key, "cached value has a different type than requested");
                    None
                }
            },
            None => None,
        };
        QueryState {
            status: self.status,
            data,
            error: self.error.clone(),
            is_fetching: self.pending_attempt.is_some(),
            is_invalidated: self.invalidated,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Default)]
struct Table {
    entries: HashMap<QueryKey, Entry>,
    next_attempt: u64,
    next_subscriber: SubscriberId,
    next_poller: u64,
}

impl Table {
    /// Issue a new attempt for `key`, superseding any attempt in flight.
    fn begin_attempt(&mut self, key: &QueryKey) -> Option<(u64, ErasedLoader)> {
        let entry = self.entries.get_mut(key)?;
        let loader = entry.loader.clone()?;
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        if let Some(previous) = entry.pending_attempt.replace(attempt) {
            debug!(key = %key, previous, attempt, "superseding in-flight fetch");
        }
        if entry.value.is_none() {
            entry.status = QueryStatus::Loading;
        }
        entry.notify();
        Some((attempt, loader))
    }

    fn sweep(&mut self, now: Instant, gc_time: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let expired = entry.subscribers.is_empty()
                && entry
                    .idle_since
                    .map_or(false, |since| now.saturating_duration_since(since) >= gc_time);
            if expired {
                debug!(key = %key, "evicting idle entry");
            }
            !expired
        });
        before - self.entries.len()
    }
}

struct Inner {
    table: Mutex<Table>,
    config: QueryConfig,
}

// ============================================================================
// QUERY CACHE
// ============================================================================

/// Keyed cache of fetch results shared by every view.
///
/// Cloning is cheap; clones share the same entry table.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(Table::default()),
                config,
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(QueryConfig::default())
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.inner.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in `key`.
    ///
    /// Calls `loader` when the entry is missing or stale and no fetch is
    /// already outstanding; otherwise the subscriber attaches to the cached
    /// value or to the fetch in flight. Must be called inside a Tokio runtime.
    pub fn fetch<T, F, Fut>(&self, key: QueryKey, options: FetchOptions, loader: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransportResult<T>> + Send + 'static,
    {
        let erased: ErasedLoader = Arc::new(move || {
            let fut = loader();
            async move { fut.await.map(|value| Arc::new(value) as ErasedValue) }.boxed()
        });
        let now = Instant::now();
        let stale_time = options
            .stale_time
            .unwrap_or(self.inner.config.default_stale_time);

        let (id, rx, start, poll) = {
            let mut table = self.lock();
            table.sweep(now, self.inner.config.gc_time);

            let id = table.next_subscriber;
            table.next_subscriber += 1;

            let entry = table.entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.subscribers.insert(id);
            entry.idle_since = None;
            entry.loader = Some(erased);
            entry.stale_time = stale_time;
            entry.enabled = options.enabled;
            let rx = entry.notify.subscribe();

            let needs_fetch =
                options.enabled && entry.pending_attempt.is_none() && entry.is_stale(now);
            let poll = match options.refetch_interval {
                Some(interval) if options.enabled && entry.poller.is_none() => {
                    let generation = table.next_poller;
                    table.next_poller += 1;
                    if let Some(entry) = table.entries.get_mut(&key) {
                        entry.poller = Some(generation);
                    }
                    Some((interval, generation))
                }
                _ => None,
            };
            debug!(key = %key, subscriber = id, needs_fetch, "subscribed");

            let start = if needs_fetch {
                table.begin_attempt(&key)
            } else {
                None
            };
            (id, rx, start, poll)
        };

        if let Some((attempt, loader)) = start {
            self.spawn_fetch(key.clone(), attempt, loader);
        }
        if let Some((interval, generation)) = poll {
            self.spawn_poller(key.clone(), interval, generation);
        }

        Subscription {
            cache: self.clone(),
            key,
            id,
            rx,
            active: true,
            _marker: PhantomData,
        }
    }

    /// Fetch, wait for the entry to settle and return its outcome.
    ///
    /// The subscription is released on return, so the entry becomes
    /// eligible for garbage collection.
    pub async fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: FetchOptions,
        loader: F,
    ) -> TransportResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransportResult<T>> + Send + 'static,
    {
        let mut subscription = self.fetch(key, options, loader);
        let state = subscription.settled().await;
        state.result().unwrap_or_else(|| {
            Err(TransportError::Network(
                "Query settled without a result".to_string(),
            ))
        })
    }

    /// Mark every entry matching `pattern` stale.
    ///
    /// Entries with subscribers are refetched right away; entries without
    /// subscribers are dropped and will load lazily on next subscription.
    /// Returns the number of matching entries.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut starts = Vec::new();
        let mut matched = 0;
        {
            let mut table = self.lock();
            let keys: Vec<QueryKey> = table
                .entries
                .keys()
                .filter(|key| pattern.matches(key))
                .cloned()
                .collect();

            for key in keys {
                matched += 1;
                let enabled = match table.entries.get_mut(&key) {
                    Some(entry) if entry.subscribers.is_empty() => None,
                    Some(entry) => {
                        entry.invalidated = true;
                        entry.notify();
                        Some(entry.enabled)
                    }
                    None => continue,
                };
                match enabled {
                    None => {
                        table.entries.remove(&key);
                        debug!(key = %key, "invalidated entry without subscribers dropped");
                    }
                    Some(true) => {
                        if let Some(start) = table.begin_attempt(&key) {
                            starts.push((key, start));
                        }
                    }
                    Some(false) => {
                        debug!(key = %key, "invalidated disabled entry");
                    }
                }
            }
        }

        debug!(pattern = %pattern, matched, refetching = starts.len(), "invalidated");
        for (key, (attempt, loader)) in starts {
            self.spawn_fetch(key, attempt, loader);
        }
        matched
    }

    /// Invalidate several patterns; returns the total number of matches.
    pub fn invalidate_all(&self, patterns: &[KeyPattern]) -> usize {
        patterns.iter().map(|pattern| self.invalidate(pattern)).sum()
    }

    /// Refetch `key` now if it has subscribers and nothing is in flight.
    pub fn refetch(&self, key: &QueryKey) -> bool {
        let start = {
            let mut table = self.lock();
            let eligible = table.entries.get(key).map_or(false, |entry| {
                entry.enabled && !entry.subscribers.is_empty() && entry.pending_attempt.is_none()
            });
            if eligible {
                table.begin_attempt(key)
            } else {
                None
            }
        };
        match start {
            Some((attempt, loader)) => {
                self.spawn_fetch(key.clone(), attempt, loader);
                true
            }
            None => false,
        }
    }

    /// Remove matching entries outright, subscribers or not.
    pub fn remove(&self, pattern: &KeyPattern) -> usize {
        let mut table = self.lock();
        let before = table.entries.len();
        table.entries.retain(|key, _| !pattern.matches(key));
        before - table.entries.len()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Release one subscriber. Idempotent.
    pub fn unsubscribe(&self, key: &QueryKey, subscriber: SubscriberId) {
        let mut table = self.lock();
        if let Some(entry) = table.entries.get_mut(key) {
            if entry.subscribers.remove(&subscriber) && entry.subscribers.is_empty() {
                entry.idle_since = Some(Instant::now());
                debug!(key = %key, "last subscriber left");
            }
        }
    }

    /// Evict entries that have had no subscribers for longer than `gc_time`.
    pub fn collect_garbage(&self) -> usize {
        let gc_time = self.inner.config.gc_time;
        self.lock().sweep(Instant::now(), gc_time)
    }

    /// Current state of `key` without subscribing.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.lock().entries.get(key).map(|entry| entry.snapshot(key))
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock()
            .entries
            .get(key)
            .map_or(0, |entry| entry.subscribers.len())
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------------

    fn spawn_fetch(&self, key: QueryKey, attempt: u64, loader: ErasedLoader) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.run_fetch(key, attempt, loader).await;
        });
    }

    async fn run_fetch(&self, key: QueryKey, attempt: u64, loader: ErasedLoader) {
        let retries = self.inner.config.read_retries;
        let mut failures = 0;
        let result = loop {
            match loader().await {
                Ok(value) => break Ok(value),
                Err(error) if failures < retries && error.is_retryable() => {
                    failures += 1;
                    warn!(key = %key, attempt, error = %error, "read failed, retrying");
                    tokio::time::sleep(self.inner.config.retry_delay).await;
                    if !self.is_current(&key, attempt) {
                        debug!(key = %key, attempt, "abandoning retry of superseded fetch");
                        return;
                    }
                }
                Err(error) => break Err(error),
            }
        };
        self.complete(&key, attempt, result);
    }

    fn is_current(&self, key: &QueryKey, attempt: u64) -> bool {
        self.lock()
            .entries
            .get(key)
            .map_or(false, |entry| entry.pending_attempt == Some(attempt))
    }

    fn complete(&self, key: &QueryKey, attempt: u64, result: TransportResult<ErasedValue>) {
        let mut table = self.lock();
        let Some(entry) = table.entries.get_mut(key) else {
            debug!(key = %key, attempt, "entry gone, dropping response");
            return;
        };
        if entry.pending_attempt != Some(attempt) {
            debug!(key = %key, attempt, "dropping response of superseded attempt");
            return;
        }
        entry.pending_attempt = None;

        if entry.subscribers.is_empty() {
            debug!(key = %key, attempt, "no subscribers left, discarding response");
            if entry.value.is_none() && entry.status == QueryStatus::Loading {
                entry.status = QueryStatus::Idle;
            }
            entry.notify();
            return;
        }

        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.status = QueryStatus::Success;
                entry.error = None;
                entry.fetched_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now());
                entry.invalidated = false;
                debug!(key = %key, attempt, "query resolved");
            }
            Err(error) => {
                warn!(key = %key, attempt, error = %error, "query failed");
                entry.status = QueryStatus::Error;
                entry.error = Some(error);
            }
        }
        entry.notify();
    }

    fn spawn_poller(&self, key: QueryKey, interval: Duration, generation: u64) {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !cache.keep_polling(&key, generation) {
                    debug!(key = %key, generation, "polling stopped");
                    break;
                }
                cache.refetch(&key);
            }
        });
    }

    /// A poller runs only while its entry survives and still names it.
    fn keep_polling(&self, key: &QueryKey, generation: u64) -> bool {
        let mut table = self.lock();
        match table.entries.get_mut(key) {
            Some(entry) if entry.poller != Some(generation) => false,
            Some(entry) if !entry.subscribers.is_empty() => true,
            Some(entry) => {
                entry.poller = None;
                false
            }
            None => false,
        }
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// A view's registration of interest in one entry.
///
/// Dropping the subscription unsubscribes.
pub struct Subscription<T> {
    cache: QueryCache,
    key: QueryKey,
    id: SubscriberId,
    rx: watch::Receiver<u64>,
    active: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.cache.unsubscribe(&self.key, self.id);
        }
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Current snapshot of the entry.
    pub fn state(&self) -> QueryState<T> {
        self.cache.peek(&self.key).unwrap_or_default()
    }

    /// Wait for the next change to the entry.
    ///
    /// Returns `None` once the entry has been removed from the cache; this
    /// subscription will never observe another change.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until no fetch is in flight for the entry.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            self.rx.borrow_and_update();
            let state = self.state();
            if !state.is_fetching {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
