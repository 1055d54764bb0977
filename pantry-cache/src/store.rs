//! In-memory query cache with request coalescing.
//!
//! Each entry tracks a generation. Invalidation moves the entry to a new
//! generation and detaches any in-flight fetch, so a fetch that started
//! earlier can still store its value but only as stale. Values carry the
//! ticket of the fetch that produced them; a completed fetch never replaces a
//! value stored by a fetch that started after it.

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::freshness::CacheRead;
use crate::key::{CacheKey, KeyPattern};
use crate::stats::CacheStats;

type Value = Arc<dyn Any + Send + Sync>;
type Fetch<E> = Shared<BoxFuture<'static, Result<Value, E>>>;

struct Stored {
    value: Value,
    stored_at: DateTime<Utc>,
    /// Ticket of the fetch that produced the value.
    ticket: u64,
    /// Store order, for eviction.
    seq: u64,
}

struct InFlight<E> {
    ticket: u64,
    fetch: Fetch<E>,
}

struct Entry<E> {
    stored: Option<Stored>,
    fresh: bool,
    generation: u64,
    in_flight: Option<InFlight<E>>,
}

impl<E> Entry<E> {
    fn new(generation: u64) -> Self {
        Self {
            stored: None,
            fresh: false,
            generation,
            in_flight: None,
        }
    }

    fn stored_read<T>(&self, stale_after: Option<Duration>) -> Option<CacheRead<T>>
    where
        T: Clone + 'static,
    {
        let stored = self.stored.as_ref()?;
        let value = stored.value.downcast_ref::<T>()?;
        let aged = stale_after.is_some_and(|limit| {
            (Utc::now() - stored.stored_at)
                .to_std()
                .is_ok_and(|age| age >= limit)
        });
        Some(CacheRead::from_cache(
            value.clone(),
            stored.stored_at,
            !self.fresh || aged,
        ))
    }
}

struct State<E> {
    entries: HashMap<CacheKey, Entry<E>>,
    next_ticket: u64,
    next_generation: u64,
    /// Bumped by `clear`; fetches from an older epoch store nothing.
    epoch: u64,
    stats: CacheStats,
}

impl<E> State<E> {
    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

#[derive(Default)]
struct Barriers {
    next_id: u64,
    active: HashMap<u64, ActiveBarrier>,
}

struct ActiveBarrier {
    patterns: Vec<KeyPattern>,
    released: watch::Receiver<bool>,
}

impl Barriers {
    fn blocking(&self, key: &CacheKey) -> Vec<watch::Receiver<bool>> {
        self.active
            .values()
            .filter(|barrier| barrier.patterns.iter().any(|p| p.matches(key)))
            .map(|barrier| barrier.released.clone())
            .collect()
    }
}

/// Marks keys as being written. Reads of covered keys wait until it drops.
#[must_use = "the barrier is released as soon as it is dropped"]
pub struct WriteBarrier {
    id: u64,
    barriers: Arc<Mutex<Barriers>>,
    release: watch::Sender<bool>,
}

impl WriteBarrier {
    /// Release the barrier now.
    pub fn release(self) {}
}

impl Drop for WriteBarrier {
    fn drop(&mut self) {
        lock(&self.barriers).active.remove(&self.id);
        self.release.send_replace(true);
    }
}

impl std::fmt::Debug for WriteBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBarrier").field("id", &self.id).finish()
    }
}

/// Keyed store of query results, shared by every reader in the process.
///
/// `E` is the fetch error. It is cloned to every caller coalesced onto a
/// failing fetch.
pub struct CacheStore<E> {
    state: Arc<Mutex<State<E>>>,
    barriers: Arc<Mutex<Barriers>>,
    config: CacheConfig,
}

impl<E> Clone for CacheStore<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            barriers: Arc::clone(&self.barriers),
            config: self.config.clone(),
        }
    }
}

impl<E> Default for CacheStore<E>
where
    E: Clone + From<CacheError> + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<E> CacheStore<E>
where
    E: Clone + From<CacheError> + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                next_ticket: 0,
                next_generation: 0,
                epoch: 0,
                stats: CacheStats::default(),
            })),
            barriers: Arc::new(Mutex::new(Barriers::default())),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the fresh value for `key`, join the fetch in flight, or start
    /// one with `fetcher`.
    ///
    /// On failure nothing is stored and the previous value stays readable.
    /// The fetch runs on a spawned Tokio task and finishes even if every
    /// caller gives up.
    pub async fn populate<T, F, Fut>(&self, key: CacheKey, fetcher: F) -> Result<CacheRead<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetch = {
            let mut guard = self.lock_unblocked(&key).await;
            let state = &mut *guard;

            let existing = state.entries.get(&key);
            if let Some(read) = existing.and_then(|e| e.stored_read::<T>(self.config.stale_after()))
            {
                if !read.is_stale() {
                    state.stats.hits += 1;
                    tracing::trace!(key = %key, "Cache hit");
                    return Ok(read);
                }
            }

            let joined = existing
                .and_then(|entry| entry.in_flight.as_ref())
                .map(|in_flight| in_flight.fetch.clone());
            match joined {
                Some(fetch) => {
                    state.stats.coalesced += 1;
                    tracing::trace!(key = %key, "Joining in-flight fetch");
                    fetch
                }
                None => {
                    let ticket = state.ticket();
                    let generation = match state.entries.get(&key) {
                        Some(entry) => entry.generation,
                        None => {
                            let generation = state.generation();
                            state.entries.insert(key, Entry::new(generation));
                            generation
                        }
                    };
                    let fetch = self.start_fetch(key, ticket, generation, state.epoch, fetcher);
                    if let Some(entry) = state.entries.get_mut(&key) {
                        entry.in_flight = Some(InFlight {
                            ticket,
                            fetch: fetch.clone(),
                        });
                    }
                    state.stats.misses += 1;
                    tracing::trace!(key = %key, ticket, "Cache miss; fetching");
                    fetch
                }
            }
        };

        let value = fetch.await?;
        match value.downcast_ref::<T>() {
            Some(value) => Ok(CacheRead::from_fetch(value.clone(), Utc::now())),
            None => {
                tracing::error!(key = %key, "Joined fetch produced a value of another type");
                Err(CacheError::TypeMismatch {
                    key: key.to_string(),
                }
                .into())
            }
        }
    }

    /// Run `fetcher` on its own task, so it completes and stores its result
    /// even if every caller stops waiting.
    fn start_fetch<T, F, Fut>(
        &self,
        key: CacheKey,
        ticket: u64,
        generation: u64,
        epoch: u64,
        fetcher: F,
    ) -> Fetch<E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let max_entries = self.config.max_entries;
        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(async move { fetcher().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result.map(|value| Arc::new(value) as Value),
                Err(_) => {
                    tracing::error!(key = %key, "Fetch panicked");
                    Err(CacheError::FetchAborted {
                        key: key.to_string(),
                    }
                    .into())
                }
            };
            let completion = Completion {
                key,
                ticket,
                generation,
                epoch,
            };
            completion.apply(&state, &result, max_entries);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Fetch task cancelled");
                    Err(CacheError::FetchAborted {
                        key: key.to_string(),
                    }
                    .into())
                }
            }
        }
        .boxed()
        .shared()
    }

    /// The stored value for `key`, fresh or stale. Waits for write barriers
    /// covering `key`.
    pub async fn read<T>(&self, key: &CacheKey) -> Option<CacheRead<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let state = self.lock_unblocked(key).await;
        state.entries.get(key)?.stored_read(self.config.stale_after())
    }

    /// Like [`read`](Self::read) without waiting for write barriers.
    pub fn peek<T>(&self, key: &CacheKey) -> Option<CacheRead<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let state = lock(&self.state);
        state.entries.get(key)?.stored_read(self.config.stale_after())
    }

    /// True while a fetch for `key` is running.
    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        lock(&self.state)
            .entries
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    /// Mark every entry matching `pattern` stale. Values stay readable; the
    /// next populate fetches again. Returns the keys marked.
    pub fn invalidate(&self, pattern: &KeyPattern) -> Vec<CacheKey> {
        let mut detached = Vec::new();
        let mut keys = Vec::new();
        {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            let generation = state.generation();
            for (key, entry) in state.entries.iter_mut() {
                if !pattern.matches(key) {
                    continue;
                }
                entry.generation = generation;
                entry.fresh = false;
                detached.extend(entry.in_flight.take());
                keys.push(*key);
            }
            state.stats.invalidations += keys.len() as u64;
        }
        drop(detached);

        if !keys.is_empty() {
            let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
            tracing::debug!(pattern = %pattern, keys = ?names, "Invalidated cache entries");
        }
        keys
    }

    pub fn invalidate_all(&self) -> Vec<CacheKey> {
        self.invalidate(&KeyPattern::All)
    }

    /// Drop every entry. Fetches already running store nothing.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = lock(&self.state);
            state.epoch += 1;
            state.entries.drain().collect::<Vec<_>>()
        };
        let count = removed.len();
        drop(removed);
        tracing::debug!(entries = count, "Cleared cache");
        count
    }

    /// Hold back reads of keys matching `patterns` until the returned barrier
    /// is dropped.
    pub fn begin_write(&self, patterns: Vec<KeyPattern>) -> WriteBarrier {
        let (release, released) = watch::channel(false);
        let mut barriers = lock(&self.barriers);
        barriers.next_id += 1;
        let id = barriers.next_id;
        barriers
            .active
            .insert(id, ActiveBarrier { patterns, released });
        WriteBarrier {
            id,
            barriers: Arc::clone(&self.barriers),
            release,
        }
    }

    /// True while a write barrier covers `key`.
    pub fn is_write_pending(&self, key: &CacheKey) -> bool {
        !lock(&self.barriers).blocking(key).is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.state);
        CacheStats {
            entry_count: state.entries.len() as u64,
            ..state.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the state once no write barrier covers `key`.
    async fn lock_unblocked(&self, key: &CacheKey) -> MutexGuard<'_, State<E>> {
        loop {
            let pending = {
                let barriers = lock(&self.barriers);
                let pending = barriers.blocking(key);
                if pending.is_empty() {
                    return lock(&self.state);
                }
                pending
            };
            tracing::trace!(key = %key, writes = pending.len(), "Waiting for pending writes");
            for mut released in pending {
                // A closed channel means the barrier is gone as well.
                let _ = released.wait_for(|done| *done).await;
            }
        }
    }
}

/// Outcome bookkeeping for one finished fetch.
struct Completion {
    key: CacheKey,
    ticket: u64,
    generation: u64,
    epoch: u64,
}

impl Completion {
    fn apply<E>(&self, state: &Mutex<State<E>>, result: &Result<Value, E>, max_entries: usize) {
        let mut guard = lock(state);
        let state = &mut *guard;
        if state.epoch != self.epoch {
            return;
        }
        let seq = state.ticket();
        let Some(entry) = state.entries.get_mut(&self.key) else {
            return;
        };

        let finished = match &entry.in_flight {
            Some(in_flight) if in_flight.ticket == self.ticket => entry.in_flight.take(),
            _ => None,
        };

        match result {
            Ok(value) => {
                let superseded = entry
                    .stored
                    .as_ref()
                    .is_some_and(|stored| stored.ticket > self.ticket);
                if superseded {
                    tracing::trace!(key = %self.key, "Discarding result older than stored value");
                } else {
                    entry.stored = Some(Stored {
                        value: Arc::clone(value),
                        stored_at: Utc::now(),
                        ticket: self.ticket,
                        seq,
                    });
                    entry.fresh = entry.generation == self.generation;
                    if !entry.fresh {
                        tracing::debug!(
                            key = %self.key,
                            "Fetch overlapped an invalidation; stored as stale"
                        );
                    }
                }
            }
            Err(_) => {
                tracing::debug!(key = %self.key, "Fetch failed; keeping previous value");
            }
        }

        evict(state, max_entries);
        drop(guard);
        drop(finished);
    }
}

fn evict<E>(state: &mut State<E>, max_entries: usize) {
    while state.entries.len() > max_entries {
        let victim = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.in_flight.is_none())
            .min_by_key(|(_, entry)| {
                (
                    entry.fresh && entry.stored.is_some(),
                    entry.stored.as_ref().map_or(0, |stored| stored.seq),
                )
            })
            .map(|(key, _)| *key);

        let Some(key) = victim else {
            break;
        };
        state.entries.remove(&key);
        state.stats.evictions += 1;
        tracing::trace!(key = %key, "Evicted cache entry");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
