//! # Lazy Sequences
//!
//! A `Sequence` is a re-iterable, asynchronously produced, ordered collection
//! of items.
//!
//! - A sequence is a factory of streams; `iter()` starts a fresh run
//! - Re-iterating re-executes every upstream stage, side effects included
//! - Transformations never mutate a sequence; they wrap it in a new one
//! - Items are pulled one at a time: item `i` is fully processed before
//!   item `i + 1` is requested, so side effects keep production order
//!
//! `memoized()` is the opt-in exception: it caches the first complete run.

use crate::Item;
use futures::future::join_all;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// A single run over a sequence.
pub type ItemStream = BoxStream<'static, Item>;

type Producer = dyn Fn() -> ItemStream + Send + Sync;

/// A lazily produced, re-iterable ordered collection of items.
#[derive(Clone)]
pub struct Sequence {
    producer: Arc<Producer>,
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

impl Sequence {
    /// Create a sequence from a stream factory.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> ItemStream + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// A sequence with no items.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|| stream::empty().boxed())
    }

    /// A sequence over a fixed list of items.
    #[must_use]
    pub fn from_items(items: Vec<Item>) -> Self {
        let items = Arc::new(items);
        Self::new(move || stream::iter(items.as_ref().clone()).boxed())
    }

    /// A sequence over a fixed list of JSON values.
    #[must_use]
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        Self::from_items(values.into_iter().map(Item::Value).collect())
    }

    /// A sequence whose items are computed by a future on every run.
    pub fn deferred<F, Fut>(compute: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<Item>> + Send + 'static,
    {
        Self::new(move || compute().map(stream::iter).flatten_stream().boxed())
    }

    /// Start a fresh run over the sequence.
    #[must_use]
    pub fn iter(&self) -> ItemStream {
        (self.producer)()
    }

    /// Check if two handles refer to the same sequence.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
    }

    /// A new handle producing the same runs, with its own identity.
    ///
    /// Seek and stack references resume through one of these, so the
    /// resumed sequence can be named again.
    #[must_use]
    pub fn fresh_handle(&self) -> Self {
        let upstream = self.clone();
        Self::new(move || upstream.iter())
    }

    /// Collect a full run into memory.
    pub async fn to_vec(&self) -> Vec<Item> {
        self.iter().collect().await
    }

    /// Transform each item with its index.
    #[must_use]
    pub fn map<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Item, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Item> + Send + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Self::new(move || {
            let f = Arc::clone(&f);
            upstream
                .iter()
                .enumerate()
                .then(move |(i, item)| (*f)(item, i))
                .boxed()
        })
    }

    /// Keep the items for which the predicate resolves to `true`.
    ///
    /// The index is the item's position in the input, not the output.
    #[must_use]
    pub fn filter<F, Fut>(&self, predicate: F) -> Self
    where
        F: Fn(Item, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Self::new(move || {
            let predicate = Arc::clone(&predicate);
            upstream
                .iter()
                .enumerate()
                .filter_map(move |(i, item)| {
                    let keep = (*predicate)(item.clone(), i);
                    async move { keep.await.then_some(item) }
                })
                .boxed()
        })
    }

    /// Expand each item into zero or more items, flattening one level.
    #[must_use]
    pub fn flat_map<F, Fut>(&self, f: F) -> Self
    where
        F: Fn(Item, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<Item>> + Send + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Self::new(move || {
            let f = Arc::clone(&f);
            upstream
                .iter()
                .enumerate()
                .then(move |(i, item)| (*f)(item, i))
                .map(stream::iter)
                .flatten()
                .boxed()
        })
    }

    /// Yield items until the predicate resolves to `true`.
    ///
    /// The triggering item and everything after it are dropped, and no
    /// further items are pulled from upstream.
    #[must_use]
    pub fn take_until<F, Fut>(&self, stop: F) -> Self
    where
        F: Fn(Item, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let upstream = self.clone();
        let stop = Arc::new(stop);
        Self::new(move || {
            let stop = Arc::clone(&stop);
            let mut index = 0;
            upstream
                .iter()
                .take_while(move |item| {
                    let done = (*stop)(item.clone(), index);
                    index += 1;
                    async move { !done.await }
                })
                .boxed()
        })
    }

    /// Fold the sequence left to right.
    pub async fn reduce<F, Fut>(&self, seed: Item, f: F) -> Item
    where
        F: Fn(Item, Item, usize) -> Fut,
        Fut: Future<Output = Item>,
    {
        self.iter()
            .enumerate()
            .fold(seed, |acc, (i, item)| f(acc, item, i))
            .await
    }

    /// Advance several sequences in lockstep until all are exhausted.
    ///
    /// Each tick fetches the next item of every member concurrently. Members
    /// that have ended contribute `None`. The run ends once every member has
    /// ended, so its length is the length of the longest member.
    pub fn zip_longest<F>(members: Vec<Sequence>, combine: F) -> Self
    where
        F: Fn(Vec<Option<Item>>) -> Item + Send + Sync + 'static,
    {
        let members = Arc::new(members);
        let combine = Arc::new(combine);
        Self::new(move || {
            let streams: Vec<_> = members.iter().map(|s| s.iter().fuse()).collect();
            let combine = Arc::clone(&combine);
            stream::unfold(streams, move |mut streams| {
                let combine = Arc::clone(&combine);
                async move {
                    let tick = join_all(streams.iter_mut().map(StreamExt::next)).await;
                    if tick.iter().all(Option::is_none) {
                        return None;
                    }
                    Some(((*combine)(tick), streams))
                }
            })
            .boxed()
        })
    }

    /// Cache the first complete run and replay it on later runs.
    ///
    /// Upstream side effects then happen once instead of once per run.
    #[must_use]
    pub fn memoized(&self) -> Self {
        let upstream = self.clone();
        let cache: Arc<Mutex<Option<Vec<Item>>>> = Arc::new(Mutex::new(None));
        Self::deferred(move || {
            let upstream = upstream.clone();
            let cache = Arc::clone(&cache);
            async move {
                let cached = cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(items) = cached {
                    return items;
                }
                let items = upstream.to_vec().await;
                *cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(items.clone());
                items
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
