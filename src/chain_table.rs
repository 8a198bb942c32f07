//! ChainTable: fixed-size hash table with separate chaining.
//!
//! Each bucket owns a `Vec` of entries. A key lives in exactly one chain, the
//! one selected by the table's [`BucketHasher`], and appears there at most
//! once. The bucket count is fixed at construction; chains grow instead.

use crate::bucket_key::{BucketHasher, Natural};
use crate::config::{TableConfig, DEFAULT_BUCKETS};
use crate::error::TableError;
use crate::reentry::ReentryCheck;
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::num::NonZeroUsize;
use tracing::{debug, trace};

const DEFAULT_BUCKET_COUNT: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BUCKETS) {
    Some(n) => n,
    None => panic!("DEFAULT_BUCKETS must be non-zero"),
};

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

pub struct ChainTable<K, V, S = Natural> {
    strategy: S,
    buckets: Box<[Vec<Entry<K, V>>]>,
    bucket_count: NonZeroUsize,
    len: usize,
    insert_calls: usize,
    reentry: ReentryCheck,
}

impl<K, V> ChainTable<K, V>
where
    K: Eq,
    Natural: BucketHasher<K>,
{
    /// Table with the default 10 buckets.
    pub fn new() -> Self {
        Self::with_hasher(DEFAULT_BUCKET_COUNT, Natural)
    }

    pub fn with_buckets(buckets: usize) -> Result<Self, TableError> {
        Self::from_config(&TableConfig::new(buckets), Natural)
    }
}

impl<K, V> Default for ChainTable<K, V>
where
    K: Eq,
    Natural: BucketHasher<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainTable<K, V, S> {
    fn build(strategy: S, bucket_count: NonZeroUsize, chain_capacity: usize) -> Self {
        let buckets = (0..bucket_count.get())
            .map(|_| Vec::with_capacity(chain_capacity))
            .collect();
        debug!(buckets = bucket_count.get(), chain_capacity, "created chain table");
        Self {
            strategy,
            buckets,
            bucket_count,
            len: 0,
            insert_calls: 0,
            reentry: ReentryCheck::new(),
        }
    }

    /// Number of buckets; never changes.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.get()
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of `insert` calls made so far, overwrites included.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls
    }

    /// The bucket strategy fixed at construction.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Entries in bucket order, then chain order.
    ///
    /// The iterator is `Clone`, so an enumeration can be restarted from any
    /// point; calling `iter` again restarts from the first bucket.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: Default::default(),
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            buckets: self.buckets.iter_mut(),
            chain: Default::default(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + Clone + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Values in iteration order; collect this to export a flat list.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + Clone + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// One view per bucket, including empty ones, in bucket order.
    pub fn buckets(&self) -> impl ExactSizeIterator<Item = Chain<'_, K, V>> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .map(|(index, entries)| Chain { index, entries })
    }
}

impl<K, V, S> ChainTable<K, V, S>
where
    K: Eq,
    S: BucketHasher<K>,
{
    pub fn with_hasher(buckets: NonZeroUsize, strategy: S) -> Self {
        Self::build(strategy, buckets, 0)
    }

    pub fn from_config(config: &TableConfig, strategy: S) -> Result<Self, TableError> {
        let buckets = config.bucket_count()?;
        Ok(Self::build(strategy, buckets, config.chain_capacity))
    }

    /// Bucket that `q` maps to. Strategy output is reduced modulo the bucket
    /// count, so a misbehaving strategy cannot index out of range.
    pub fn bucket_index<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized,
        S: BucketHasher<Q>,
    {
        self.strategy.bucket_of(q, self.bucket_count) % self.bucket_count.get()
    }

    /// Inserts `key -> value`.
    ///
    /// If the key is already present its value is replaced in place and the
    /// previous value is returned; the stored key is kept and `key` is
    /// dropped. Otherwise the entry is appended to the end of its chain.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentry.enter();
        self.insert_calls += 1;
        let index = self.bucket_index(&key);
        let chain = &mut self.buckets[index];
        if let Some(entry) = chain.iter_mut().find(|e| e.key == key) {
            trace!(bucket = index, "replaced value of existing key");
            return Some(core::mem::replace(&mut entry.value, value));
        }
        chain.push(Entry { key, value });
        self.len += 1;
        trace!(bucket = index, chain_len = chain.len(), "appended entry");
        None
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: BucketHasher<Q>,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: BucketHasher<Q>,
    {
        let _g = self.reentry.enter();
        let index = self.bucket_index(q);
        self.buckets[index]
            .iter()
            .find(|e| e.key.borrow() == q)
            .map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: BucketHasher<Q>,
    {
        let _g = self.reentry.enter();
        let index = self.bucket_index(q);
        self.buckets[index]
            .iter_mut()
            .find(|e| e.key.borrow() == q)
            .map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: BucketHasher<Q>,
    {
        self.get_key_value(q).is_some()
    }
}

impl<K, V, S> Extend<(K, V)> for ChainTable<K, V, S>
where
    K: Eq,
    S: BucketHasher<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Read-only view of one bucket's chain.
pub struct Chain<'a, K, V> {
    index: usize,
    entries: &'a [Entry<K, V>],
}

impl<K, V> Clone for Chain<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Chain<'_, K, V> {}

impl<'a, K, V> Chain<'a, K, V> {
    /// Bucket index of this chain.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in chain order (insertion order within the bucket).
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&'a K, &'a V)> + Clone + 'a {
        self.entries.iter().map(|e| (&e.key, &e.value))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Chain<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("index", &self.index)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Iterator over the entries of a [`ChainTable`].
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Vec<Entry<K, V>>>,
    chain: core::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            buckets: self.buckets.clone(),
            chain: self.chain.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            self.chain = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the entries of a [`ChainTable`] with mutable values.
pub struct IterMut<'a, K, V> {
    buckets: core::slice::IterMut<'a, Vec<Entry<K, V>>>,
    chain: core::slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &mut e.value));
            }
            self.chain = self.buckets.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}
