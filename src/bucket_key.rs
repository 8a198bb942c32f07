//! Bucket-index strategies for [`ChainTable`](crate::ChainTable).
//!
//! A table never inspects key types at runtime. Instead it is built with a
//! strategy `S: BucketHasher<K>` that maps a key to a bucket index in
//! `0..buckets`. Two strategies are provided:
//!
//! - [`Natural`] (default) delegates to [`BucketKey`]: text keys use the sum
//!   of their character codes, integers use their Euclidean remainder.
//!   Indices are deterministic across runs and processes.
//! - [`Hashed`] reduces a `BuildHasher` hash, for key types that only
//!   implement `Hash`.

use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use std::collections::hash_map::RandomState;

/// A key that produces a stable, non-negative bucket index by itself.
///
/// Implementations must return a value in `0..buckets` and must return the
/// same value for equal keys. Keys that can be looked up through `Borrow`
/// (e.g. `String` and `str`) must agree with their borrowed form.
pub trait BucketKey {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize;
}

impl BucketKey for str {
    /// Sum of the Unicode scalar values, modulo `buckets`.
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        let n = buckets.get() as u128;
        self.chars()
            .fold(0u128, |acc, c| (acc + u128::from(u32::from(c))) % n) as usize
    }
}

impl BucketKey for String {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        self.as_str().bucket_index(buckets)
    }
}

impl BucketKey for char {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        (u32::from(*self) as usize) % buckets.get()
    }
}

impl<T: BucketKey + ?Sized> BucketKey for &T {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        (**self).bucket_index(buckets)
    }
}

impl<T: BucketKey + ?Sized> BucketKey for Box<T> {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        (**self).bucket_index(buckets)
    }
}

macro_rules! unsigned_bucket_key {
    ($($t:ty),*) => {$(
        impl BucketKey for $t {
            fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
                (*self as u128 % buckets.get() as u128) as usize
            }
        }
    )*};
}

// Negative keys wrap to the top of the range, so -1 lands in the last bucket.
macro_rules! signed_bucket_key {
    ($($t:ty),*) => {$(
        impl BucketKey for $t {
            fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
                (*self as i128).rem_euclid(buckets.get() as i128) as usize
            }
        }
    )*};
}

unsigned_bucket_key!(u8, u16, u32, u64, u128, usize);
signed_bucket_key!(i8, i16, i32, i64, isize);

impl BucketKey for i128 {
    fn bucket_index(&self, buckets: NonZeroUsize) -> usize {
        // i128 cannot represent every usize on 128-bit targets; go through
        // the unsigned remainder of the magnitude instead.
        let n = buckets.get() as u128;
        let r = self.unsigned_abs() % n;
        if *self < 0 && r != 0 {
            (n - r) as usize
        } else {
            r as usize
        }
    }
}

/// Strategy that maps a query of type `Q` to a bucket.
pub trait BucketHasher<Q: ?Sized> {
    fn bucket_of(&self, key: &Q, buckets: NonZeroUsize) -> usize;
}

/// Default strategy: the key's own [`BucketKey`] index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<Q: BucketKey + ?Sized> BucketHasher<Q> for Natural {
    #[inline]
    fn bucket_of(&self, key: &Q, buckets: NonZeroUsize) -> usize {
        key.bucket_index(buckets)
    }
}

/// Strategy that reduces a `BuildHasher` hash modulo the bucket count.
#[derive(Clone, Debug, Default)]
pub struct Hashed<S = RandomState>(S);

impl<S> Hashed<S> {
    pub fn new(build_hasher: S) -> Self {
        Hashed(build_hasher)
    }
}

impl<Q, S> BucketHasher<Q> for Hashed<S>
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn bucket_of(&self, key: &Q, buckets: NonZeroUsize) -> usize {
        (self.0.hash_one(key) % buckets.get() as u64) as usize
    }
}
