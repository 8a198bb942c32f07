use thiserror::Error;

/// Errors raised while constructing a [`ChainTable`](crate::ChainTable).
///
/// Lookups never fail; a missing key is reported as `None`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    #[error("bucket count must be at least 1")]
    ZeroBuckets,
}
