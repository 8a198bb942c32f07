//! Construction options for [`ChainTable`](crate::ChainTable).

use crate::error::TableError;
use core::num::NonZeroUsize;

/// Bucket count used by [`ChainTable::new`](crate::ChainTable::new).
pub const DEFAULT_BUCKETS: usize = 10;

/// Sizing options for a chain table. The bucket count is fixed for the
/// lifetime of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// Number of buckets; must be at least 1.
    pub buckets: usize,
    /// Capacity reserved up front in every chain.
    pub chain_capacity: usize,
}

impl TableConfig {
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets,
            chain_capacity: 0,
        }
    }

    pub fn buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn chain_capacity(mut self, capacity: usize) -> Self {
        self.chain_capacity = capacity;
        self
    }

    /// Validated bucket count.
    pub fn bucket_count(&self) -> Result<NonZeroUsize, TableError> {
        NonZeroUsize::new(self.buckets).ok_or(TableError::ZeroBuckets)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS)
    }
}
