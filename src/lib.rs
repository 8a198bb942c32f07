//! bucket-graph: a fixed-size separate-chaining hash table and a directed
//! graph with two-way adjacency, both for single-threaded use.
//!
//! Internal Design:
//!
//! Summary
//! - Two independent structures sharing only ambient pieces (config,
//!   errors, the debug reentrancy check):
//!   - ChainTable<K, V, S>: `bucket_count` owned chains; a key lives in the
//!     chain its strategy `S` selects and appears there at most once.
//!   - DiGraph<V, S>: vertices in a slot map behind a hash index, each
//!     owning ordered outgoing and incoming neighbour lists.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` through the embedded reentrancy check.
//! - No resizing: a ChainTable's bucket count is fixed at construction;
//!   chains grow instead. Zero buckets is rejected.
//! - No removal of table entries or graph vertices. Edges can be removed.
//! - Lookups never fail: a miss is `None`, an empty neighbour list, or
//!   `false`.
//!
//! Bucket selection
//! - Keys are mapped to buckets by a strategy bound at construction
//!   (`BucketHasher`), never by inspecting key types at runtime. The
//!   default `Natural` strategy uses the key's own `BucketKey` index: the
//!   sum of character codes for text, the Euclidean remainder for integers.
//!   `Hashed<S>` reduces a `BuildHasher` hash for other key types.
//!
//! Counting
//! - `ChainTable::len` counts distinct keys. `ChainTable::insert_calls`
//!   counts every `insert`, overwrites included.
//!
//! Graph symmetry
//! - Edge `u -> v` exists iff `v` is in `u`'s outgoing list and `u` is in
//!   `v`'s incoming list. Every edge mutation updates both lists.
//! - Each vertex stores its precomputed hash; growing the index never calls
//!   `V: Hash` again.
//!
//! Reentrancy policy
//! - Public entry points that call user code (`Eq`, `Hash`, `BucketKey`)
//!   mark the structure busy for their duration. Nested entry panics in
//!   debug builds and costs nothing in release builds.
//!
//! Logging
//! - Events go through `tracing`: `debug` on construction, `trace` per
//!   mutation. The crate never installs a subscriber.

pub mod bucket_key;
pub mod chain_table;
mod chain_table_proptest;
pub mod config;
pub mod digraph;
mod error;
mod reentry;

// Public surface
pub use bucket_key::{BucketHasher, BucketKey, Hashed, Natural};
pub use chain_table::ChainTable;
pub use config::TableConfig;
pub use digraph::{DiGraph, VertexId};
pub use error::TableError;
