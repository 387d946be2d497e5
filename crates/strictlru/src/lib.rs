//! # strictlru
//!
//! Fixed-capacity in-memory cache with exact least-recently-used eviction.
//!
//! ## Architecture
//! - **Arena**: entries stored in dense slots, addressed by handle
//! - **Index**: AHash map from key to handle for O(1) lookups
//! - **Recency list**: doubly linked through handles, head = most recent,
//!   tail = next to evict (O(1) reorder and eviction)
//! - **SharedLruCache**: optional mutex-guarded handle for multi-threaded hosts
//!
//! Every `get` and `put` moves the touched entry to the head; a `put` of a new
//! key into a full cache evicts the tail first, so `len() <= capacity()` holds
//! after every call.

#![warn(missing_docs)]

mod arena;
mod config;
mod error;
mod lru;
mod stats;
mod sync;

pub use config::{LruConfig, DEFAULT_CAPACITY};
pub use error::{Error, InvariantError, Result};
pub use lru::{Iter, LruCache};
pub use stats::CacheStats;
pub use sync::SharedLruCache;
