//! Time-To-Live Layer
//!
//! This module stamps every written value with its write time and filters
//! expired entries out of every read path, without the underlying store
//! knowing anything about expiration.
//!
//! ## Architecture
//!
//! ```text
//!   TtlMapState (sync)              AsyncTtlMapState (async)
//!   get/put/.../entries()           async_get/async_put/.../async_entries()
//!        │           │                   │               │
//!        │           ▼                   │               ▼
//!        │     TtlEntries                │        TtlStateIterator
//!        │     (lookahead,               │        (paged, on_next /
//!        │      remove_current)          │         for_each)
//!        │           │                   │               │
//!        └───────────┴───────┬───────────┴───────────────┘
//!                            ▼
//!                   TtlContext::check  (one liveness filter)
//!                            │
//!                 TtlPolicy + TimeProvider
//! ```
//!
//! ## Lazy Expiry Only
//!
//! Expired entries are never deleted here. They stay in the store until they
//! are overwritten, removed, or cleaned up by something outside this layer.

pub mod async_map;
pub mod config;
pub mod iter;
pub mod map;
pub mod paged;
pub mod value;

pub use async_map::{AsyncEntriesIter, AsyncTtlMapState};
pub use config::{ManualClock, SystemClock, TimeProvider, Timestamp, TtlConfig, TtlPolicy};
pub use iter::{Projection, TtlEntries};
pub use map::{EntriesIter, TtlMapState};
pub use paged::TtlStateIterator;
pub use value::{check, TimestampedValue, TtlContext};
