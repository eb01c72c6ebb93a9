//! # FlashTTL - Time-To-Live for Key-Value State
//!
//! FlashTTL is a time-to-live layer that sits transparently over a key-value
//! state store. It stamps every stored value with its write time and hides
//! expired entries on every read path, while the store itself knows nothing
//! about expiration.
//!
//! ## Features
//!
//! - **Four access modes, one filter**: single-key sync, single-key async,
//!   bulk sync iteration and bulk async paged iteration all share one
//!   liveness function
//! - **Lazy expiry**: expired entries are filtered at read time and left in
//!   the store
//! - **Bounded removal**: the sync iterator can delete the entry it just
//!   returned, and nothing else
//! - **Explicit nulls**: a live null value is never confused with an absent
//!   one
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              FlashTTL                               │
//! │                                                                     │
//! │  ┌──────────────────┐                    ┌────────────────────────┐ │
//! │  │  TtlMapState     │                    │  AsyncTtlMapState      │ │
//! │  │  + TtlEntries    │                    │  + TtlStateIterator    │ │
//! │  └────────┬─────────┘                    └───────────┬────────────┘ │
//! │           │        ┌──────────────────────┐          │              │
//! │           └───────>│ TtlContext::check    │<─────────┘              │
//! │                    │ (TtlPolicy + clock)  │                         │
//! │                    └──────────────────────┘                         │
//! │           │                                          │              │
//! │           ▼                                          ▼              │
//! │  ┌──────────────────┐                    ┌────────────────────────┐ │
//! │  │ MapState         │                    │ AsyncMapState          │ │
//! │  │ (any sync store) │                    │ (any async store)      │ │
//! │  └──────────────────┘                    └────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashttl::state::MemoryState;
//! use flashttl::ttl::{ManualClock, TtlConfig, TtlContext, TtlMapState};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(0);
//! let ctx = TtlContext::new(TtlConfig::new(Duration::from_secs(1)), clock.clone());
//! let mut state = TtlMapState::new(MemoryState::new(), ctx);
//!
//! state.put("session", Some("token")).unwrap();
//! assert!(state.contains(&"session").unwrap());
//!
//! clock.advance(Duration::from_secs(2));
//! assert!(!state.contains(&"session").unwrap());
//! assert!(state.is_empty().unwrap());
//! ```
//!
//! ## Module Overview
//!
//! - [`state`]: the store contract and an in-memory reference store
//! - [`ttl`]: timestamped values, the liveness filter, both facades and both
//!   iterators

pub mod state;
pub mod ttl;

// Re-export commonly used types for convenience
pub use state::{AsyncMapState, MapState, MemoryState, Result, StateError};
pub use ttl::{
    AsyncTtlMapState, ManualClock, SystemClock, TimestampedValue, TtlConfig, TtlContext,
    TtlMapState,
};

/// Version of FlashTTL
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
