//! Admission control for cannon executions
//!
//! This crate decides, for every incoming execution request, whether to:
//! - return a previously recorded result (cache hit, no rate limiting)
//! - reject the request because its client exhausted the rate limit
//! - admit the request for execution and record its output afterwards
//!
//! # Overview
//!
//! ```text
//! request ─► fingerprint ─► lookup ──hit──► cached output
//!                             │
//!                            miss
//!                             ▼
//!                           admit ──denied──► RateLimited
//!                             │
//!                          allowed
//!                             ▼
//!                  (caller executes) ─► record
//! ```
//!
//! Both client windows and cached results live in a `Store` shared by all
//! workers, passed in at construction so tests can use `MemoryStore` and
//! deployments a shared backend.
//!
//! # Rate Limiting
//!
//! Each client has a sliding window of recent admission timestamps, capped at
//! `capacity` entries. The default `EvictionPolicy::Oldest` frees at most one
//! slot per call once the oldest entry is at least `window_secs` old; the
//! exact `EvictionPolicy::Expired` policy drops every stale entry first.

#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
mod error;
pub mod store;
pub mod window;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use cache::{CacheLookup, CachedResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AdmissionConfig, EvictionPolicy, StoreConfig};
pub use controller::{Admission, AdmissionController};
pub use store::{FsStore, MemoryStore, Store, open_store, result_key, window_key};
pub use window::{ClientWindow, WindowDecision};
