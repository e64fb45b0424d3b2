//! Storage Module
//!
//! This module provides the core storage functionality for SnapKV: a
//! thread-safe key-value store with TTL expiry and write-through snapshot
//! persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │   Mutex<HashMap<String, Entry>>        Arc<dyn Clock>       │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ set / delete
//!                            ▼
//!              ┌───────────────────────────┐
//!              │  snapshot::save           │
//!              │  (temp file + rename)     │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Single Lock**: every operation runs under one mutex
//! - **Typed Values**: strings, lists and sets
//! - **TTL Support**: keys can expire; the TTL given is kept for introspection
//! - **Lazy Expiry**: expired keys are removed when read
//! - **Snapshots**: every mutation rewrites the snapshot atomically
//!
//! ## Example
//!
//! ```
//! use snapkv::storage::{ManualClock, Store, Value};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let clock = Arc::new(ManualClock::new());
//! let store = Store::open_with_clock(dir.path().join("state.json"), clock.clone());
//!
//! store.set_with_ttl("session", "token123", 60).unwrap();
//! assert_eq!(store.get("session"), Some(Value::from("token123")));
//!
//! clock.advance(Duration::from_secs(61));
//! assert_eq!(store.get("session"), None);
//! ```

pub mod clock;
pub mod engine;
pub mod entry;
pub mod error;
pub mod snapshot;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Status, Store, StoreStats, TTL_MISSING, TTL_PERSISTENT};
pub use entry::{Entry, Field, FieldValue, IntoTtl, UnknownField, Value};
pub use error::{StoreError, StoreResult};
pub use snapshot::DEFAULT_SNAPSHOT_PATH;
