//! # SnapKV - An In-Process Key-Value Store with TTL and Snapshots
//!
//! SnapKV emulates a small subset of a TTL-capable cache server inside one
//! process: set/get/delete, TTL introspection, bulk listing, and a snapshot
//! file rewritten atomically after every mutation.
//!
//! ## Features
//!
//! - **Typed Values**: strings, ordered lists and unique sets
//! - **TTL Support**: keys can expire; the TTL given at write time is kept
//! - **Lazy Expiry**: expired keys disappear from reads and are removed when touched
//! - **Thread Safety**: one mutex serializes every operation
//! - **Durability**: every `set`/`delete` rewrites the snapshot (temp file + rename)
//! - **Deterministic Time**: the clock is injectable for tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SnapKV                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Session    │───>│   Parser    │───>│  Command    │                  │
//! │  │ (stdin loop)│    │             │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │ Arc<Store>              │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │                   Store                      │    │
//! │                     │   Mutex<HashMap<String, Entry>>  +  Clock    │    │
//! │                     └──────────────────────┬───────────────────────┘    │
//! │                                            │ set / delete               │
//! │                                            ▼                            │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │        Snapshot file (JSON, atomic)          │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use snapkv::storage::{Store, Value};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//!
//! // One store per process, shared by handle
//! let store = Arc::new(Store::open(dir.path().join("state.json")));
//!
//! store.set("name", "Ariz").unwrap();
//! store.set_with_ttl("session", "abc123", 3600).unwrap();
//!
//! assert_eq!(store.get("name"), Some(Value::from("Ariz")));
//! assert_eq!(store.ttl("session"), 3600);
//! assert_eq!(store.delete("name").unwrap(), 1);
//! assert_eq!(store.all().len(), 1);
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the store, entries, clock and snapshot persistence
//! - [`commands`]: command parsing and dispatch
//! - [`session`]: the interactive read-execute-respond loop
//! - [`config`]: command-line configuration for the binary

pub mod commands;
pub mod config;
pub mod session;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{parse_line, Command, CommandError, CommandHandler, Reply};
pub use config::{Action, Config, ConfigError};
pub use session::{Session, SessionError, SessionStats, ThreadReader};
pub use storage::{
    Clock, Entry, ManualClock, Status, Store, StoreError, SystemClock, Value,
    DEFAULT_SNAPSHOT_PATH,
};

/// Version of SnapKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
