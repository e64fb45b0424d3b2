//! Thread-Safe Store with Expiry and Snapshots
//!
//! This module implements the core store for SnapKV: a `HashMap` of
//! [`Entry`] records behind a single mutex, with time-based expiry and a full
//! snapshot written on every mutation.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: Every operation holds the same `Mutex` for its whole body,
//!    including the snapshot write. No torn reads, no lost updates.
//! 2. **Lazy Expiry**: Expired keys stay in the map until a `get` (or `ttl`)
//!    touches them. `all` filters them out without removing them.
//! 3. **Write-Through Snapshots**: `set` and `delete` persist before returning.
//!    If the snapshot fails the in-memory change is undone and the error is
//!    returned, so memory and disk never disagree about an acknowledged write.
//! 4. **Injected Clock**: Time comes from a [`Clock`] so expiry is testable
//!    without sleeping.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ caller 1 │ │ caller 2 │ │ caller N │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      └────────────┼────────────┘
//!                   ▼
//!        ┌─────────────────────┐
//!        │  Mutex<HashMap>     │──── snapshot::save (under the lock)
//!        └─────────────────────┘
//! ```

use crate::storage::clock::{Clock, SystemClock};
use crate::storage::entry::{Entry, Field, FieldValue, IntoTtl, Value};
use crate::storage::error::StoreResult;
use crate::storage::snapshot;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// TTL reported for a key that does not exist or has expired.
pub const TTL_MISSING: i64 = -2;

/// TTL reported for a key that exists without an expiry.
pub const TTL_PERSISTENT: i64 = -1;

/// Acknowledgement returned by a successful `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
        }
    }
}

/// The key-value store.
///
/// One instance exists per process. It is created by the entry point,
/// wrapped in an `Arc`, and handed to everything that needs it.
///
/// # Example
///
/// ```
/// use snapkv::storage::{Store, Value};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = Store::open(dir.path().join("state.json"));
///
/// store.set("name", "Ariz").unwrap();
/// assert_eq!(store.get("name"), Some(Value::from("Ariz")));
///
/// store.set_with_ttl("session", "abc123", 60).unwrap();
/// assert_eq!(store.ttl("session"), 60);
/// assert_eq!(store.ttl("missing"), -2);
/// ```
pub struct Store {
    /// All entries, guarded by the one lock
    entries: Mutex<HashMap<String, Entry>>,

    /// Source of "now" for expiry checks
    clock: Arc<dyn Clock>,

    /// Where snapshots are written
    snapshot_path: PathBuf,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total successful SET operations
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,

    /// Statistics: keys removed by lazy expiry
    expired_count: AtomicU64,

    /// Statistics: snapshots written
    snapshot_count: AtomicU64,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("snapshot_path", &self.snapshot_path)
            .field("keys", &self.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl Store {
    /// Opens a store backed by the snapshot at `path`, using the system clock.
    ///
    /// Any existing snapshot is loaded. A missing or unreadable snapshot
    /// yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Opens a store backed by the snapshot at `path` with a custom clock.
    pub fn open_with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let snapshot_path = path.into();
        let entries = snapshot::load(&snapshot_path);

        Self {
            entries: Mutex::new(entries),
            clock,
            snapshot_path,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
            snapshot_count: AtomicU64::new(0),
        }
    }

    /// Acquires the lock.
    ///
    /// Mutations roll back before any error leaves the critical section, so
    /// the map is consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the snapshot. Must be called with the lock held.
    fn persist(&self, entries: &HashMap<String, Entry>) -> StoreResult<()> {
        snapshot::save(entries, &self.snapshot_path)?;
        self.snapshot_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Sets a key to a value that never expires.
    ///
    /// Any existing entry is replaced wholesale.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> StoreResult<Status> {
        self.insert(key.into(), |_| Ok(Entry::new(value.into())))
    }

    /// Sets a key to a value that expires `ttl` seconds from now.
    ///
    /// `ttl` may be an integer or a string. If it is not a non-negative
    /// integer the call fails with `InvalidTtl` and the existing entry for
    /// `key`, if any, is left alone. A TTL of `0` means no expiry, exactly
    /// like [`set`](Self::set).
    pub fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: impl IntoTtl,
    ) -> StoreResult<Status> {
        let ttl_secs = ttl.into_ttl_secs()?;
        let value = value.into();
        if ttl_secs == 0 {
            return self.insert(key.into(), |_| Ok(Entry::new(value)));
        }
        self.insert(key.into(), |now| Entry::with_ttl(value, ttl_secs, now))
    }

    fn insert(
        &self,
        key: String,
        make_entry: impl FnOnce(std::time::SystemTime) -> StoreResult<Entry>,
    ) -> StoreResult<Status> {
        let mut entries = self.lock();
        let entry = make_entry(self.clock.now())?;
        let expires = entry.has_ttl();

        let previous = entries.insert(key.clone(), entry);
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(previous) => entries.insert(key, previous),
                None => entries.remove(&key),
            };
            return Err(e);
        }

        self.set_count.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, expires, "Key set");
        Ok(Status::Ok)
    }

    /// Runs `read` on the live entry for `key`.
    ///
    /// This is where lazy expiry happens: an expired entry is removed from
    /// the map (without writing a snapshot) and the key is reported absent.
    fn lookup<T>(&self, key: &str, read: impl FnOnce(&Entry) -> T) -> Option<T> {
        let mut entries = self.lock();
        let now = self.clock.now();

        match entries.get(key) {
            None => None,
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Expired key removed on access");
                None
            }
            Some(entry) => Some(read(entry)),
        }
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, |entry| entry.value.clone())
    }

    /// Gets one field of the entry for a key.
    pub fn get_field(&self, key: &str, field: Field) -> Option<FieldValue> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, |entry| entry.field(field))
    }

    /// Gets the full entry for a key (value plus expiry metadata).
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, Entry::clone)
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// `1` if the key was removed, `0` if it wasn't there. A removal is
    /// persisted before returning; if that fails the entry is restored.
    pub fn delete(&self, key: &str) -> StoreResult<u64> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.lock();
        let Some(removed) = entries.remove(key) else {
            trace!(key = %key, "Delete of missing key");
            return Ok(0);
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), removed);
            return Err(e);
        }

        debug!(key = %key, "Key deleted");
        Ok(1)
    }

    /// Gets the TTL of a key.
    ///
    /// # Returns
    ///
    /// - the TTL in seconds exactly as it was given to `set_with_ttl`
    /// - `-1` if the key exists but has no expiry
    /// - `-2` if the key doesn't exist or has expired
    ///
    /// Shares the lookup path of [`get_entry`](Self::get_entry), so an
    /// expired key is removed here too. Never writes a snapshot.
    pub fn ttl(&self, key: &str) -> i64 {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        match self.lookup(key, |entry| entry.raw_ttl.filter(|_| entry.has_ttl())) {
            None => TTL_MISSING,
            Some(None) => TTL_PERSISTENT,
            Some(Some(secs)) => i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }

    /// Returns every entry that has not expired.
    ///
    /// This is a pure read: expired entries are skipped, not removed.
    pub fn all(&self) -> HashMap<String, Entry> {
        let entries = self.lock();
        let now = self.clock.now();

        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Writes the current mapping to `path` instead of the configured file.
    pub fn snapshot_to(&self, path: &Path) -> StoreResult<()> {
        let entries = self.lock();
        snapshot::save(&entries, path)?;
        self.snapshot_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the path snapshots are written to.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Returns the number of entries physically held, including expired
    /// entries that have not been touched yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
            snapshots: self.snapshot_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of entries currently held
    pub keys: u64,
    /// Total read operations (`get`, `get_field`, `get_entry` and `ttl`)
    pub get_ops: u64,
    /// Total successful SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Keys removed by lazy expiry
    pub expired: u64,
    /// Snapshots written
    pub snapshots: u64,
}
