//! Command Handler
//!
//! Executes parsed [`Command`]s against the shared [`Store`] and turns the
//! outcome into a [`Reply`]. Store errors become error replies; nothing here
//! panics or propagates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   Command   │───>│  execute()  │───>│    Reply    │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                       Arc<Store>                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::parser::Command;
use crate::storage::{Entry, Field, FieldValue, Store, StoreError, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// The outcome of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The write was accepted
    Ok,
    /// The key (or field) is absent
    Nil,
    /// An integer result (DEL count, TTL, raw TTL, expiry timestamp)
    Integer(i64),
    /// A stored value
    Value(Value),
    /// A whole entry
    Entry(Entry),
    /// All live entries, sorted by key
    Entries(Vec<(String, Entry)>),
    /// The command failed
    Error(String),
}

impl Reply {
    /// Creates an error reply.
    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    /// Returns true if this is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<FieldValue> for Reply {
    fn from(field: FieldValue) -> Self {
        match field {
            FieldValue::Value(value) => Reply::Value(value),
            FieldValue::ExpiresAt(Some(at)) => Reply::Integer(unix_secs(at)),
            FieldValue::RawTtl(Some(secs)) => {
                Reply::Integer(i64::try_from(secs).unwrap_or(i64::MAX))
            }
            FieldValue::ExpiresAt(None) | FieldValue::RawTtl(None) => Reply::Nil,
        }
    }
}

fn unix_secs(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

/// Renders an entry on one line.
struct EntryLine<'a>(&'a Entry);

impl fmt::Display for EntryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0;
        write!(f, "value={} type={}", entry.value, entry.value.type_name())?;
        match entry.raw_ttl {
            Some(ttl) => write!(f, " ttl={}", ttl)?,
            None => write!(f, " ttl=none")?,
        }
        match entry.expires_at {
            Some(at) => write!(f, " expires_at={}", unix_secs(at)),
            None => write!(f, " expires_at=never"),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Value(value) => write!(f, "{}", value),
            Reply::Entry(entry) => write!(f, "{}", EntryLine(entry)),
            Reply::Entries(entries) if entries.is_empty() => write!(f, "(empty)"),
            Reply::Entries(entries) => {
                for (i, (key, entry)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}: {}", i + 1, key, EntryLine(entry))?;
                }
                Ok(())
            }
            Reply::Error(msg) => write!(f, "(error) {}", msg),
        }
    }
}

/// Dispatches commands to the store.
///
/// Cloning is cheap; every clone shares the same store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Executes a command and returns the reply.
    ///
    /// This may block on the store lock and on snapshot I/O.
    pub fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Set { key, value, ttl } => self.cmd_set(key, value, ttl),
            Command::Get {
                key,
                field,
                just_value,
            } => self.cmd_get(&key, field, just_value),
            Command::Del { key } => self.cmd_del(&key),
            Command::Ttl { key } => Reply::Integer(self.store.ttl(&key)),
            Command::All => self.cmd_all(),
        }
    }

    /// SET key value [--ttl seconds]
    fn cmd_set(&self, key: String, value: Value, ttl: Option<String>) -> Reply {
        let result = match ttl {
            Some(ttl) => self.store.set_with_ttl(key, value, ttl),
            None => self.store.set(key, value),
        };

        match result {
            Ok(_) => Reply::Ok,
            Err(e) => store_error(e),
        }
    }

    /// GET key [--field name] [--entry]
    fn cmd_get(&self, key: &str, field: Field, just_value: bool) -> Reply {
        if !just_value {
            return self.store.get_entry(key).map_or(Reply::Nil, Reply::Entry);
        }

        match field {
            Field::Value => self.store.get(key).map_or(Reply::Nil, Reply::Value),
            _ => self.store.get_field(key, field).map_or(Reply::Nil, Reply::from),
        }
    }

    /// DEL key
    fn cmd_del(&self, key: &str) -> Reply {
        match self.store.delete(key) {
            Ok(removed) => Reply::Integer(removed as i64),
            Err(e) => store_error(e),
        }
    }

    /// ALL
    fn cmd_all(&self) -> Reply {
        let mut entries: Vec<(String, Entry)> = self.store.all().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Reply::Entries(entries)
    }
}

fn store_error(e: StoreError) -> Reply {
    if !matches!(e, StoreError::InvalidTtl(_)) {
        warn!(error = %e, "Store operation failed");
    }
    Reply::error(e.to_string())
}
