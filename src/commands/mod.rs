//! Command Module
//!
//! This module implements the command layer for SnapKV. A line of input is
//! parsed into a closed set of typed commands, each of which is executed
//! against the store by an explicit `match`.
//!
//! ## Architecture
//!
//! ```text
//! User input
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  parse_line     │  (parser)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (handler)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [--ttl seconds] [--set true|false]`
//! - `GET key [--field value|expires_at|raw_ttl] [--entry]`
//! - `DEL key`
//! - `TTL key`
//! - `ALL`

pub mod handler;
pub mod parser;

pub use handler::{CommandHandler, Reply};
pub use parser::{parse_line, parse_words, Command, CommandError, Parsed};

/// Help text listing every command.
pub const USAGE: &str = "\
Commands:
  SET <key> <value> [--ttl <seconds>] [--set true|false]
        Store a value. Comma-separated values become a list,
        or a set with --set true.
  GET <key> [--field value|expires_at|raw_ttl] [--entry]
        Read a value, one field, or the whole entry.
  DEL <key>
        Delete a key. Prints 1 if it existed, 0 otherwise.
  TTL <key>
        Print the TTL given at SET, -1 if none, -2 if missing.
  ALL
        List every live key.
  HELP
        Show this message.
  QUIT | EXIT
        Leave the session.";
