//! Session Module
//!
//! This module runs the interactive command loop. A session reads lines from
//! any async reader (stdin in the binary, byte slices or mocks in tests),
//! executes them through the [`CommandHandler`](crate::commands::CommandHandler)
//! and writes one reply per command. The binary reads stdin through a
//! [`ThreadReader`] so an interrupted session never waits on a pending read.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Session                              │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Split lines │───>│ Parse line  │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │  ┌─────────────┐                      ┌─────────────┐      │
//! │  │ Write reply │<─────────────────────│ spawn_block │      │
//! │  └─────────────┘                      │  execute()  │      │
//! │                                       └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use snapkv::commands::CommandHandler;
//! use snapkv::session::{Session, SessionStats, ThreadReader};
//! use snapkv::storage::Store;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::open("snapkv_state.json"));
//! let handler = CommandHandler::new(store);
//! let stats = Arc::new(SessionStats::new());
//!
//! let stdin = ThreadReader::stdin()?;
//! let mut session = Session::new(stdin, tokio::io::stdout(), handler, stats)
//!     .with_prompt("-> ");
//! session.run().await?;
//! ```

pub mod handler;
pub mod input;

pub use handler::{Session, SessionError, SessionStats};
pub use input::ThreadReader;
