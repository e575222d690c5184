//! # LodeKV
//!
//! A small Redis-style key-value server with:
//! - A single-threaded, readiness-driven event loop (mio)
//! - An incremental, binary-safe RESP request parser
//! - A skip list as the ordered in-memory map
//! - String and list values
//! - Text snapshots loaded at startup and written at shutdown
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Reactor (mio::Poll)                       │
//! │        listener + Token → Connection registry + idle sweep   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │               Connection / RequestParser                     │
//! │     *N → $len → body  (whole units only, any fragmentation)  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Vec<Bytes>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine (command processor)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Store    │ ───────▶ │  SkipList   │
//!   │ (Object)    │          │  (arena)    │
//!   └──────┬──────┘          └─────────────┘
//!          ▼
//!   ┌─────────────┐
//!   │  Snapshot   │
//!   │   (text)    │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod skiplist;
pub mod store;
pub mod protocol;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LodeError, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::{Object, Store};
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LodeKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
