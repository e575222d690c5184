//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One thread, one `mio::Poll`
//! - Listener and every client registered under their own token
//! - Bounded poll wait so idle connections are reaped without traffic
//! - Per-turn read budget; budget-limited sockets are requeued, not starved
//! - Requests stop executing while a client's unread output is backed up
//! - Commands routed through the Engine owned by the server

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, Progress, OUTPUT_HIGH_WATER, READ_BUDGET};
