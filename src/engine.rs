//! Engine Module
//!
//! The command processor sitting between connections and the store.
//!
//! ## Responsibilities
//! - Parse argument lists into commands
//! - Execute commands against the store
//! - Map store outcomes (values, absence, `WrongType`) onto RESP replies
//! - Flush the snapshot on close

use bytes::Bytes;

use crate::config::Config;
use crate::error::{LodeError, Result};
use crate::protocol::{Command, Reply};
use crate::store::Store;

/// Command processor owning the store
///
/// ## Concurrency Model
///
/// The engine is owned by the reactor and borrowed mutably for every
/// dispatch. There is exactly one thread touching it, so it carries no
/// locks.
pub struct Engine {
    store: Store,
}

impl Engine {
    /// Open the store at the configured snapshot path
    pub fn open(config: &Config) -> Self {
        Self {
            store: Store::open(&config.snapshot_path),
        }
    }

    /// Engine over an existing store
    pub fn with_store(store: Store) -> Self {
        Self { store }
    }

    /// Engine with a memory-only store (nothing is persisted)
    pub fn in_memory() -> Self {
        Self::with_store(Store::new())
    }

    /// Parse and execute one decoded request
    pub fn dispatch(&mut self, args: Vec<Bytes>) -> Reply {
        match Command::from_args(args) {
            Ok(command) => self.execute(command),
            Err(e) => error_reply(e),
        }
    }

    /// Execute a command
    ///
    /// Routes commands to the matching store operation
    pub fn execute(&mut self, command: Command) -> Reply {
        tracing::trace!("Executing {}", command.name());

        match command {
            Command::Ping { message: None } => Reply::Status("PONG".to_string()),
            Command::Ping {
                message: Some(message),
            } => Reply::Bulk(message),
            Command::Get { key } => match self.store.get(&key) {
                Some(value) => Reply::Bulk(value.clone()),
                None => Reply::Null,
            },
            Command::Set { key, value } => {
                self.store.set(key, value);
                Reply::ok()
            }
            Command::LPush { key, values } => match self.store.lpush_many(key, values) {
                Ok(len) => Reply::Integer(len as i64),
                Err(e) => error_reply(e),
            },
            Command::LRange { key } => match self.store.lrange(&key) {
                Ok(items) => Reply::bulk_array(items),
                Err(e) => error_reply(e),
            },
            Command::Del { keys } => {
                let mut removed = 0;
                for key in &keys {
                    if self.store.del(key) {
                        removed += 1;
                    }
                }
                Reply::Integer(removed)
            }
            Command::Unknown { name } => Reply::error(format!("unknown command '{}'", name)),
        }
    }

    /// Flush the snapshot and shut the store down
    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

fn error_reply(e: LodeError) -> Reply {
    match e {
        LodeError::WrongType => Reply::wrong_type(),
        other => Reply::error(other),
    }
}
