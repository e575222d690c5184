//! Command definitions
//!
//! Turns a decoded argument list into a typed command.

use bytes::Bytes;

use crate::error::{LodeError, Result};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health check, optionally echoing a message
    Ping { message: Option<Bytes> },

    /// Get a string value by key
    Get { key: Bytes },

    /// Set a string value
    Set { key: Bytes, value: Bytes },

    /// Append values to a list
    LPush { key: Bytes, values: Vec<Bytes> },

    /// Read a whole list (range bounds are accepted and ignored)
    LRange { key: Bytes },

    /// Remove keys of any type
    Del { keys: Vec<Bytes> },

    /// Anything else; carries the name as sent
    Unknown { name: String },
}

impl Command {
    /// Parse an argument list; the command name is matched case-insensitively
    pub fn from_args(args: Vec<Bytes>) -> Result<Command> {
        let mut args = args.into_iter();
        let name = args
            .next()
            .ok_or_else(|| LodeError::Protocol("empty command".to_string()))?;
        let rest: Vec<Bytes> = args.collect();

        let command = match name.to_ascii_uppercase().as_slice() {
            b"PING" if rest.is_empty() => Command::Ping { message: None },
            b"PING" => {
                let [message] = exact::<1>("ping", rest)?;
                Command::Ping {
                    message: Some(message),
                }
            }
            b"GET" => {
                let [key] = exact::<1>("get", rest)?;
                Command::Get { key }
            }
            b"SET" => {
                let [key, value] = exact::<2>("set", rest)?;
                Command::Set { key, value }
            }
            b"LPUSH" => {
                if rest.len() < 2 {
                    return Err(arity("lpush"));
                }
                let mut values = rest;
                let key = values.remove(0);
                Command::LPush { key, values }
            }
            b"LRANGE" => {
                // start/stop may follow the key; they are not applied
                if rest.is_empty() || rest.len() > 3 {
                    return Err(arity("lrange"));
                }
                let mut rest = rest;
                Command::LRange {
                    key: rest.swap_remove(0),
                }
            }
            b"DEL" => {
                if rest.is_empty() {
                    return Err(arity("del"));
                }
                Command::Del { keys: rest }
            }
            _ => Command::Unknown {
                name: String::from_utf8_lossy(&name).into_owned(),
            },
        };

        Ok(command)
    }

    /// Lowercase command name, for logs
    pub fn name(&self) -> &str {
        match self {
            Command::Ping { .. } => "ping",
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::LPush { .. } => "lpush",
            Command::LRange { .. } => "lrange",
            Command::Del { .. } => "del",
            Command::Unknown { name } => name,
        }
    }
}

fn exact<const N: usize>(command: &str, rest: Vec<Bytes>) -> Result<[Bytes; N]> {
    <[Bytes; N]>::try_from(rest).map_err(|_| arity(command))
}

fn arity(command: &str) -> LodeError {
    LodeError::WrongArity(command.to_string())
}
