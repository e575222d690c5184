//! Protocol Module
//!
//! Defines the RESP wire protocol for client-server communication.
//!
//! ## Request Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<payload>\r\n      (repeated argc times)
//! ```
//!
//! ## Reply Format
//! ```text
//! +<text>\r\n                  status
//! -ERR <msg>\r\n               error
//! -WRONGTYPE <msg>\r\n         type error
//! :<int>\r\n                   integer
//! $<len>\r\n<payload>\r\n      bulk string
//! $-1\r\n                      null bulk
//! *<count>\r\n...              array
//! ```
//!
//! ## Commands
//! - `SET key value`
//! - `GET key`
//! - `PING [message]`
//! - `LPUSH key value [value ...]`
//! - `LRANGE key [start] [stop]` (bounds accepted, not applied)
//! - `DEL key [key ...]`

mod command;
mod response;
mod codec;

pub use command::Command;
pub use response::Reply;
pub use codec::{
    decode_reply, encode_request, ParseState, RequestParser, MAX_ARGS, MAX_BULK_LEN,
    MAX_INLINE_LEN,
};
