//! Protocol codec
//!
//! Incremental request parser plus the client-side helpers for encoding
//! requests and decoding replies.
//!
//! ## Request State Machine
//! ```text
//!                 ┌───────────────────────┐
//!        ┌──────▶ │ AwaitingArrayHeader   │  "*<n>\r\n"
//!        │        └───────────┬───────────┘
//!        │                    ▼
//!        │        ┌───────────────────────┐
//!        │        │ AwaitingBulkHeader    │ ◀──┐  "$<len>\r\n"
//!        │        └───────────┬───────────┘    │
//!        │                    ▼                │
//!        │        ┌───────────────────────┐    │
//!        └─────── │ AwaitingBulkBody      │ ───┘  "<payload>\r\n"
//!   last argument └───────────────────────┘  more arguments
//! ```
//!
//! Each state consumes only whole units. If the unit is not fully buffered
//! the parser stops and leaves the buffer untouched, so input may arrive in
//! arbitrarily small fragments.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{LodeError, Result};
use super::Reply;

/// Maximum arguments in a single request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Maximum length of a single bulk argument (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Longest header line tolerated before a CRLF is seen
pub const MAX_INLINE_LEN: usize = 64 * 1024;

/// Most buffer space reserved ahead of a bulk body; the rest grows as bytes arrive
const BODY_RESERVE: usize = 64 * 1024;

/// Parser position within a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingArrayHeader,
    AwaitingBulkHeader,
    AwaitingBulkBody,
}

/// Per-connection incremental request parser
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,

    /// Arguments still expected for the current request
    remaining: usize,

    /// Byte length of the next bulk body
    bulk_len: usize,

    /// Arguments collected so far
    args: Vec<Bytes>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::AwaitingArrayHeader,
            remaining: 0,
            bulk_len: 0,
            args: Vec::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Consume from `buf` until one request is complete
    ///
    /// Returns `Ok(None)` when more input is needed. Header lines with the
    /// wrong prefix or an unusable count are discarded; only limit
    /// violations are errors.
    pub fn next_command(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
        loop {
            match self.state {
                ParseState::AwaitingArrayHeader => {
                    let Some(line) = take_line(buf)? else {
                        return Ok(None);
                    };
                    match parse_header(&line, b'*') {
                        Some(n) if n > 0 => {
                            let n = n as usize;
                            if n > MAX_ARGS {
                                return Err(LodeError::Protocol(format!(
                                    "too many arguments: {} (max {})",
                                    n, MAX_ARGS
                                )));
                            }
                            self.args = Vec::with_capacity(n.min(16));
                            self.remaining = n;
                            self.state = ParseState::AwaitingBulkHeader;
                        }
                        _ => discard(&line),
                    }
                }
                ParseState::AwaitingBulkHeader => {
                    let Some(line) = take_line(buf)? else {
                        return Ok(None);
                    };
                    match parse_header(&line, b'$') {
                        Some(len) if len >= 0 => {
                            let len = len as usize;
                            if len > MAX_BULK_LEN {
                                return Err(LodeError::Protocol(format!(
                                    "bulk length {} exceeds {}",
                                    len, MAX_BULK_LEN
                                )));
                            }
                            self.bulk_len = len;
                            self.state = ParseState::AwaitingBulkBody;
                        }
                        _ => discard(&line),
                    }
                }
                ParseState::AwaitingBulkBody => {
                    if buf.len() < self.bulk_len + 2 {
                        buf.reserve((self.bulk_len + 2 - buf.len()).min(BODY_RESERVE));
                        return Ok(None);
                    }
                    let arg = buf.split_to(self.bulk_len).freeze();
                    buf.advance(2);
                    self.args.push(arg);
                    self.remaining -= 1;

                    if self.remaining == 0 {
                        self.state = ParseState::AwaitingArrayHeader;
                        return Ok(Some(std::mem::take(&mut self.args)));
                    }
                    self.state = ParseState::AwaitingBulkHeader;
                }
            }
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split one CRLF-terminated line off the front of `buf` (CRLF dropped)
fn take_line(buf: &mut BytesMut) -> Result<Option<BytesMut>> {
    match find_crlf(buf) {
        Some(end) => {
            let line = buf.split_to(end);
            buf.advance(2);
            Ok(Some(line))
        }
        None if buf.len() > MAX_INLINE_LEN => Err(LodeError::Protocol(format!(
            "header line longer than {} bytes",
            MAX_INLINE_LEN
        ))),
        None => Ok(None),
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Decode `<prefix><integer>`; None on a wrong prefix or bad integer
fn parse_header(line: &[u8], prefix: u8) -> Option<i64> {
    let (&first, digits) = line.split_first()?;
    if first != prefix {
        return None;
    }
    parse_int(digits)
}

fn parse_int(digits: &[u8]) -> Option<i64> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn discard(line: &[u8]) {
    tracing::trace!(
        "Discarding malformed header line: {:?}",
        String::from_utf8_lossy(line)
    );
}

// =============================================================================
// Client-side helpers
// =============================================================================

/// Encode an argument list as a RESP request
pub fn encode_request<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        let arg = arg.as_ref();
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Decode one reply from the front of `src`
///
/// Returns the reply and the number of bytes it occupied, or `Ok(None)` if
/// `src` does not yet hold a complete reply.
pub fn decode_reply(src: &[u8]) -> Result<Option<(Reply, usize)>> {
    let mut pos = 0;
    Ok(decode_at(src, &mut pos)?.map(|reply| (reply, pos)))
}

fn decode_at(src: &[u8], pos: &mut usize) -> Result<Option<Reply>> {
    let rest = &src[*pos..];
    let Some(end) = find_crlf(rest) else {
        return Ok(None);
    };
    let line = &rest[..end];
    *pos += end + 2;

    let (&kind, body) = line
        .split_first()
        .ok_or_else(|| LodeError::Protocol("empty reply line".to_string()))?;
    let text = || String::from_utf8_lossy(body).into_owned();
    let int = || {
        parse_int(body).ok_or_else(|| {
            LodeError::Protocol(format!("invalid integer in reply: {:?}", text()))
        })
    };

    let reply = match kind {
        b'+' => Reply::Status(text()),
        b'-' => Reply::Error(text()),
        b':' => Reply::Integer(int()?),
        b'$' => {
            let len = int()?;
            if len < 0 {
                return Ok(Some(Reply::Null));
            }
            let end = usize::try_from(len)
                .ok()
                .filter(|&len| len <= MAX_BULK_LEN)
                .and_then(|len| pos.checked_add(len))
                .ok_or_else(|| {
                    LodeError::Protocol(format!("bulk length {} out of range", len))
                })?;
            if src.len() < end + 2 {
                return Ok(None);
            }
            let data = Bytes::copy_from_slice(&src[*pos..end]);
            *pos = end + 2;
            Reply::Bulk(data)
        }
        b'*' => {
            let count = int()?;
            if count < 0 {
                return Ok(Some(Reply::Null));
            }
            let count = usize::try_from(count).map_err(|_| {
                LodeError::Protocol(format!("array length {} out of range", count))
            })?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                match decode_at(src, pos)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Reply::Array(items)
        }
        other => {
            return Err(LodeError::Protocol(format!(
                "unknown reply type byte 0x{:02x}",
                other
            )))
        }
    };

    Ok(Some(reply))
}
