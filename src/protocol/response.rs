//! Reply definitions
//!
//! Represents replies sent to clients.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// A RESP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+text`
    Status(String),

    /// `-text`; the text carries its own prefix word (`ERR`, `WRONGTYPE`)
    Error(String),

    /// `:n`
    Integer(i64),

    /// `$len` + payload
    Bulk(Bytes),

    /// `$-1`
    Null,

    /// `*count` + items
    Array(Vec<Reply>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// Generic `-ERR <msg>` error
    pub fn error(message: impl fmt::Display) -> Self {
        Reply::Error(format!("ERR {}", message))
    }

    /// `-WRONGTYPE` error for operations against the wrong object kind
    pub fn wrong_type() -> Self {
        Reply::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
        )
    }

    /// Array of bulk strings
    pub fn bulk_array<'a>(items: impl IntoIterator<Item = &'a Bytes>) -> Self {
        Reply::Array(items.into_iter().cloned().map(Reply::Bulk).collect())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Append the wire encoding to `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Status(text) => put_line(dst, b'+', text),
            Reply::Error(text) => put_line(dst, b'-', text),
            Reply::Integer(n) => {
                dst.put_u8(b':');
                dst.put_slice(n.to_string().as_bytes());
                dst.put_slice(b"\r\n");
            }
            Reply::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put_slice(data.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                dst.put_slice(data);
                dst.put_slice(b"\r\n");
            }
            Reply::Null => dst.put_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                dst.put_u8(b'*');
                dst.put_slice(items.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }

    /// The wire encoding as a standalone buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }
}

/// Write a single-line reply; CR and LF in `text` are written as spaces
fn put_line(dst: &mut BytesMut, prefix: u8, text: &str) {
    dst.put_u8(prefix);
    dst.extend(
        text.bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    dst.put_slice(b"\r\n");
}

/// redis-cli style rendering, used by the command-line client
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(text) => f.write_str(text),
            Reply::Error(text) => write!(f, "(error) {}", text),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Reply::Null => f.write_str("(nil)"),
            Reply::Array(items) if items.is_empty() => f.write_str("(empty array)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
