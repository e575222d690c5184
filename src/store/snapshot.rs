//! Snapshot persistence
//!
//! Full point-in-time text dump of the store.
//!
//! ## File Format
//! ```text
//! 0 <key> <value>                     string entry
//! 1 <key> <count> <v1> <v2> ... <vn>  list entry
//! ```
//!
//! One entry per line, fields separated by a single space, entries in key
//! order. Tokens are escaped so any byte sequence survives: bytes `<= 0x20`,
//! `%` and `>= 0x7f` become `%XX` (uppercase hex), and the empty byte string
//! is written as a lone `%`. Plain printable tokens are written verbatim.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{Object, Store};
use crate::error::{LodeError, Result};

const TYPE_STRING: &[u8] = b"0";
const TYPE_LIST: &[u8] = b"1";

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Outcome of a snapshot load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Lines replayed into the store
    pub records_loaded: usize,

    /// Malformed lines that were ignored
    pub lines_skipped: usize,
}

/// A decoded snapshot line
#[derive(Debug, PartialEq, Eq)]
enum Record {
    String { key: Bytes, value: Bytes },
    List { key: Bytes, values: Vec<Bytes> },
}

// =============================================================================
// Load
// =============================================================================

/// Replay a snapshot file into `store`
///
/// A missing file is an empty snapshot. Malformed lines are skipped.
pub fn load(path: &Path, store: &mut Store) -> Result<LoadStats> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No snapshot at {}, starting empty", path.display());
            return Ok(LoadStats::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut stats = LoadStats::default();

    for (lineno, line) in contents.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let applied = parse_record(line).and_then(|record| apply(store, record));
        match applied {
            Ok(()) => stats.records_loaded += 1,
            Err(e) => {
                tracing::warn!("Skipping snapshot line {}: {}", lineno + 1, e);
                stats.lines_skipped += 1;
            }
        }
    }

    Ok(stats)
}

fn apply(store: &mut Store, record: Record) -> Result<()> {
    match record {
        Record::String { key, value } => store.set(key, value),
        Record::List { key, values } => {
            store.lpush_many(key, values)?;
        }
    }
    Ok(())
}

fn parse_record(line: &[u8]) -> Result<Record> {
    let mut fields = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|field| !field.is_empty());

    let kind = fields.next().ok_or_else(|| malformed("empty line"))?;
    let key = fields
        .next()
        .ok_or_else(|| malformed("missing key"))
        .and_then(decode_token)?;

    let record = match kind {
        TYPE_STRING => {
            let value = fields
                .next()
                .ok_or_else(|| malformed("missing string value"))
                .and_then(decode_token)?;
            Record::String { key, value }
        }
        TYPE_LIST => {
            let count = fields
                .next()
                .and_then(|field| std::str::from_utf8(field).ok())
                .and_then(|field| field.parse::<usize>().ok())
                .ok_or_else(|| malformed("missing or invalid list length"))?;
            let values = fields
                .by_ref()
                .take(count)
                .map(decode_token)
                .collect::<Result<Vec<_>>>()?;
            if values.len() != count {
                return Err(malformed(format!(
                    "list declares {} elements, found {}",
                    count,
                    values.len()
                )));
            }
            Record::List { key, values }
        }
        other => {
            return Err(malformed(format!(
                "unknown entry type {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    };

    if fields.next().is_some() {
        return Err(malformed("trailing fields"));
    }

    Ok(record)
}

fn malformed(msg: impl Into<String>) -> LodeError {
    LodeError::Snapshot(msg.into())
}

// =============================================================================
// Save
// =============================================================================

/// Write every entry of `store` to `path`, replacing the file
///
/// The snapshot is written to a sibling `.tmp` file and renamed over the
/// target, so a crash mid-save leaves the previous snapshot intact.
pub fn save(path: &Path, store: &Store) -> Result<usize> {
    let tmp_path = tmp_path(path);
    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    let mut line = Vec::new();
    let mut count = 0;

    for (key, object) in store.iter() {
        line.clear();
        encode_entry(key, object, &mut line);
        writer.write_all(&line)?;
        count += 1;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(&tmp_path, path)?;
    Ok(count)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn encode_entry(key: &[u8], object: &Object, out: &mut Vec<u8>) {
    match object {
        Object::String(value) => {
            out.extend_from_slice(TYPE_STRING);
            out.push(b' ');
            encode_token(key, out);
            out.push(b' ');
            encode_token(value, out);
        }
        Object::List(values) => {
            out.extend_from_slice(TYPE_LIST);
            out.push(b' ');
            encode_token(key, out);
            out.push(b' ');
            out.extend_from_slice(values.len().to_string().as_bytes());
            for value in values {
                out.push(b' ');
                encode_token(value, out);
            }
        }
    }
    out.push(b'\n');
}

// =============================================================================
// Token escaping
// =============================================================================

fn needs_escape(b: u8) -> bool {
    b <= b' ' || b == b'%' || b >= 0x7f
}

/// Append the escaped form of `raw` to `out`
pub fn encode_token(raw: &[u8], out: &mut Vec<u8>) {
    if raw.is_empty() {
        out.push(b'%');
        return;
    }
    for &b in raw {
        if needs_escape(b) {
            out.push(b'%');
            out.push(HEX[(b >> 4) as usize]);
            out.push(HEX[(b & 0x0f) as usize]);
        } else {
            out.push(b);
        }
    }
}

/// Reverse `encode_token`
pub fn decode_token(token: &[u8]) -> Result<Bytes> {
    if token == b"%" {
        return Ok(Bytes::new());
    }

    let mut out = Vec::with_capacity(token.len());
    let mut i = 0;
    while i < token.len() {
        if token[i] == b'%' {
            let hi = token.get(i + 1).copied().and_then(hex_value);
            let lo = token.get(i + 2).copied().and_then(hex_value);
            match (hi, lo) {
                (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                _ => return Err(malformed("invalid escape sequence")),
            }
            i += 3;
        } else {
            out.push(token[i]);
            i += 1;
        }
    }
    Ok(Bytes::from(out))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
