//! Engine Tests
//!
//! Tests verify:
//! - End-to-end command behavior at the byte level
//! - Error replies (unknown command, arity, WRONGTYPE)
//! - Snapshot flush on close

use bytes::Bytes;
use lodekv::protocol::{decode_reply, Reply};
use lodekv::{Config, Engine, Store};
use tempfile::TempDir;

/// Dispatch a command and return the encoded reply
fn run(engine: &mut Engine, args: &[&str]) -> Bytes {
    let args = args
        .iter()
        .map(|s| Bytes::copy_from_slice(s.as_bytes()))
        .collect();
    engine.dispatch(args).to_bytes()
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let mut engine = Engine::in_memory();

    assert_eq!(run(&mut engine, &["SET", "foo", "bar"]), &b"+OK\r\n"[..]);
    assert_eq!(run(&mut engine, &["GET", "foo"]), &b"$3\r\nbar\r\n"[..]);
}

#[test]
fn test_get_absent_key() {
    let mut engine = Engine::in_memory();
    assert_eq!(run(&mut engine, &["GET", "nope"]), &b"$-1\r\n"[..]);
}

#[test]
fn test_lpush_then_lrange() {
    let mut engine = Engine::in_memory();

    assert_eq!(run(&mut engine, &["LPUSH", "list", "a"]), &b":1\r\n"[..]);
    assert_eq!(run(&mut engine, &["LPUSH", "list", "b"]), &b":2\r\n"[..]);
    assert_eq!(
        run(&mut engine, &["LRANGE", "list"]),
        &b"*2\r\n$1\r\na\r\n$1\r\nb\r\n"[..]
    );
}

#[test]
fn test_lpush_on_string_is_wrongtype() {
    let mut engine = Engine::in_memory();
    run(&mut engine, &["SET", "k", "original"]);

    let reply = run(&mut engine, &["LPUSH", "k", "x"]);

    assert!(reply.starts_with(b"-WRONGTYPE "));
    assert!(reply.ends_with(b"\r\n"));
    assert_eq!(run(&mut engine, &["GET", "k"]), &b"$8\r\noriginal\r\n"[..]);
}

// =============================================================================
// Additional Command Tests
// =============================================================================

#[test]
fn test_ping() {
    let mut engine = Engine::in_memory();
    assert_eq!(run(&mut engine, &["PING"]), &b"+PONG\r\n"[..]);
    assert_eq!(run(&mut engine, &["ping", "hello"]), &b"$5\r\nhello\r\n"[..]);
}

#[test]
fn test_lowercase_commands() {
    let mut engine = Engine::in_memory();
    assert_eq!(run(&mut engine, &["set", "k", "v"]), &b"+OK\r\n"[..]);
    assert_eq!(run(&mut engine, &["get", "k"]), &b"$1\r\nv\r\n"[..]);
}

#[test]
fn test_variadic_lpush() {
    let mut engine = Engine::in_memory();
    assert_eq!(run(&mut engine, &["LPUSH", "l", "a", "b", "c"]), &b":3\r\n"[..]);
    assert_eq!(
        run(&mut engine, &["LRANGE", "l", "0", "-1"]),
        &b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n"[..]
    );
}

#[test]
fn test_lrange_absent_key_is_empty_array() {
    let mut engine = Engine::in_memory();
    assert_eq!(run(&mut engine, &["LRANGE", "none"]), &b"*0\r\n"[..]);
}

#[test]
fn test_lrange_on_string_is_wrongtype() {
    let mut engine = Engine::in_memory();
    run(&mut engine, &["SET", "k", "v"]);
    assert!(run(&mut engine, &["LRANGE", "k"]).starts_with(b"-WRONGTYPE "));
}

#[test]
fn test_get_on_list_is_null() {
    let mut engine = Engine::in_memory();
    run(&mut engine, &["LPUSH", "l", "a"]);
    assert_eq!(run(&mut engine, &["GET", "l"]), &b"$-1\r\n"[..]);
}

#[test]
fn test_set_overwrites_list() {
    let mut engine = Engine::in_memory();
    run(&mut engine, &["LPUSH", "k", "a"]);
    assert_eq!(run(&mut engine, &["SET", "k", "s"]), &b"+OK\r\n"[..]);
    assert_eq!(run(&mut engine, &["GET", "k"]), &b"$1\r\ns\r\n"[..]);
}

#[test]
fn test_del_counts_removed_keys() {
    let mut engine = Engine::in_memory();
    run(&mut engine, &["SET", "a", "1"]);
    run(&mut engine, &["LPUSH", "b", "x"]);

    assert_eq!(run(&mut engine, &["DEL", "a", "b", "c"]), &b":2\r\n"[..]);
    assert_eq!(run(&mut engine, &["GET", "a"]), &b"$-1\r\n"[..]);
    assert!(engine.store().is_empty());
}

#[test]
fn test_unknown_command() {
    let mut engine = Engine::in_memory();
    assert_eq!(
        run(&mut engine, &["FLUSHALL"]),
        &b"-ERR unknown command 'FLUSHALL'\r\n"[..]
    );
}

#[test]
fn test_unknown_command_with_crlf_is_one_reply() {
    let mut engine = Engine::in_memory();

    let wire = engine
        .dispatch(vec![Bytes::from_static(b"X'\r\n+OK\r\n:42")])
        .to_bytes();

    let (reply, used) = decode_reply(&wire).unwrap().unwrap();
    assert_eq!(used, wire.len());
    assert_eq!(
        reply,
        Reply::Error("ERR unknown command 'X'  +OK  :42'".to_string())
    );

    // The connection stays in step with the next request
    assert_eq!(run(&mut engine, &["PING"]), &b"+PONG\r\n"[..]);
}

#[test]
fn test_wrong_arity_reply() {
    let mut engine = Engine::in_memory();
    assert_eq!(
        run(&mut engine, &["GET"]),
        &b"-ERR wrong number of arguments for 'get' command\r\n"[..]
    );
    assert_eq!(
        run(&mut engine, &["SET", "k"]),
        &b"-ERR wrong number of arguments for 'set' command\r\n"[..]
    );
}

#[test]
fn test_empty_request_is_error_reply() {
    let mut engine = Engine::in_memory();
    assert!(engine.dispatch(Vec::new()).is_error());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_close_flushes_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .snapshot_path(dir.path().join("engine.db"))
        .build();

    let mut engine = Engine::open(&config);
    run(&mut engine, &["SET", "k", "v"]);
    run(&mut engine, &["LPUSH", "l", "a", "b"]);
    engine.close().unwrap();

    let mut reopened = Engine::open(&config);
    assert_eq!(run(&mut reopened, &["GET", "k"]), &b"$1\r\nv\r\n"[..]);
    assert_eq!(
        run(&mut reopened, &["LRANGE", "l"]),
        &b"*2\r\n$1\r\na\r\n$1\r\nb\r\n"[..]
    );
}

#[test]
fn test_with_store_uses_given_data() {
    let mut store = Store::new();
    store.set(Bytes::from_static(b"pre"), Bytes::from_static(b"loaded"));

    let mut engine = Engine::with_store(store);

    assert_eq!(run(&mut engine, &["GET", "pre"]), &b"$6\r\nloaded\r\n"[..]);
}
