//! Connection Handler
//!
//! Per-socket buffers and protocol state for the reactor.
//!
//! Each readiness event gives a connection one bounded turn: at most
//! `READ_BUDGET` bytes are read, and requests stop executing once more than
//! `OUTPUT_HIGH_WATER` bytes of replies wait for the peer to read them.

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use mio::net::TcpStream;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Reply, RequestParser};

/// Bytes requested from the socket per read call
const READ_CHUNK: usize = 4096;

/// Bytes read from one socket per turn before yielding to other clients
pub const READ_BUDGET: usize = 256 * 1024;

/// Queued output above which requests are no longer executed
pub const OUTPUT_HIGH_WATER: usize = 1024 * 1024;

/// Where a connection stands after a turn of [`Connection::drive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The socket is drained; wait for the next readable event
    Idle,

    /// The read budget ran out with input possibly still pending
    MoreInput,

    /// Output is backed up past the high-water mark; wait for writability
    Blocked,

    /// The peer closed its side and every buffered request was answered
    PeerClosed,
}

/// Outcome of one budgeted read pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    Drained,
    BudgetSpent,
    Eof,
}

/// A single client connection
pub struct Connection {
    /// Non-blocking TCP stream
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: SocketAddr,

    /// Received bytes not yet consumed by the parser
    read_buf: BytesMut,

    /// Encoded replies the socket has not accepted yet
    write_buf: BytesMut,

    /// Incremental request parser
    parser: RequestParser,

    /// Last time bytes arrived from the peer
    last_active: Instant,

    /// Whether the reactor currently watches this socket for writability
    write_interest: bool,
}

impl Connection {
    /// Wrap an accepted stream
    ///
    /// Disables Nagle's algorithm; replies are small and latency-bound.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Result<Self> {
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer_addr,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::new(),
            parser: RequestParser::new(),
            last_active: Instant::now(),
            write_interest: false,
        })
    }

    /// Run one turn: flush, execute buffered requests, read more input
    ///
    /// Requests are only executed while queued output stays below
    /// [`OUTPUT_HIGH_WATER`], and at most [`READ_BUDGET`] bytes are read.
    /// A protocol violation queues an error reply and is returned; the
    /// caller should flush and drop the connection.
    pub fn drive(&mut self, engine: &mut Engine) -> Result<Progress> {
        let mut budget = READ_BUDGET;
        let mut input = None;

        loop {
            // Step 1: Push out queued replies; a slow reader stalls here
            self.flush()?;
            if self.output_backlogged() {
                return Ok(Progress::Blocked);
            }

            // Step 2: Execute what is buffered until input or room runs out
            self.process(engine)?;
            if self.output_backlogged() {
                continue;
            }

            // Step 3: Read once per turn, then report
            match input {
                None => input = Some(self.fill_read_buf(&mut budget)?),
                Some(ReadOutcome::Drained) => return Ok(Progress::Idle),
                Some(ReadOutcome::BudgetSpent) => return Ok(Progress::MoreInput),
                Some(ReadOutcome::Eof) => return Ok(Progress::PeerClosed),
            }
        }
    }

    /// Read until `WouldBlock`, EOF, or the budget is spent
    ///
    /// Readiness is edge-triggered, so anything short of `Drained` must be
    /// followed up without waiting for another event.
    fn fill_read_buf(&mut self, budget: &mut usize) -> io::Result<ReadOutcome> {
        let mut chunk = [0u8; READ_CHUNK];
        while *budget > 0 {
            let want = READ_CHUNK.min(*budget);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    self.last_active = Instant::now();
                    *budget -= n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::Drained)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(ReadOutcome::BudgetSpent)
    }

    /// Run complete requests in the read buffer through `engine`
    ///
    /// Replies are queued in the write buffer. Stops early once the queue
    /// passes the high-water mark; the remaining input stays buffered.
    pub fn process(&mut self, engine: &mut Engine) -> Result<usize> {
        let mut handled = 0;
        while !self.output_backlogged() {
            match self.parser.next_command(&mut self.read_buf) {
                Ok(Some(args)) => {
                    let reply = engine.dispatch(args);
                    reply.encode(&mut self.write_buf);
                    handled += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Protocol error from {}: {}", self.peer_addr, e);
                    Reply::error(&e).encode(&mut self.write_buf);
                    return Err(e);
                }
            }
        }
        Ok(handled)
    }

    /// Write as much of the queued output as the socket accepts
    pub fn flush(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.write_buf.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn output_backlogged(&self) -> bool {
        self.write_buf.len() > OUTPUT_HIGH_WATER
    }

    /// Bytes of reply data the socket has not accepted yet
    pub fn pending_output(&self) -> usize {
        self.write_buf.len()
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_buf.is_empty()
    }

    pub(crate) fn write_interest(&self) -> bool {
        self.write_interest
    }

    pub(crate) fn set_write_interest(&mut self, enabled: bool) {
        self.write_interest = enabled;
    }

    /// Time since the peer last sent data
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
