//! Blocking client
//!
//! Minimal RESP client used by the CLI, the load generator, and tests.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{Buf, BytesMut};

use crate::error::{LodeError, Result};
use crate::protocol::{decode_reply, encode_request, Reply};

/// A blocking connection to a LodeKV server
pub struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    /// Connect to `addr`
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        })
    }

    /// Bound how long a single reply may take
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send one request and wait for its reply
    pub fn call<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<Reply> {
        self.send(args)?;
        self.read_reply()
    }

    /// Send one request without waiting (for pipelining)
    pub fn send<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<()> {
        self.stream.write_all(&encode_request(args))?;
        Ok(())
    }

    /// Read the next reply off the connection
    pub fn read_reply(&mut self) -> Result<Reply> {
        loop {
            if let Some((reply, used)) = decode_reply(&self.buffer)? {
                self.buffer.advance(used);
                return Ok(reply);
            }

            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(LodeError::Protocol(
                    "connection closed by server".to_string(),
                ));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Reply> {
        self.call(&["GET", key])
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<Reply> {
        self.call(&["SET", key, value])
    }

    pub fn ping(&mut self) -> Result<Reply> {
        self.call(&["PING"])
    }
}
