//! TCP Server
//!
//! Single-threaded reactor: accepts connections, reads requests, writes
//! replies, and reaps idle clients.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{LodeError, Result};

use super::connection::{Connection, Progress};

/// Token reserved for the listening socket
const LISTENER: Token = Token(0);

/// Cloneable handle that asks a running server to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Request shutdown; the reactor exits within one poll interval
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// TCP server for LodeKV
///
/// Owns the engine for its whole lifetime; every request is dispatched on
/// the thread that calls [`Server::run`].
pub struct Server {
    config: Config,
    engine: Engine,
    poll: Poll,
    listener: TcpListener,

    /// Live connections keyed by their poll token
    connections: HashMap<Token, Connection>,

    /// Connections that stopped on their read budget, serviced next turn
    requeued: Vec<Token>,

    next_token: usize,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listening socket and register it with the poller
    ///
    /// mio enables `SO_REUSEADDR` on the listener, so a restarted server
    /// can rebind while old sockets sit in TIME_WAIT.
    pub fn bind(config: Config, engine: Engine) -> Result<Self> {
        if config.max_events == 0 {
            return Err(LodeError::Config("max_events must be at least 1".to_string()));
        }
        let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
            LodeError::Config(format!("invalid listen address {:?}: {}", config.listen_addr, e))
        })?;

        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            config,
            engine,
            poll,
            listener,
            connections: HashMap::new(),
            requeued: Vec::new(),
            next_token: LISTENER.0 + 1,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread or a signal handler
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Run the event loop until shutdown is requested (blocking)
    ///
    /// On exit every connection is closed and the store is flushed to its
    /// snapshot, also when the loop itself failed.
    pub fn run(mut self) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("Listening on {}", addr);
        }

        let outcome = self.event_loop();
        if let Err(e) = &outcome {
            tracing::error!("Event loop failed: {}", e);
        }

        let Server {
            engine,
            connections,
            listener,
            ..
        } = self;
        tracing::info!("Shutting down, closing {} connections", connections.len());
        drop(connections);
        drop(listener);

        engine.close()?;
        outcome
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(self.config.max_events);

        while !self.shutdown.is_shutdown() {
            // Step 1: Wait for readiness, bounded so the sweep always runs.
            // Requeued connections still have input, so do not block then.
            let timeout = if self.requeued.is_empty() {
                self.config.poll_interval
            } else {
                Duration::ZERO
            };
            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            // Step 2: Service ready sockets
            let requeued = std::mem::take(&mut self.requeued);
            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_all(),
                    token => self.service(token),
                }
            }

            // Step 3: Give budget-limited connections another turn
            for token in requeued {
                self.service(token);
            }

            // Step 4: Reap idle connections
            self.sweep_idle(Instant::now());
        }

        Ok(())
    }

    /// Accept every pending connection
    fn accept_all(&mut self) {
        loop {
            let (stream, peer_addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // e.g. descriptor exhaustion; retry on the next readiness
                    tracing::warn!("Accept failed: {}", e);
                    return;
                }
            };

            let mut conn = match Connection::new(stream, peer_addr) {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("Failed to set up connection from {}: {}", peer_addr, e);
                    continue;
                }
            };

            let token = Token(self.next_token);
            self.next_token += 1;

            if let Err(e) = self
                .poll
                .registry()
                .register(conn.stream_mut(), token, Interest::READABLE)
            {
                tracing::warn!("Failed to register {}: {}", peer_addr, e);
                continue;
            }

            tracing::debug!("Connection established from {} ({:?})", peer_addr, token);
            self.connections.insert(token, conn);
        }
    }

    /// Give a client socket one turn
    ///
    /// Read and write readiness are handled alike: a turn flushes, executes
    /// and reads as far as the output backlog and read budget allow.
    fn service(&mut self, token: Token) {
        // Events for a connection closed earlier in this batch are stale
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let mut close_reason = match conn.drive(&mut self.engine) {
            Ok(Progress::Idle) | Ok(Progress::Blocked) => None,
            Ok(Progress::MoreInput) => {
                self.requeued.push(token);
                None
            }
            Ok(Progress::PeerClosed) => Some("closed by peer".to_string()),
            Err(e @ LodeError::Protocol(_)) => {
                // Best effort delivery of the queued error reply
                if let Err(flush_err) = conn.flush() {
                    tracing::trace!("Flush to {} failed: {}", conn.peer_addr(), flush_err);
                }
                Some(format!("protocol error: {}", e))
            }
            Err(e) => Some(format!("i/o error: {}", e)),
        };

        if close_reason.is_none() {
            // Watch for writability only while output is queued
            let want_write = conn.has_pending_writes();
            if want_write != conn.write_interest() {
                let interest = if want_write {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                match self
                    .poll
                    .registry()
                    .reregister(conn.stream_mut(), token, interest)
                {
                    Ok(()) => conn.set_write_interest(want_write),
                    Err(e) => close_reason = Some(format!("reregister failed: {}", e)),
                }
            }
        }

        if let Some(reason) = close_reason {
            self.close_connection(token, &reason);
        }
    }

    /// Deregister and drop a connection, closing its socket
    fn close_connection(&mut self, token: Token, reason: &str) {
        if let Some(mut conn) = self.connections.remove(&token) {
            if let Err(e) = self.poll.registry().deregister(conn.stream_mut()) {
                tracing::trace!("Deregister of {} failed: {}", conn.peer_addr(), e);
            }
            tracing::debug!("Connection {} closed: {}", conn.peer_addr(), reason);
        }
    }

    /// Close every connection idle for longer than the configured timeout
    fn sweep_idle(&mut self, now: Instant) {
        let timeout = self.config.idle_timeout;
        let registry = self.poll.registry();

        self.connections.retain(|_, conn| {
            if conn.idle_for(now) <= timeout {
                return true;
            }
            if let Err(e) = registry.deregister(conn.stream_mut()) {
                tracing::trace!("Deregister of {} failed: {}", conn.peer_addr(), e);
            }
            tracing::debug!("Connection {} closed: idle timeout", conn.peer_addr());
            false
        });
    }
}
