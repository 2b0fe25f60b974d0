//! TCP Server
//!
//! Accepts connections and hands each one to its own handler thread.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

use super::connection::Connection;

/// First pause after a failed `accept`
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest pause between consecutive failed `accept`s
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// TCP server for SSMP
///
/// One thread per accepted connection, no cap on their number. Handler
/// threads are detached: the accept loop never waits for them.
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind a server with the given config and engine
    ///
    /// `TcpListener::bind` sets `SO_REUSEADDR` on Unix, so a restarted
    /// server can rebind while old sockets sit in TIME_WAIT.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("SSMP server listening on {}", local_addr);

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops the accept loop from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Run the accept loop (blocking)
    ///
    /// Returns once shutdown is requested. The listening socket is closed
    /// on return; connections already being served keep running.
    pub fn run(self) -> Result<()> {
        let mut next_conn_id: u64 = 0;
        let mut backoff: Option<Duration> = None;

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    backoff = None;
                    self.spawn_handler(stream, next_conn_id);
                    next_conn_id += 1;
                }
                Err(e) => {
                    // Errors like EMFILE persist until a descriptor frees up.
                    let pause = next_backoff(backoff);
                    tracing::warn!("Accept error: {} (retrying in {:?})", e, pause);
                    thread::sleep(pause);
                    backoff = Some(pause);
                }
            }
        }

        tracing::info!("Listener on {} closed", self.local_addr);
        Ok(())
    }

    /// Run the accept loop on a background thread
    pub fn spawn(self) -> io::Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("ssmp-listener".to_string())
            .spawn(move || self.run())
    }

    fn spawn_handler(&self, stream: TcpStream, conn_id: u64) {
        let engine = Arc::clone(&self.engine);
        let config = self.config.clone();

        let spawned = thread::Builder::new()
            .name(format!("ssmp-conn-{}", conn_id))
            .spawn(move || {
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                let span = tracing::info_span!("conn", id = conn_id, %peer);
                let _enter = span.enter();

                tracing::info!("Accepted connection");
                match Connection::new(stream, engine, &config) {
                    Ok(mut conn) => {
                        let reason = conn.handle();
                        tracing::info!(?reason, "Closing connection");
                    }
                    Err(e) => tracing::warn!("Failed to set up connection: {}", e),
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn handler for connection {}: {}", conn_id, e);
        }
    }
}

/// Stops a running `Server`
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    ///
    /// The accept loop is blocked in `accept`, so a throwaway connection
    /// is made to wake it up.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::debug!("Wake-up connection to {} failed: {}", self.wake_addr, e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Connectable form of a bound address (wildcard binds become loopback)
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// Pause before retrying `accept`: doubles on each consecutive failure
fn next_backoff(previous: Option<Duration>) -> Duration {
    match previous {
        None => ACCEPT_BACKOFF_MIN,
        Some(prev) => (prev * 2).min(ACCEPT_BACKOFF_MAX),
    }
}
