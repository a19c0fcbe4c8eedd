//! # Lifecycle
//!
//! Tracks open connections and runs the shutdown sequence:
//!
//! 1. stop accepting new connections;
//! 2. poll the [`ConnectionSet`] until it is empty, for at most the grace period;
//! 3. destroy whatever is still open and report [`ShutdownOutcome::Forced`].
//!
//! The `on_close` callback given to the [`Supervisor`] runs exactly once on either
//! path, after the connections are gone and before the exit status is returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A live connection that can be torn down from outside its coroutine.
pub trait Connection: Send + Sync {
    /// Close the underlying transport. The owning coroutine notices on its next
    /// read or write and drops its [`ConnectionGuard`].
    fn destroy(&self);
}

/// Registry of open connections, shared between the server and the supervisor.
#[derive(Clone, Default)]
pub struct ConnectionSet {
    open: Arc<DashMap<u64, Arc<dyn Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `conn` until the returned guard is dropped.
    #[must_use = "the connection is untracked as soon as the guard drops"]
    pub fn register(&self, conn: Arc<dyn Connection>) -> ConnectionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.open.insert(id, conn);
        debug!(connection = id, open = self.open.len(), "Connection opened");
        ConnectionGuard {
            set: self.clone(),
            id,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Destroy every open connection, returning how many there were.
    ///
    /// Entries stay registered until their guards drop.
    pub fn destroy_all(&self) -> usize {
        let mut destroyed = 0;
        for entry in self.open.iter() {
            entry.value().destroy();
            destroyed += 1;
        }
        destroyed
    }
}

/// Removes its connection from the set when dropped.
pub struct ConnectionGuard {
    set: ConnectionSet,
    id: u64,
}

impl ConnectionGuard {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.set.open.remove(&self.id);
        debug!(connection = self.id, open = self.set.open.len(), "Connection closed");
    }
}

/// TCP connection identified by its raw socket descriptor.
#[cfg(unix)]
pub struct SocketConnection {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl SocketConnection {
    #[must_use]
    pub fn new(fd: std::os::unix::io::RawFd) -> Self {
        SocketConnection { fd }
    }
}

#[cfg(unix)]
impl Connection for SocketConnection {
    #[allow(unsafe_code)]
    fn destroy(&self) {
        use std::mem::ManuallyDrop;
        use std::net::{Shutdown, TcpStream};
        use std::os::unix::io::FromRawFd;

        // SAFETY: the descriptor stays open while this connection is registered:
        // the guard is dropped before the owning stream closes it, and removal waits
        // on the set's shard lock held by `destroy_all`. ManuallyDrop keeps us from
        // closing a descriptor we do not own.
        let stream = ManuallyDrop::new(unsafe { TcpStream::from_raw_fd(self.fd) });
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            debug!(fd = self.fd, error = %e, "Socket already closed");
        }
    }
}

/// Shutdown tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long open connections may take to finish.
    pub grace_ms: u64,
    /// How often the connection set is polled while draining.
    pub poll_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig {
            grace_ms: 10_000,
            poll_ms: 50,
        }
    }
}

impl ShutdownConfig {
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection finished within the grace period.
    Graceful,
    /// The grace period elapsed; `destroyed` connections were torn down.
    Forced { destroyed: usize },
}

impl ShutdownOutcome {
    /// Process exit status: 0 when graceful, 1 when forced.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            ShutdownOutcome::Graceful => 0,
            ShutdownOutcome::Forced { .. } => 1,
        }
    }
}

type CloseCallback = Box<dyn FnOnce() + Send>;

/// Runs the shutdown sequence over a [`ConnectionSet`].
pub struct Supervisor {
    connections: ConnectionSet,
    config: ShutdownConfig,
    on_close: Option<CloseCallback>,
}

impl Supervisor {
    #[must_use]
    pub fn new(connections: ConnectionSet, config: ShutdownConfig) -> Self {
        Supervisor {
            connections,
            config,
            on_close: None,
        }
    }

    #[must_use]
    pub fn on_close(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// Stop accepting via `stop_accepting`, drain, then force if needed.
    /// Consumes the supervisor so the sequence and `on_close` run once.
    pub fn shutdown(mut self, stop_accepting: impl FnOnce()) -> ShutdownOutcome {
        info!(
            open = self.connections.len(),
            grace_ms = self.config.grace_ms,
            "Shutdown started"
        );
        stop_accepting();
        info!("Stopped accepting connections");

        let outcome = self.drain();
        match outcome {
            ShutdownOutcome::Graceful => info!("All connections closed"),
            ShutdownOutcome::Forced { destroyed } => {
                warn!(destroyed, "Grace period elapsed, connections destroyed");
            }
        }

        if let Some(callback) = self.on_close.take() {
            callback();
        }
        info!(exit_code = outcome.exit_code(), "Shutdown complete");
        outcome
    }

    fn drain(&self) -> ShutdownOutcome {
        let deadline = Instant::now() + self.config.grace();
        loop {
            if self.connections.is_empty() {
                return ShutdownOutcome::Graceful;
            }
            if Instant::now() >= deadline {
                let destroyed = self.connections.destroy_all();
                return ShutdownOutcome::Forced { destroyed };
            }
            debug!(open = self.connections.len(), "Waiting for connections");
            thread::sleep(self.config.poll_interval());
        }
    }
}

/// Block the calling thread until SIGINT or SIGTERM arrives.
#[cfg(unix)]
pub fn wait_for_termination() -> anyhow::Result<i32> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    let signal = signals.forever().next().unwrap_or(SIGTERM);
    info!(signal, "Termination signal received");
    Ok(signal)
}

/// Block the calling thread forever; signal handling is unix-only.
#[cfg(not(unix))]
pub fn wait_for_termination() -> anyhow::Result<i32> {
    loop {
        thread::park();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeConnection {
        destroyed: AtomicUsize,
    }

    impl Connection for FakeConnection {
        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast() -> ShutdownConfig {
        ShutdownConfig {
            grace_ms: 60,
            poll_ms: 5,
        }
    }

    #[test]
    fn test_guard_unregisters() {
        let set = ConnectionSet::new();
        let a = set.register(Arc::new(FakeConnection::default()));
        let b = set.register(Arc::new(FakeConnection::default()));
        assert_ne!(a.id(), b.id());
        assert_eq!(set.len(), 2);
        drop(a);
        assert_eq!(set.len(), 1);
        drop(b);
        assert!(set.is_empty());
    }

    #[test]
    fn test_graceful_when_idle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let outcome = Supervisor::new(ConnectionSet::new(), fast())
            .on_close(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .shutdown(|| {});
        assert_eq!(outcome, ShutdownOutcome::Graceful);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_graceful_when_connections_finish_in_time() {
        let set = ConnectionSet::new();
        let guard = set.register(Arc::new(FakeConnection::default()));
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            drop(guard);
        });
        let outcome = Supervisor::new(set, fast()).shutdown(|| {});
        closer.join().unwrap();
        assert_eq!(outcome, ShutdownOutcome::Graceful);
    }

    #[test]
    fn test_forced_after_grace() {
        let set = ConnectionSet::new();
        let conn = Arc::new(FakeConnection::default());
        let _guard = set.register(Arc::clone(&conn) as Arc<dyn Connection>);
        let order = Arc::new(Mutex::new(Vec::new()));
        let stop_log = Arc::clone(&order);
        let close_log = Arc::clone(&order);

        let outcome = Supervisor::new(set, fast())
            .on_close(move || close_log.lock().unwrap().push("close"))
            .shutdown(move || stop_log.lock().unwrap().push("stop"));

        assert_eq!(outcome, ShutdownOutcome::Forced { destroyed: 1 });
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(conn.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["stop", "close"]);
    }
}
