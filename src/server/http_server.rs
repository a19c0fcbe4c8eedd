use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use may::coroutine::JoinHandle;
use may_minihttp::HttpServiceFactory;
use tracing::{debug, info};

/// Wrapper around a `may_minihttp` service factory.
pub struct HttpServer<F>(pub F);

/// Handle to a running HTTP server's accept coroutine.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the address until it accepts a connection (about 250ms at most).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if let Ok(probe) = TcpStream::connect(self.addr) {
                drop(probe);
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting connections. Connections already accepted keep running
    /// in their own coroutines.
    pub fn stop(self) {
        // SAFETY: cancelling the accept coroutine is the documented way to stop a
        // may server; the handle is owned here and joined right after.
        #[allow(unsafe_code)]
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            debug!(addr = %self.addr, "Accept coroutine ended by cancellation");
        }
        info!(addr = %self.addr, "Listener closed");
    }

    /// Block until the accept coroutine finishes.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<F: HttpServiceFactory> HttpServer<F> {
    /// Bind `addr` and start accepting connections.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = self.0.start(addr)?;
        info!(addr = %addr, "Listening");
        Ok(ServerHandle { addr, handle })
    }
}
