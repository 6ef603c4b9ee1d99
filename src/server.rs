use crate::{configuration::Configuration, metrics::Metrics};
use crossbeam_channel::{bounded, Receiver};
use log::{debug, error, warn};
use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, UdpSocket},
    sync::Arc,
    thread,
};

/// Statsd server that reads datagrams and aggregates them into `Metrics`.
pub struct Server {
    socket: UdpSocket,
    local_addr: SocketAddr,
    metrics: Arc<Metrics>,
    max_packet_size: usize,
}

/// Handle to a server running on its own thread.
pub struct Handle {
    metrics: Arc<Metrics>,
    local_addr: SocketAddr,
    done: Receiver<io::Error>,
}

impl Handle {
    /// The metrics the server is aggregating into.
    pub fn metrics(&self) -> &Arc<Metrics> { &self.metrics }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Receives the error that stopped the ingestion loop, if it ever stops.
    pub fn done(&self) -> &Receiver<io::Error> { &self.done }
}

impl Server {
    pub(crate) fn from_parts(socket: UdpSocket, metrics: Arc<Metrics>, max_packet_size: usize) -> io::Result<Server> {
        // Binding to port 0 leaves the real port unknown until we ask the socket.
        let local_addr = socket.local_addr()?;

        Ok(Server {
            socket,
            local_addr,
            metrics,
            max_packet_size,
        })
    }

    /// Gets a builder to configure a `Server` instance with.
    pub fn builder() -> Configuration { Configuration::default() }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// The metrics this server aggregates into.
    pub fn metrics(&self) -> Arc<Metrics> { Arc::clone(&self.metrics) }

    /// Runs the ingestion loop on the current thread.
    ///
    /// Only returns when reading from the socket fails, handing back the error.
    pub fn run(self) -> io::Error {
        let mut buf = vec![0u8; self.max_packet_size];
        loop {
            let n = match self.socket.recv_from(&mut buf) {
                Ok((n, _)) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("read failed: {}", e);
                    return e;
                },
            };

            let packet = &buf[..n];
            if let Err(e) = self.metrics.process_packet(packet) {
                warn!("failed to process packet {:?}: {}", String::from_utf8_lossy(packet), e);
            }
            self.metrics.notify();
        }
    }

    /// Runs the ingestion loop on a dedicated thread.
    pub fn spawn(self) -> io::Result<Handle> {
        let (done_tx, done_rx) = bounded(1);
        let metrics = self.metrics();
        let local_addr = self.local_addr;

        thread::Builder::new().name("statsd-ingest".to_owned()).spawn(move || {
            let e = self.run();
            let _ = done_tx.send(e);
        })?;

        debug!("statsd server listening on {}", local_addr);

        Ok(Handle {
            metrics,
            local_addr,
            done: done_rx,
        })
    }
}

/// Starts a statsd server on the given address, running on its own thread.
pub fn start<A: Into<String>>(address: A) -> io::Result<Handle> { Server::builder().address(address).build()?.spawn() }
