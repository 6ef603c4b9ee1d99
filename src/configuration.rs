use crate::{metrics::Metrics, server::Server};
use std::{
    io,
    net::{ToSocketAddrs, UdpSocket},
    sync::Arc,
};

/// Largest datagram the ingestion loop will read, which exceeds the maximum UDP payload over IPv4.
pub const MAX_PACKET_SIZE: usize = 65536;

/// A configuration builder for `Server`.
#[derive(Clone)]
pub struct Configuration {
    pub(crate) address: String,
    pub(crate) max_packet_size: usize,
    pub(crate) metrics: Option<Arc<Metrics>>,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            address: "127.0.0.1:8125".to_owned(),
            max_packet_size: MAX_PACKET_SIZE,
            metrics: None,
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration { Default::default() }

    /// Sets the address to listen on.
    ///
    /// Defaults to `127.0.0.1:8125`.  Use port `0` to have the operating system pick a free port,
    /// which can then be read back from `Server::local_addr`.
    pub fn address<A: Into<String>>(mut self, address: A) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the size of the receive buffer.
    ///
    /// Defaults to `65536`.  Datagrams larger than this are truncated by the operating system
    /// before they are parsed.
    pub fn max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    /// Sets the metrics that the server will write into.
    ///
    /// By default, the server creates its own.
    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Binds the socket and creates a `Server` based on this configuration.
    pub fn build(self) -> io::Result<Server> {
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("no address for {}", self.address)))?;
        let socket = UdpSocket::bind(addr)?;
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(Metrics::new()));

        Server::from_parts(socket, metrics, self.max_packet_size)
    }
}
