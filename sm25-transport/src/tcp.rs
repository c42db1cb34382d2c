//! TCP transport

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use sm25_core::DEFAULT_PORT;

use crate::{Stream, Transport, error::*};

/// TCP transport for SM25 readers
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
    port: u16,
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            connect_timeout: None,
        }
    }

    /// Create a TCP transport on the reader's default port
    pub fn with_default_port(addr: impl Into<String>) -> Self {
        Self::new(addr, DEFAULT_PORT)
    }

    /// Bound the connect attempt (default: the OS connect timeout)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Target host
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Target port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.addr, self.port);

        let mut addrs = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?;

        addrs
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }

    async fn connect_stream(&self, addr: SocketAddr) -> Result<TcpStream> {
        let connect = TcpStream::connect(addr);

        let stream = match self.connect_timeout {
            Some(limit) => timeout(limit, connect)
                .await
                .map_err(|_| Error::ConnectionTimeout)??,
            None => connect.await?,
        };

        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<Stream> {
        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = self.connect_stream(addr).await?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        let (reader, writer) = stream.into_split();
        Ok(Stream::new(reader, writer))
    }

    fn remote_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
