//! Transport layer for SM25 readers
//!
//! Opens the byte stream a reader speaks over and hands back its two halves.

pub mod error;
pub mod tcp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read half of an open stream
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an open stream
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open byte stream, split so one task can read while another writes
pub struct Stream {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl Stream {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

/// Opens byte streams to one fixed endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new stream; every call yields an independent connection
    async fn open(&self) -> Result<Stream>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
