//! High-level error types

use sm25_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] sm25_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] sm25_transport::Error),

    #[error("Reader {addr} is not connected (command: {command})")]
    NotConnected {
        addr: String,
        command: Command,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
