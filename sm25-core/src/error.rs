//! Error types for sm25-core

/// Result type alias for sm25-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown command code
    #[error("Unknown command code: 0x{0:04X}")]
    UnknownCommand(u16),

    /// Unknown frame prefix
    #[error("Unknown frame prefix: 0x{0:04X}")]
    UnknownPrefix(u16),

    /// Payload does not fit the packet kind
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}
