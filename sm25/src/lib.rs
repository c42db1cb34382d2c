//! # sm25
//!
//! Rust client for SM25 TCP fingerprint readers.
//!
//! ## Features
//!
//! - Frame reassembly from an arbitrarily chunked TCP stream
//! - Background receive task publishing frames as events
//! - Enrollment gate that lets only the cancel command through
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use sm25::{Command, Reader, ReaderEvent, SendCommand};
//!
//! #[tokio::main]
//! async fn main() -> sm25::Result<()> {
//!     let reader = Reader::new("192.168.0.200", sm25::DEFAULT_PORT);
//!     let mut events = reader.subscribe();
//!
//!     reader.connect().await;
//!     if !reader.is_connected() {
//!         return Ok(());
//!     }
//!
//!     reader.send(SendCommand::new(Command::GetFwVersion, &[])?).await?;
//!
//!     if let Ok(ReaderEvent::FrameReceived(frame)) = events.recv().await {
//!         println!("{}", frame);
//!     }
//!
//!     reader.close().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod gate;
pub mod reader;

// Re-exports
pub use error::{Error, Result};
pub use events::{ConnectionStatus, EventBus, ReaderEvent};
pub use gate::{EnrollmentGate, EnrollmentState};
pub use reader::{ConnectionState, Reader, ReaderBuilder};

// Re-export protocol types
pub use sm25_core::{Command, DEFAULT_PORT, Frame, FrameAssembler, Prefix, SendCommand, TEMPLATE_SIZE};
pub use sm25_transport::{TcpTransport, Transport};
