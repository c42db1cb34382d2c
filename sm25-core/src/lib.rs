//! # sm25-core
//!
//! Core protocol implementation for SM25 TCP fingerprint readers.
//!
//! This crate provides the low-level protocol primitives:
//! - Response frame layout and field access
//! - Frame assembly from a chunked byte stream
//! - Checksum calculation
//! - Command definitions and outgoing packet encoding
//! - Protocol constants

pub mod assembler;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod packet;

pub use assembler::{Assembly, FrameAssembler};
pub use command::Command;
pub use constants::{DEFAULT_PORT, TEMPLATE_SIZE};
pub use error::{Error, Result};
pub use frame::{Frame, Prefix};
pub use packet::SendCommand;
