//! Protocol constants

/// Default TCP port of the reader
pub const DEFAULT_PORT: u16 = 7879;

/// Size of a biometric template carried in a frame's data section
pub const TEMPLATE_SIZE: usize = 498;

/// Bytes needed to classify a frame (prefix + command code)
pub const PEEK_SIZE: usize = 4;

/// Frame header size (prefix, command, length, return code)
pub const HEADER_SIZE: usize = 8;

/// Checksum trailer size
pub const CHECKSUM_SIZE: usize = 2;

/// Fixed data area of a command packet
pub const COMMAND_DATA_SIZE: usize = 16;

/// Total size of a command packet and of a response command frame
pub const COMMAND_PACKET_SIZE: usize = 24;

/// Frame length of a template read response
pub const READ_TEMPLATE_FRAME_SIZE: usize = 510;

/// Frame length of an enroll data response
pub const ENROLL_DATA_FRAME_SIZE: usize = 508;

/// Frame length of a template write acknowledgement
pub const WRITE_TEMPLATE_FRAME_SIZE: usize = 12;

/// Deadline for the diagnostic probe connection (seconds)
pub const PROBE_TIMEOUT: u64 = 5;

/// Capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Single byte the reader sends to keep an idle link alive
pub const KEEPALIVE_BYTE: u8 = 0x00;
