//! SM25 response frames

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    checksum,
    command::Command,
    constants::{
        CHECKSUM_SIZE, COMMAND_PACKET_SIZE, ENROLL_DATA_FRAME_SIZE, HEADER_SIZE,
        READ_TEMPLATE_FRAME_SIZE, TEMPLATE_SIZE, WRITE_TEMPLATE_FRAME_SIZE,
    },
    error::{Error, Result},
};

/// Frame category carried in the first two bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Prefix {
    /// Host to reader command packet
    CommandPacket = 0xAA55,

    /// Reader to host response to a command packet
    ResponseCommand = 0x55AA,

    /// Host to reader data packet
    CommandData = 0xA55A,

    /// Reader to host data packet
    ResponseData = 0x5AA5,

    /// Unparseable or unrecognized prefix
    Unknown = 0xFFFF,
}

impl Prefix {
    /// Map a raw code, falling back to [`Prefix::Unknown`]
    pub fn from_code(code: u16) -> Self {
        Self::try_from(code).unwrap_or(Self::Unknown)
    }

    /// Raw wire code
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for Prefix {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0xAA55 => Ok(Self::CommandPacket),
            0x55AA => Ok(Self::ResponseCommand),
            0xA55A => Ok(Self::CommandData),
            0x5AA5 => Ok(Self::ResponseData),
            _ => Err(Error::UnknownPrefix(value)),
        }
    }
}

/// Total frame length implied by a frame's category and command
///
/// ```text
/// Unknown          any             0
/// ResponseCommand  any             24
/// other            ReadTemplate    510
/// other            GetEnrollData   508
/// other            WriteTemplate   12
/// other            any other       0
/// ```
pub fn expected_length(prefix: Prefix, command: Command) -> usize {
    match prefix {
        Prefix::Unknown => 0,
        Prefix::ResponseCommand => COMMAND_PACKET_SIZE,
        _ => match command {
            Command::ReadTemplate => READ_TEMPLATE_FRAME_SIZE,
            Command::GetEnrollData => ENROLL_DATA_FRAME_SIZE,
            Command::WriteTemplate => WRITE_TEMPLATE_FRAME_SIZE,
            _ => 0,
        },
    }
}

/// One response frame
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬──────────┬──────────┐
/// │  Prefix  │ Command  │  RetLen  │  Return  │   Data   │ Checksum │
/// │ 2 bytes  │ 2 bytes  │ 2 bytes  │ 2 bytes  │ N bytes  │ 2 bytes  │
/// └──────────┴──────────┴──────────┴──────────┴──────────┴──────────┘
/// ```
///
/// `RetLen` declares `2 + N`. All integers are little-endian.
///
/// A frame may be partial while the assembler is still waiting for bytes;
/// accessors then read whatever has arrived and fall back to zero or
/// `Unknown` for fields that have not.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
    expected_len: usize,
}

impl Frame {
    /// Wrap bytes attributed to one frame
    pub fn new(raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();
        let expected_len = expected_length(read_prefix(&raw), read_command(&raw));
        Self { raw, expected_len }
    }

    /// Encode a frame from its parts
    ///
    /// # Examples
    ///
    /// ```
    /// use sm25_core::{Command, Frame, Prefix};
    ///
    /// let frame = Frame::build(Prefix::ResponseCommand, Command::TestConnection, 0, &[0; 14]);
    /// assert!(frame.is_complete());
    /// assert!(frame.checksum_is_valid());
    /// ```
    pub fn build(prefix: Prefix, command: Command, return_code: u16, data: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + data.len() + CHECKSUM_SIZE);
        buf.put_u16_le(prefix.code());
        buf.put_u16_le(command.code());
        buf.put_u16_le((data.len() + 2) as u16);
        buf.put_u16_le(return_code);
        buf.put_slice(data);
        let checksum = checksum::calculate(&buf);
        buf.put_u16_le(checksum);

        Self::new(buf.freeze())
    }

    /// Bytes attributed to this frame so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Number of bytes attributed so far
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Check if no bytes are attributed
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Total length implied by prefix and command
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Check if every expected byte has been attributed
    pub fn is_complete(&self) -> bool {
        self.raw.len() == self.expected_len
    }

    /// Frame category
    pub fn prefix(&self) -> Prefix {
        read_prefix(&self.raw)
    }

    /// Command this frame responds to
    pub fn command(&self) -> Command {
        read_command(&self.raw)
    }

    /// Raw command code (0 if not yet received)
    pub fn command_code(&self) -> u16 {
        self.read_u16(2)
    }

    /// Declared length of return code plus data
    pub fn full_return_len(&self) -> usize {
        self.read_u16(4) as usize
    }

    /// Declared data length
    pub fn data_len(&self) -> usize {
        self.full_return_len().saturating_sub(2)
    }

    /// Return code of the command
    pub fn return_code(&self) -> u16 {
        self.read_u16(6)
    }

    /// Data section, clipped to the bytes received and to the checksum
    pub fn data(&self) -> &[u8] {
        let body_end = self.raw.len().saturating_sub(CHECKSUM_SIZE);
        let end = (HEADER_SIZE + self.data_len()).min(body_end);
        if end <= HEADER_SIZE {
            return &[];
        }
        &self.raw[HEADER_SIZE..end]
    }

    /// First two data bytes (GD code or return sub-code)
    pub fn data_code(&self) -> u16 {
        let data = self.data();
        if data.len() < 2 {
            return 0;
        }
        LittleEndian::read_u16(data)
    }

    /// Biometric template, present iff the declared and received data are both one template long
    pub fn template(&self) -> Option<&[u8]> {
        let data = self.data();
        (self.data_len() == TEMPLATE_SIZE && data.len() == TEMPLATE_SIZE).then_some(data)
    }

    /// Checksum trailer as received (0 if fewer than two bytes)
    pub fn checksum(&self) -> u16 {
        if self.raw.len() < CHECKSUM_SIZE {
            return 0;
        }
        LittleEndian::read_u16(&self.raw[self.raw.len() - CHECKSUM_SIZE..])
    }

    /// Checksum computed over every byte before the trailer
    pub fn calculated_checksum(&self) -> u16 {
        let end = self.raw.len().saturating_sub(CHECKSUM_SIZE);
        checksum::calculate(&self.raw[..end])
    }

    /// Check the trailer of a complete frame
    ///
    /// Incomplete frames and frames too short to carry a trailer are never
    /// valid. The result is informational; frames are published either way.
    pub fn checksum_is_valid(&self) -> bool {
        self.is_complete()
            && self.raw.len() >= CHECKSUM_SIZE
            && self.checksum() == self.calculated_checksum()
    }

    fn read_u16(&self, offset: usize) -> u16 {
        read_u16_at(&self.raw, offset).unwrap_or(0)
    }
}

fn read_u16_at(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes
        .get(offset..offset + 2)
        .map(LittleEndian::read_u16)
}

pub(crate) fn read_prefix(bytes: &[u8]) -> Prefix {
    read_u16_at(bytes, 0).map_or(Prefix::Unknown, Prefix::from_code)
}

pub(crate) fn read_command(bytes: &[u8]) -> Command {
    read_u16_at(bytes, 2).map_or(Command::Unknown, Command::from_code)
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("prefix", &self.prefix())
            .field("command", &self.command())
            .field("return_code", &format!("0x{:04X}", self.return_code()))
            .field("data_len", &self.data().len())
            .field("len", &self.raw.len())
            .field("expected_len", &self.expected_len)
            .field("checksum_valid", &self.checksum_is_valid())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ret=0x{:04X} data=0x{:04X} {:?} checksum_valid={}",
            hex::encode_upper(&self.raw),
            self.command(),
            self.return_code(),
            self.data_code(),
            self.prefix(),
            self.checksum_is_valid()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn response(command: Command, data: &[u8]) -> Frame {
        Frame::build(Prefix::ResponseCommand, command, 0, data)
    }

    fn data_frame(command: Command, data_len: usize) -> Frame {
        Frame::build(Prefix::ResponseData, command, 0, &vec![0x11; data_len])
    }

    #[test]
    fn test_expected_length_table() {
        for command in [Command::TestConnection, Command::ReadTemplate, Command::Unknown] {
            assert_eq!(expected_length(Prefix::ResponseCommand, command), 24);
            assert_eq!(expected_length(Prefix::Unknown, command), 0);
        }

        for prefix in [Prefix::ResponseData, Prefix::CommandData, Prefix::CommandPacket] {
            assert_eq!(expected_length(prefix, Command::ReadTemplate), 510);
            assert_eq!(expected_length(prefix, Command::GetEnrollData), 508);
            assert_eq!(expected_length(prefix, Command::WriteTemplate), 12);
            assert_eq!(expected_length(prefix, Command::Verify), 0);
            assert_eq!(expected_length(prefix, Command::Unknown), 0);
        }
    }

    #[test]
    fn test_complete_only_at_expected_length() {
        let cases = [
            response(Command::TestConnection, &[0; 14]),
            data_frame(Command::ReadTemplate, 500),
            data_frame(Command::GetEnrollData, 498),
            data_frame(Command::WriteTemplate, 2),
        ];

        for frame in cases {
            let expected = frame.expected_len();
            assert_eq!(frame.len(), expected);
            assert!(frame.is_complete());

            for len in [expected - 1, expected + 1] {
                let mut bytes = frame.as_bytes().to_vec();
                bytes.resize(len, 0);
                assert!(!Frame::new(bytes).is_complete(), "{len} bytes");
            }
        }
    }

    #[test]
    fn test_fields() {
        let mut data = vec![0x34, 0x12];
        data.extend_from_slice(&[0; 12]);
        let frame = Frame::build(Prefix::ResponseCommand, Command::GetEmptyId, 0x0001, &data);

        assert_eq!(frame.prefix(), Prefix::ResponseCommand);
        assert_eq!(frame.command(), Command::GetEmptyId);
        assert_eq!(frame.command_code(), 0x0109);
        assert_eq!(frame.full_return_len(), 16);
        assert_eq!(frame.data_len(), 14);
        assert_eq!(frame.return_code(), 0x0001);
        assert_eq!(frame.data(), data.as_slice());
        assert_eq!(frame.data_code(), 0x1234);
        assert!(frame.checksum_is_valid());
    }

    #[test]
    fn test_template_present_only_for_template_sized_data() {
        let enroll = data_frame(Command::GetEnrollData, TEMPLATE_SIZE);
        assert_eq!(enroll.template().map(<[u8]>::len), Some(TEMPLATE_SIZE));

        let read = data_frame(Command::ReadTemplate, TEMPLATE_SIZE + 2);
        assert!(read.template().is_none());

        let ack = data_frame(Command::WriteTemplate, 2);
        assert!(ack.template().is_none());

        let short = response(Command::TestConnection, &[0; 14]);
        assert!(short.template().is_none());
    }

    #[test]
    fn test_template_requires_declared_length() {
        let mut raw = data_frame(Command::GetEnrollData, TEMPLATE_SIZE)
            .as_bytes()
            .to_vec();
        raw[4..6].copy_from_slice(&502u16.to_le_bytes());

        let frame = Frame::new(raw);
        assert!(frame.is_complete());
        assert_eq!(frame.data_len(), TEMPLATE_SIZE + 2);
        assert_eq!(frame.data().len(), TEMPLATE_SIZE);
        assert!(frame.template().is_none());
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::new(Bytes::new());

        assert_eq!(frame.prefix(), Prefix::Unknown);
        assert_eq!(frame.command(), Command::Unknown);
        assert_eq!(frame.expected_len(), 0);
        assert!(frame.is_complete());
        assert_eq!(frame.data(), &[] as &[u8]);
        assert_eq!(frame.checksum(), 0);
        assert!(!frame.checksum_is_valid());
    }

    #[test]
    fn test_partial_frame_is_never_checksum_valid() {
        let full = response(Command::TestConnection, &[0; 14]);
        let partial = Frame::new(full.as_bytes()[..10].to_vec());

        assert!(!partial.is_complete());
        assert!(!partial.checksum_is_valid());
        assert_eq!(partial.command(), Command::TestConnection);
    }

    #[test]
    fn test_unknown_prefix_value() {
        let frame = Frame::new(vec![0x12, 0x34, 0x0A, 0x01]);
        assert_eq!(frame.prefix(), Prefix::Unknown);
        assert_eq!(frame.expected_len(), 0);
    }

    #[test]
    fn test_display_has_hex_dump() {
        let frame = response(Command::TestConnection, &[0; 14]);
        let text = frame.to_string();
        assert!(text.starts_with("[AA555001"));
        assert!(text.contains("CMD_TEST_CONNECTION"));
        assert!(text.ends_with("checksum_valid=true"));
    }

    proptest! {
        #[test]
        fn prop_mutating_body_invalidates_checksum(
            data in prop::collection::vec(any::<u8>(), 14),
            index in 0usize..22,
            delta in 1u8..=255,
        ) {
            let frame = response(Command::Identify, &data);
            prop_assert!(frame.checksum_is_valid());

            let mut bytes = frame.as_bytes().to_vec();
            bytes[index] = bytes[index].wrapping_add(delta);

            let mutated = Frame::new(bytes);
            prop_assert_ne!(mutated.checksum(), mutated.calculated_checksum());
            prop_assert!(!mutated.checksum_is_valid());
        }
    }
}
