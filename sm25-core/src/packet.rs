//! Outgoing SM25 command packets

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::{CHECKSUM_SIZE, COMMAND_DATA_SIZE, COMMAND_PACKET_SIZE},
    error::{Error, Result},
    frame::Prefix,
};

/// One outgoing command
///
/// Holds the command code and the exact bytes written to the socket.
/// Immutable once constructed.
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬───────────────────┬──────────┐
/// │  Prefix  │ Command  │   Len    │       Data        │ Checksum │
/// │ 2 bytes  │ 2 bytes  │ 2 bytes  │ 16 bytes (padded) │ 2 bytes  │
/// └──────────┴──────────┴──────────┴───────────────────┴──────────┘
/// ```
///
/// Data packets use the same layout with an unpadded data area of `Len` bytes.
///
/// # Examples
///
/// ```
/// use sm25_core::SendCommand;
///
/// let cancel = SendCommand::cancel();
/// assert!(cancel.is_cancel());
/// assert_eq!(cancel.payload().len(), 24);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SendCommand {
    command: Command,
    payload: Bytes,
}

impl SendCommand {
    /// Largest data area of a data packet
    pub const MAX_DATA_PACKET_SIZE: usize = u16::MAX as usize - 2;

    /// Encode a fixed-size command packet
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if `data` exceeds 16 bytes.
    pub fn new(command: Command, data: &[u8]) -> Result<Self> {
        if data.len() > COMMAND_DATA_SIZE {
            return Err(Error::PayloadTooLarge {
                size: data.len(),
                max: COMMAND_DATA_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(COMMAND_PACKET_SIZE);
        buf.put_u16_le(Prefix::CommandPacket.code());
        buf.put_u16_le(command.code());
        buf.put_u16_le(data.len() as u16);
        buf.put_slice(data);
        buf.put_bytes(0, COMMAND_DATA_SIZE - data.len());

        Ok(Self::seal(command, buf))
    }

    /// Encode a variable-size command data packet
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the length does not fit the
    /// length field.
    pub fn data(command: Command, data: &[u8]) -> Result<Self> {
        if data.len() > Self::MAX_DATA_PACKET_SIZE {
            return Err(Error::PayloadTooLarge {
                size: data.len(),
                max: Self::MAX_DATA_PACKET_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(6 + data.len() + CHECKSUM_SIZE);
        buf.put_u16_le(Prefix::CommandData.code());
        buf.put_u16_le(command.code());
        buf.put_u16_le(data.len() as u16);
        buf.put_slice(data);

        Ok(Self::seal(command, buf))
    }

    /// Wrap caller-encoded bytes as-is
    pub fn raw(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// The cancel command, sendable in any enrollment state
    pub fn cancel() -> Self {
        let mut buf = BytesMut::with_capacity(COMMAND_PACKET_SIZE);
        buf.put_u16_le(Prefix::CommandPacket.code());
        buf.put_u16_le(Command::FpCancel.code());
        buf.put_u16_le(0);
        buf.put_bytes(0, COMMAND_DATA_SIZE);

        Self::seal(Command::FpCancel, buf)
    }

    fn seal(command: Command, mut buf: BytesMut) -> Self {
        let checksum = checksum::calculate(&buf);
        buf.put_u16_le(checksum);

        Self {
            command,
            payload: buf.freeze(),
        }
    }

    /// Command code
    pub fn command(&self) -> Command {
        self.command
    }

    /// Bytes written to the socket
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Check if this is the cancel command
    pub fn is_cancel(&self) -> bool {
        self.command == Command::FpCancel
    }
}

impl fmt::Debug for SendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendCommand")
            .field("command", &self.command)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for SendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.command, hex::encode_upper(&self.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_packet_layout() {
        let cmd = SendCommand::new(Command::ReadTemplate, &[0x05, 0x00]).unwrap();
        let bytes = cmd.payload();

        assert_eq!(bytes.len(), COMMAND_PACKET_SIZE);
        assert_eq!(&bytes[..6], &[0x55, 0xAA, 0x0A, 0x01, 0x02, 0x00]);
        assert_eq!(&bytes[6..8], &[0x05, 0x00]);
        assert!(bytes[8..22].iter().all(|&b| b == 0));

        let trailer = u16::from_le_bytes([bytes[22], bytes[23]]);
        assert!(checksum::verify(&bytes[..22], trailer));
    }

    #[test]
    fn test_command_packet_too_large() {
        let result = SendCommand::new(Command::SetParam, &[0; 17]);
        assert!(matches!(
            result,
            Err(Error::PayloadTooLarge { size: 17, max: 16 })
        ));
    }

    #[test]
    fn test_data_packet_layout() {
        let template = vec![0xAB; 500];
        let cmd = SendCommand::data(Command::WriteTemplate, &template).unwrap();
        let bytes = cmd.payload();

        assert_eq!(bytes.len(), 6 + 500 + 2);
        assert_eq!(&bytes[..6], &[0x5A, 0xA5, 0x0B, 0x01, 0xF4, 0x01]);
        assert_eq!(&bytes[6..506], template.as_slice());
    }

    #[test]
    fn test_cancel_matches_empty_command_packet() {
        let cancel = SendCommand::cancel();
        let built = SendCommand::new(Command::FpCancel, &[]).unwrap();

        assert_eq!(cancel, built);
        assert!(cancel.is_cancel());
        assert_eq!(cancel.command(), Command::FpCancel);
    }

    #[test]
    fn test_raw_is_untouched() {
        let cmd = SendCommand::raw(Command::TestConnection, vec![1, 2, 3]);
        assert_eq!(cmd.payload().as_ref(), &[1, 2, 3]);
        assert!(!cmd.is_cancel());
    }
}
