//! Frame assembly from an arbitrarily chunked byte stream
//!
//! The reader has no uniform length field: the length of a frame is implied
//! by its prefix and command code. Assembly is therefore two-phase:
//! - wait for the 4 classification bytes (prefix + command)
//! - wait for the implied total length, then split it off
//!
//! The assembler owns a single `BytesMut` cursor holding every byte read from
//! the socket that has not yet been attributed to a complete frame. Bytes past
//! a frame boundary stay in the cursor and are classified on the next pass, so
//! batched frames come out one by one and split frames are stitched back
//! together.
//!
//! # Example
//!
//! ```
//! use sm25_core::{Command, Frame, FrameAssembler, Prefix};
//!
//! let frame = Frame::build(Prefix::ResponseCommand, Command::TestConnection, 0, &[0; 14]);
//! let bytes = frame.as_bytes();
//!
//! let mut assembler = FrameAssembler::new();
//! assert!(assembler.push(&bytes[..5]).is_empty());
//! let frames = assembler.push(&bytes[5..]);
//!
//! assert_eq!(frames, vec![frame]);
//! ```

use bytes::BytesMut;
use tracing::{trace, warn};

use crate::{
    constants::PEEK_SIZE,
    frame::{Frame, expected_length, read_command, read_prefix},
};

/// Outcome of inspecting the cursor once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// Fewer than four bytes buffered; no frame exists yet
    NeedHeader,

    /// Header known, body still arriving
    Partial(Frame),

    /// A complete frame was split off the cursor
    Complete(Frame),
}

/// Accumulates socket reads and yields complete frames in arrival order
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Append a chunk and extract every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.extend(chunk);

        let mut frames = Vec::new();
        while let Assembly::Complete(frame) = self.advance() {
            frames.push(frame);
        }

        frames
    }

    /// Append a chunk without extracting
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        trace!(added = chunk.len(), buffered = self.buffer.len(), "Buffered bytes");
    }

    /// Inspect the cursor once, splitting off at most one complete frame
    ///
    /// A header whose prefix or command implies no length yields a
    /// zero-length complete frame. The bytes buffered at that point cannot be
    /// delimited and are discarded so the next read starts from a clean
    /// cursor.
    pub fn advance(&mut self) -> Assembly {
        if self.buffer.len() < PEEK_SIZE {
            return Assembly::NeedHeader;
        }

        let prefix = read_prefix(&self.buffer);
        let command = read_command(&self.buffer);
        let expected = expected_length(prefix, command);

        if expected == 0 {
            warn!(
                prefix = format!("0x{:02X}{:02X}", self.buffer[1], self.buffer[0]),
                command = format!("0x{:02X}{:02X}", self.buffer[3], self.buffer[2]),
                discarded = self.buffer.len(),
                "Unrecognized frame header"
            );
            self.buffer.clear();
            return Assembly::Complete(Frame::new(BytesMut::new().freeze()));
        }

        if self.buffer.len() < expected {
            return Assembly::Partial(Frame::new(self.buffer.clone().freeze()));
        }

        let frame = Frame::new(self.buffer.split_to(expected).freeze());
        trace!(
            ?command,
            len = expected,
            remaining = self.buffer.len(),
            "Assembled frame"
        );

        Assembly::Complete(frame)
    }

    /// Snapshot of the frame currently being accumulated
    pub fn pending(&self) -> Option<Frame> {
        (self.buffer.len() >= PEEK_SIZE).then(|| Frame::new(self.buffer.clone().freeze()))
    }

    /// Number of bytes not yet attributed to a complete frame
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop every buffered byte
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::Command, constants::TEMPLATE_SIZE, frame::Prefix};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn response(command: Command, return_code: u16) -> Frame {
        Frame::build(Prefix::ResponseCommand, command, return_code, &[0x42; 14])
    }

    fn enroll_data() -> Frame {
        let template: Vec<u8> = (0..TEMPLATE_SIZE).map(|i| i as u8).collect();
        Frame::build(Prefix::ResponseData, Command::GetEnrollData, 0, &template)
    }

    #[test]
    fn test_single_complete_frame() {
        let mut assembler = FrameAssembler::new();
        let frame = response(Command::TestConnection, 0);

        let frames = assembler.push(frame.as_bytes());

        assert_eq!(frames, vec![frame]);
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut assembler = FrameAssembler::new();
        let first = response(Command::Enroll, 0);
        let second = enroll_data();

        let mut chunk = first.as_bytes().to_vec();
        chunk.extend_from_slice(second.as_bytes());

        let frames = assembler.push(&chunk);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], first);
        assert_eq!(frames[1], second);
        assert_eq!(frames[0].len() + frames[1].len(), chunk.len());
        assert!(frames.iter().all(Frame::checksum_is_valid));
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_trailing_bytes_stay_buffered() {
        let mut assembler = FrameAssembler::new();
        let first = response(Command::Identify, 0);
        let second = response(Command::Identify, 1);

        let mut chunk = first.as_bytes().to_vec();
        chunk.extend_from_slice(&second.as_bytes()[..10]);

        assert_eq!(assembler.push(&chunk), vec![first]);
        assert_eq!(assembler.len(), 10);

        let pending = assembler.pending().unwrap();
        assert!(!pending.is_complete());
        assert_eq!(pending.command(), Command::Identify);

        assert_eq!(assembler.push(&second.as_bytes()[10..]), vec![second]);
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_waits_for_header() {
        let mut assembler = FrameAssembler::new();
        let frame = response(Command::Verify, 0);

        assert!(assembler.push(&frame.as_bytes()[..3]).is_empty());
        assert_eq!(assembler.advance(), Assembly::NeedHeader);
        assert!(assembler.pending().is_none());
    }

    #[test]
    fn test_partial_reports_progress() {
        let mut assembler = FrameAssembler::new();
        let frame = enroll_data();

        assembler.extend(&frame.as_bytes()[..100]);

        match assembler.advance() {
            Assembly::Partial(partial) => {
                assert_eq!(partial.len(), 100);
                assert_eq!(partial.expected_len(), 508);
                assert!(!partial.is_complete());
            }
            other => panic!("expected partial frame, got {other:?}"),
        }
        assert_eq!(assembler.len(), 100);
    }

    // Unrecognized headers are published as zero-length complete frames.
    #[test]
    fn test_unrecognized_header_yields_empty_frame() {
        let mut assembler = FrameAssembler::new();
        let garbage = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

        let frames = assembler.push(&garbage);

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
        assert!(frames[0].is_complete());
        assert_eq!(frames[0].prefix(), Prefix::Unknown);
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_unknown_command_on_data_prefix_yields_empty_frame() {
        let mut assembler = FrameAssembler::new();
        let frame = Frame::build(Prefix::ResponseData, Command::Verify, 0, &[0; 4]);

        let frames = assembler.push(frame.as_bytes());

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].expected_len(), 0);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn test_recovers_after_unrecognized_header() {
        let mut assembler = FrameAssembler::new();
        let good = response(Command::TestConnection, 0);

        assembler.push(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(assembler.push(good.as_bytes()), vec![good]);
    }

    #[test]
    fn test_clear() {
        let mut assembler = FrameAssembler::new();
        assembler.extend(&[0xAA, 0x55]);
        assembler.clear();
        assert!(assembler.is_empty());
    }

    fn chunked(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
        let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
        points.push(0);
        points.push(bytes.len());
        points.sort_unstable();
        points.dedup();
        points.windows(2).map(|w| bytes[w[0]..w[1]].to_vec()).collect()
    }

    #[test]
    fn test_one_byte_chunks() {
        let frame = enroll_data();
        let mut assembler = FrameAssembler::new();

        let mut frames = Vec::new();
        for byte in frame.as_bytes() {
            frames.extend(assembler.push(std::slice::from_ref(byte)));
        }

        assert_eq!(frames, vec![frame]);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_frames(
            cuts in prop::collection::vec(any::<usize>(), 0..40),
            return_code in any::<u16>(),
        ) {
            let expected = vec![
                response(Command::Enroll, return_code),
                enroll_data(),
                Frame::build(Prefix::ResponseData, Command::WriteTemplate, return_code, &[7, 0]),
                response(Command::FpCancel, 0),
            ];
            let stream: Vec<u8> = expected.iter().flat_map(|f| f.as_bytes().to_vec()).collect();

            let mut assembler = FrameAssembler::new();
            let mut frames = Vec::new();
            for chunk in chunked(&stream, &cuts) {
                frames.extend(assembler.push(&chunk));
            }

            prop_assert_eq!(frames, expected);
            prop_assert!(assembler.is_empty());
        }
    }
}
