//! Frame buffer for accumulating partial reads.
//!
//! Bytes arrive from the socket in arbitrary-sized chunks with no alignment
//! to frame boundaries. The buffer appends each chunk to a single
//! `bytes::BytesMut` and extracts complete packets from the front, leaving
//! any trailing partial frame for the next push. Partial data is never an
//! error; only a size field below the protocol minimum or above the
//! configured maximum is.

use bytes::BytesMut;

use super::packet::{self, Packet, FRAME_OVERHEAD, SIZE_FIELD_LEN};
use crate::error::{RconError, Result};

/// Default maximum declared frame size (1 MiB). Server responses are capped
/// at 4096 payload bytes by most implementations; anything near this limit
/// is a corrupt or hostile stream.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete packets.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Maximum accepted value of the size field.
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a frame buffer with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a frame buffer with a custom frame size limit.
    pub fn with_max_frame(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            max_frame_size,
        }
    }

    /// Append a chunk and extract all complete packets.
    ///
    /// Returns the packets completed by this chunk, in wire order; the
    /// result is identical no matter how chunk boundaries fall relative to
    /// frame boundaries.
    ///
    /// # Errors
    ///
    /// [`RconError::Protocol`] when a size field is below the 10 byte
    /// protocol minimum or above the configured maximum, and
    /// [`RconError::MalformedPacket`] when a complete frame fails to decode.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Packet>> {
        self.buffer.extend_from_slice(chunk);

        let mut packets = Vec::new();
        while let Some(packet) = self.try_extract_one()? {
            packets.push(packet);
        }
        Ok(packets)
    }

    /// Extract a single packet from the front of the buffer, if one is
    /// complete.
    fn try_extract_one(&mut self) -> Result<Option<Packet>> {
        if self.buffer.len() < SIZE_FIELD_LEN {
            return Ok(None);
        }

        let declared = i32::from_le_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);

        if declared < FRAME_OVERHEAD as i32 {
            return Err(RconError::Protocol(format!(
                "declared frame size {} is below the {} byte minimum",
                declared, FRAME_OVERHEAD
            )));
        }

        let size = declared as usize;
        if size > self.max_frame_size {
            return Err(RconError::Protocol(format!(
                "declared frame size {} exceeds maximum {}",
                size, self.max_frame_size
            )));
        }

        if self.buffer.len() < SIZE_FIELD_LEN + size {
            return Ok(None);
        }

        let frame = self.buffer.split_to(SIZE_FIELD_LEN + size);
        let packet = packet::decode(&frame[SIZE_FIELD_LEN..])?;
        Ok(Some(packet))
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer holds no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::{TYPE_AUTH_RESPONSE, TYPE_COMMAND_RESPONSE};

    fn make_frame(id: i32, ptype: i32, payload: &[u8]) -> Vec<u8> {
        packet::encode(id, ptype, payload).unwrap().to_vec()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frame = make_frame(1, TYPE_COMMAND_RESPONSE, b"hello");

        let packets = buffer.push(&frame).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].id, 1);
        assert_eq!(&packets[0].body[..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();
        let mut combined = Vec::new();
        combined.extend_from_slice(&make_frame(1, TYPE_COMMAND_RESPONSE, b"first"));
        combined.extend_from_slice(&make_frame(2, TYPE_COMMAND_RESPONSE, b"second"));
        combined.extend_from_slice(&make_frame(3, TYPE_AUTH_RESPONSE, b""));

        let packets = buffer.push(&combined).unwrap();

        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].id, 1);
        assert_eq!(packets[1].id, 2);
        assert_eq!(packets[2].id, 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_size_field() {
        let mut buffer = FrameBuffer::new();
        let frame = make_frame(1, TYPE_COMMAND_RESPONSE, b"test");

        let packets = buffer.push(&frame[..2]).unwrap();
        assert!(packets.is_empty());
        assert_eq!(buffer.len(), 2);

        let packets = buffer.push(&frame[2..]).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let frame = make_frame(1, TYPE_COMMAND_RESPONSE, b"a longer payload split mid-way");

        let mid = frame.len() / 2;
        assert!(buffer.push(&frame[..mid]).unwrap().is_empty());

        let packets = buffer.push(&frame[mid..]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0].body[..], b"a longer payload split mid-way");
    }

    #[test]
    fn test_byte_at_a_time_matches_single_push() {
        let mut combined = Vec::new();
        combined.extend_from_slice(&make_frame(1, TYPE_COMMAND_RESPONSE, b"alpha"));
        combined.extend_from_slice(&make_frame(2, TYPE_COMMAND_RESPONSE, b""));
        combined.extend_from_slice(&make_frame(3, TYPE_COMMAND_RESPONSE, b"gamma"));

        let mut whole = FrameBuffer::new();
        let expected = whole.push(&combined).unwrap();

        let mut dribble = FrameBuffer::new();
        let mut collected = Vec::new();
        for byte in &combined {
            collected.extend(dribble.push(std::slice::from_ref(byte)).unwrap());
        }

        assert_eq!(collected, expected);
        assert!(dribble.is_empty());
    }

    #[test]
    fn test_trailing_partial_frame_retained() {
        let mut buffer = FrameBuffer::new();
        let first = make_frame(1, TYPE_COMMAND_RESPONSE, b"done");
        let second = make_frame(2, TYPE_COMMAND_RESPONSE, b"pending");

        let mut data = first.clone();
        data.extend_from_slice(&second[..6]);

        let packets = buffer.push(&data).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(buffer.len(), 6);

        let packets = buffer.push(&second[6..]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].id, 2);
    }

    #[test]
    fn test_negative_size_rejected() {
        let mut buffer = FrameBuffer::new();
        let data = (-1i32).to_le_bytes();

        let result = buffer.push(&data);
        assert!(matches!(result, Err(RconError::Protocol(_))));
    }

    #[test]
    fn test_undersized_frame_rejected() {
        let mut buffer = FrameBuffer::new();
        let data = 4i32.to_le_bytes();

        let result = buffer.push(&data);
        assert!(matches!(result, Err(RconError::Protocol(_))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buffer = FrameBuffer::with_max_frame(64);
        let data = 65i32.to_le_bytes();

        let result = buffer.push(&data);
        assert!(matches!(result, Err(RconError::Protocol(_))));
    }

    #[test]
    fn test_clear_discards_partial_data() {
        let mut buffer = FrameBuffer::new();
        let frame = make_frame(1, TYPE_COMMAND_RESPONSE, b"test");
        buffer.push(&frame[..5]).unwrap();
        assert!(!buffer.is_empty());

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
