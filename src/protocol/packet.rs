//! RCON packet encoding and decoding.
//!
//! Wire layout, all integers little-endian:
//!
//! ```text
//! ┌────────────┬──────────┬──────────┬─────────────┬────────────┐
//! │ Size       │ Id       │ Type     │ Payload     │ Terminator │
//! │ 4 bytes    │ 4 bytes  │ 4 bytes  │ N bytes     │ 0x00 0x00  │
//! │ int32 LE   │ int32 LE │ int32 LE │             │            │
//! └────────────┴──────────┴──────────┴─────────────┴────────────┘
//! ```
//!
//! The size field counts everything after itself: `10 + len(payload)`.
//!
//! The protocol reuses the numeric value `2` for both `AuthResponse`
//! (server to client) and `Command` (client to server); which one a packet
//! means depends entirely on the connection phase, so the codec carries the
//! raw type value and leaves interpretation to the connection.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{RconError, Result};

/// Server reply to a command, payload = command output.
pub const TYPE_COMMAND_RESPONSE: i32 = 0;

/// Server reply to an auth packet; id mirrors the request on success.
pub const TYPE_AUTH_RESPONSE: i32 = 2;

/// Client command, payload = command text. Same value as
/// [`TYPE_AUTH_RESPONSE`] by protocol design.
pub const TYPE_COMMAND: i32 = 2;

/// Client authentication request, payload = password.
pub const TYPE_AUTH: i32 = 3;

/// Sentinel id carried by an auth response when the password was rejected.
pub const AUTH_FAILURE_ID: i32 = -1;

/// Bytes the size field counts beyond the payload: id + type + terminator.
pub const FRAME_OVERHEAD: usize = 10;

/// Length of the size-field prefix.
pub const SIZE_FIELD_LEN: usize = 4;

/// Two NUL bytes closing every frame.
pub const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Largest payload the i32 size field can represent.
pub const MAX_PAYLOAD_SIZE: usize = i32::MAX as usize - FRAME_OVERHEAD;

/// A decoded protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Correlation id chosen by the client and echoed by the server.
    pub id: i32,
    /// Raw type value; see the `TYPE_*` constants.
    pub ptype: i32,
    /// Payload between the type field and the terminator.
    pub body: Bytes,
}

impl Packet {
    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn body_utf8(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Encode a packet into its on-wire form, size field included.
///
/// Pure and deterministic. Fails with [`RconError::PayloadTooLarge`] when
/// the payload would overflow the size field.
pub fn encode(id: i32, ptype: i32, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(RconError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let size = (payload.len() + FRAME_OVERHEAD) as i32;
    let mut buf = BytesMut::with_capacity(SIZE_FIELD_LEN + size as usize);
    buf.put_i32_le(size);
    buf.put_i32_le(id);
    buf.put_i32_le(ptype);
    buf.put_slice(payload);
    buf.put_slice(&TERMINATOR);
    Ok(buf.freeze())
}

/// Decode one frame body: everything after the size field.
///
/// The caller must already have verified that `body` holds the declared
/// size's worth of bytes; the reassembler does this. Fails with
/// [`RconError::MalformedPacket`] when the contents cannot form a frame.
pub fn decode(body: &[u8]) -> Result<Packet> {
    if body.len() < FRAME_OVERHEAD {
        return Err(RconError::MalformedPacket(format!(
            "frame body of {} bytes is below the {} byte minimum",
            body.len(),
            FRAME_OVERHEAD
        )));
    }

    let terminator = &body[body.len() - TERMINATOR.len()..];
    if terminator != TERMINATOR {
        return Err(RconError::MalformedPacket(format!(
            "frame does not end in the two NUL terminator bytes (got {:02x?})",
            terminator
        )));
    }

    let id = i32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    let ptype = i32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let payload = &body[8..body.len() - TERMINATOR.len()];

    Ok(Packet {
        id,
        ptype,
        body: Bytes::copy_from_slice(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(id: i32, ptype: i32, payload: &[u8]) -> Packet {
        let encoded = encode(id, ptype, payload).unwrap();
        decode(&encoded[SIZE_FIELD_LEN..]).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let encoded = encode(1, TYPE_AUTH, b"secret").unwrap();

        // size = 10 + 6
        assert_eq!(&encoded[0..4], &16i32.to_le_bytes());
        assert_eq!(&encoded[4..8], &1i32.to_le_bytes());
        assert_eq!(&encoded[8..12], &3i32.to_le_bytes());
        assert_eq!(&encoded[12..18], b"secret");
        assert_eq!(&encoded[18..20], &TERMINATOR);
        assert_eq!(encoded.len(), 20);
    }

    #[test]
    fn test_roundtrip_all_types() {
        for ptype in [TYPE_COMMAND_RESPONSE, TYPE_AUTH_RESPONSE, TYPE_AUTH] {
            let packet = roundtrip(7, ptype, b"payload");
            assert_eq!(packet.id, 7);
            assert_eq!(packet.ptype, ptype);
            assert_eq!(&packet.body[..], b"payload");
        }
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let packet = roundtrip(42, TYPE_COMMAND, b"");
        assert_eq!(packet.id, 42);
        assert!(packet.body.is_empty());
    }

    #[test]
    fn test_roundtrip_embedded_nul_bytes() {
        let payload = b"a\x00b\x00c";
        let packet = roundtrip(3, TYPE_COMMAND_RESPONSE, payload);
        assert_eq!(&packet.body[..], payload);
    }

    #[test]
    fn test_roundtrip_negative_and_extreme_ids() {
        for id in [AUTH_FAILURE_ID, 0, i32::MIN, i32::MAX] {
            let packet = roundtrip(id, TYPE_COMMAND, b"x");
            assert_eq!(packet.id, id);
        }
    }

    #[test]
    fn test_payload_size_limit() {
        // Exercising the limit would need a 2 GiB allocation; check the
        // boundary arithmetic and that ordinary payloads pass.
        assert_eq!(MAX_PAYLOAD_SIZE + FRAME_OVERHEAD, i32::MAX as usize);
        assert!(encode(1, TYPE_COMMAND, &[0u8; 16]).is_ok());
    }

    #[test]
    fn test_decode_too_short_rejected() {
        let result = decode(&[0u8; 9]);
        assert!(matches!(result, Err(RconError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_missing_terminator_rejected() {
        let mut encoded = encode(1, TYPE_COMMAND, b"hi").unwrap().to_vec();
        let len = encoded.len();
        encoded[len - 1] = 0xFF;

        let result = decode(&encoded[SIZE_FIELD_LEN..]);
        assert!(matches!(result, Err(RconError::MalformedPacket(_))));
    }

    #[test]
    fn test_body_utf8_lossy() {
        let packet = Packet {
            id: 1,
            ptype: TYPE_COMMAND_RESPONSE,
            body: Bytes::from_static(&[0x68, 0x69, 0xFF]),
        };
        assert_eq!(packet.body_utf8(), "hi\u{FFFD}");
    }
}
