use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: 4-byte little-endian `i32`.
pub const PREFIX_SIZE: usize = 4;

/// Largest payload a signed 32-bit prefix can declare.
pub const DEFAULT_MAX_PAYLOAD: usize = i32::MAX as usize;

/// A framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload. Empty for non-positive declared lengths.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (prefix + payload).
    pub fn wire_size(&self) -> usize {
        PREFIX_SIZE + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// ```text
/// ┌──────────────┬─────────────────┐
/// │ Length       │ Payload         │
/// │ (4B i32 LE)  │ (Length bytes)  │
/// └──────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = i32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: DEFAULT_MAX_PAYLOAD,
    })?;
    dst.reserve(PREFIX_SIZE + payload.len());
    dst.put_i32_le(len);
    dst.put_slice(payload);
    Ok(())
}

/// Interpret a raw length prefix.
pub fn decode_prefix(prefix: [u8; PREFIX_SIZE]) -> i32 {
    i32::from_le_bytes(prefix)
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A non-positive
/// declared length yields an empty frame and consumes only the prefix.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < PREFIX_SIZE {
        return Ok(None);
    }

    let declared = decode_prefix([src[0], src[1], src[2], src[3]]);
    let payload_len = usize::try_from(declared).unwrap_or(0);

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < PREFIX_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(PREFIX_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Frame { payload }))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes, in either direction.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
