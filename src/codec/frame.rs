//! Length-prefixed JSON framing.
//!
//! Each frame is a 4-byte big-endian payload length followed by the UTF-8
//! JSON payload. A delivery unit from the transport may carry several
//! frames back to back.

use crate::error::CodecError;
use serde_json::{Map, Value};

/// Size of the length prefix
pub const HEADER_LEN: usize = 4;

/// Default upper bound on a single frame's payload
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Outcome of decoding one frame
#[derive(Debug)]
pub enum Decoded {
    Message(Map<String, Value>),
    /// Frame was delimited correctly but its payload could not be used.
    /// The stream is still in sync.
    Malformed(CodecError),
}

/// Splits delivery units into frames and encodes outbound messages.
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_len: usize,
    reassemble: bool,
    pending: Vec<u8>,
}

impl FrameCodec {
    /// `reassemble` keeps an incomplete trailing frame for the next delivery
    /// unit; without it an overrun is a framing error.
    pub fn new(max_frame_len: usize, reassemble: bool) -> Self {
        Self {
            max_frame_len,
            reassemble,
            pending: Vec::new(),
        }
    }

    /// Codec that rejects frames spanning delivery units
    pub fn strict() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN, false)
    }

    /// Bytes of an incomplete frame waiting for more input
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decodes every complete frame in `unit`.
    ///
    /// An `Err` means the stream can no longer be delimited and the
    /// connection must be dropped. Payload problems come back as
    /// [`Decoded::Malformed`] entries instead.
    pub fn decode(&mut self, unit: &[u8]) -> Result<Vec<Decoded>, CodecError> {
        let mut frames = Vec::new();

        if self.pending.is_empty() {
            let consumed = self.decode_frames(unit, &mut frames)?;
            self.pending.extend_from_slice(&unit[consumed..]);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(unit);
            let consumed = self.decode_frames(&joined, &mut frames)?;
            joined.drain(..consumed);
            self.pending = joined;
        }

        Ok(frames)
    }

    /// Call when the stream ends; leftover partial-frame bytes are an error.
    pub fn finish(&mut self) -> Result<(), CodecError> {
        let pending = std::mem::take(&mut self.pending).len();
        if pending > 0 {
            return Err(CodecError::IncompleteFrame { pending });
        }
        Ok(())
    }

    /// Decodes frames from the front of `buf`, returning bytes consumed.
    fn decode_frames(&self, buf: &[u8], frames: &mut Vec<Decoded>) -> Result<usize, CodecError> {
        let mut offset = 0;

        while offset < buf.len() {
            let remaining = buf.len() - offset;
            if remaining < HEADER_LEN {
                if self.reassemble {
                    break;
                }
                return Err(CodecError::TruncatedHeader { remaining });
            }

            let mut header = [0u8; HEADER_LEN];
            header.copy_from_slice(&buf[offset..offset + HEADER_LEN]);
            let declared = u32::from_be_bytes(header) as usize;

            if declared > self.max_frame_len {
                return Err(CodecError::FrameTooLarge {
                    declared,
                    max: self.max_frame_len,
                });
            }

            let available = remaining - HEADER_LEN;
            if declared > available {
                if self.reassemble {
                    break;
                }
                return Err(CodecError::FrameOverrun {
                    declared,
                    remaining: available,
                });
            }

            let start = offset + HEADER_LEN;
            frames.push(decode_payload(&buf[start..start + declared]));
            offset = start + declared;
        }

        Ok(offset)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN, true)
    }
}

/// Parses one frame payload into a top-level mapping.
pub fn decode_payload(payload: &[u8]) -> Decoded {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Decoded::Message(map),
        Ok(other) => Decoded::Malformed(CodecError::NotAMapping {
            found: value_kind(&other),
        }),
        Err(e) => Decoded::Malformed(CodecError::Payload(e)),
    }
}

/// Serializes `message` and appends one frame to `out`.
pub fn encode_into(message: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge {
        declared: payload.len(),
        max: u32::MAX as usize,
    })?;

    out.reserve(HEADER_LEN + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

/// Encodes a single message as its own delivery unit.
pub fn encode(message: &Value) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode_into(message, &mut out)?;
    Ok(out)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_is_big_endian() {
        let bytes = encode(&json!({"a": 1})).unwrap();
        let payload = br#"{"a":1}"#;
        assert_eq!(&bytes[..HEADER_LEN], &(payload.len() as u32).to_be_bytes());
        assert_eq!(&bytes[HEADER_LEN..], payload);
    }

    #[test]
    fn test_non_mapping_payload_is_malformed() {
        match decode_payload(b"[1, 2]") {
            Decoded::Malformed(CodecError::NotAMapping { found }) => assert_eq!(found, "array"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
