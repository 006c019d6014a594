// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Length-prefixed JSON frame codec for browser native messaging.
//!
//! Wire format: a 4-byte little-endian `u32` payload length followed by
//! exactly that many bytes of UTF-8 JSON. [`FrameCodec`] plugs into
//! `tokio_util::codec::{FramedRead, FramedWrite}`, which handle partial
//! reads and several frames arriving in one read.
//!
//! A bad payload is yielded as an `Err` item rather than a stream error, so
//! one corrupt frame does not end the stream. An oversized length prefix
//! discards whatever is buffered: the following bytes cannot be trusted to
//! start on a frame boundary.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::FrameError;
use crate::message::WireMessage;

/// Default upper bound on a single frame payload (4 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Absolute ceiling regardless of configuration (64 MiB, the largest
/// message a browser will send to a native host).
pub const MAX_FRAME_HARD_LIMIT: usize = 64 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Result of decoding one frame: the JSON payload or the reason it was rejected.
pub type DecodedFrame = Result<Value, FrameError>;

/// Encoder/decoder for native messaging frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Codec with a custom payload bound, clamped to [`MAX_FRAME_HARD_LIMIT`].
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.min(MAX_FRAME_HARD_LIMIT),
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn encode_payload<T: Serialize>(&self, item: &T, dst: &mut BytesMut) -> Result<(), FrameError> {
        let payload = serde_json::to_vec(item).map_err(FrameError::Serialize)?;
        if payload.len() > self.max_frame_len {
            return Err(FrameError::TooLarge {
                size: payload.len(),
                max: self.max_frame_len,
            });
        }

        dst.reserve(LEN_PREFIX + payload.len());
        dst.put_u32_le(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = DecodedFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEN_PREFIX {
            return Ok(None);
        }

        let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_frame_len {
            warn!(
                declared = len,
                max = self.max_frame_len,
                discarded = src.len(),
                "oversized frame length, discarding buffered bytes"
            );
            src.clear();
            return Ok(Some(Err(FrameError::TooLarge {
                size: len,
                max: self.max_frame_len,
            })));
        }

        if src.len() < LEN_PREFIX + len {
            src.reserve(LEN_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        let payload = src.split_to(len);
        Ok(Some(
            serde_json::from_slice(&payload).map_err(FrameError::InvalidJson),
        ))
    }
}

impl Encoder<WireMessage> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: WireMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_payload(&item, dst)
    }
}

impl Encoder<Value> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_payload(&item, dst)
    }
}

/// Encode one message into a standalone frame using the default bound.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
    let mut buf = BytesMut::new();
    FrameCodec::new().encode_payload(message, &mut buf)?;
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use proptest::prelude::*;
    use serde_json::json;
    use tokio_util::codec::FramedRead;

    fn decode_all(codec: &mut FrameCodec, buf: &mut BytesMut) -> Vec<DecodedFrame> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn prefix_is_little_endian_length() {
        let bytes = encode_frame(&json!({"type": "connection-test"})).unwrap();
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), LEN_PREFIX + len);
        assert_eq!(&bytes[4..], br#"{"type":"connection-test"}"#);
    }

    #[test]
    fn multiple_frames_in_one_read_are_emitted_in_order() {
        let mut buf = BytesMut::new();
        for n in 0..3 {
            buf.extend_from_slice(&encode_frame(&json!({ "n": n })).unwrap());
        }

        let mut codec = FrameCodec::new();
        let frames = decode_all(&mut codec, &mut buf);
        let ns: Vec<i64> = frames
            .into_iter()
            .map(|f| f.unwrap()["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_reads_are_buffered_byte_by_byte() {
        let bytes = encode_frame(&json!({ "domain": "example.com", "n": [1, 2, 3] })).unwrap();
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        let mut decoded = Vec::new();
        for byte in &bytes {
            buf.put_u8(*byte);
            if let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame.unwrap());
            }
        }

        assert_eq!(decoded, vec![json!({ "domain": "example.com", "n": [1, 2, 3] })]);
    }

    #[test]
    fn invalid_json_consumes_only_its_own_frame() {
        let mut buf = BytesMut::new();
        let garbage = b"{not json";
        buf.put_u32_le(garbage.len() as u32);
        buf.extend_from_slice(garbage);
        buf.extend_from_slice(&encode_frame(&json!({ "ok": true })).unwrap());

        let mut codec = FrameCodec::new();
        let frames = decode_all(&mut codec, &mut buf);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Err(FrameError::InvalidJson(_))));
        assert_eq!(frames[1].as_ref().unwrap(), &json!({ "ok": true }));
    }

    #[test]
    fn oversized_length_is_rejected_and_buffer_discarded() {
        let mut codec = FrameCodec::with_max_frame_len(16);
        let mut buf = BytesMut::new();
        buf.put_u32_le(1_000_000);
        buf.extend_from_slice(b"trailing bytes");

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(frame, Err(FrameError::TooLarge { size: 1_000_000, max: 16 })));
        assert!(buf.is_empty());

        // The codec is usable again once the stream is back on a boundary.
        buf.extend_from_slice(&encode_frame(&json!(1)).unwrap());
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!(1));
    }

    #[test]
    fn encoding_respects_the_bound() {
        let mut codec = FrameCodec::with_max_frame_len(8);
        let mut buf = BytesMut::new();
        let err = codec
            .encode(json!({ "too": "long for eight bytes" }), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { max: 8, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn configured_bound_is_clamped_to_hard_limit() {
        let codec = FrameCodec::with_max_frame_len(usize::MAX);
        assert_eq!(codec.max_frame_len(), MAX_FRAME_HARD_LIMIT);
    }

    #[tokio::test]
    async fn framed_read_yields_lazy_sequence_and_ends_at_eof() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode_frame(&json!({ "seq": 1 })).unwrap());
        wire.extend_from_slice(&encode_frame(&json!({ "seq": "двa" })).unwrap());

        let mut frames = FramedRead::new(wire.as_slice(), FrameCodec::new());
        let first = frames.next().await.unwrap().unwrap().unwrap();
        let second = frames.next().await.unwrap().unwrap().unwrap();
        assert_eq!(first["seq"], 1);
        assert_eq!(second["seq"], "двa");
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_frame_at_eof_is_an_io_error() {
        let bytes = encode_frame(&json!({ "cut": "short" })).unwrap();
        let truncated = &bytes[..bytes.len() - 2];

        let mut frames = FramedRead::new(truncated, FrameCodec::new());
        assert!(matches!(frames.next().await, Some(Err(FrameError::Io(_)))));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "\\PC{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("\\PC{0,12}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn encode_then_decode_is_identity(value in arb_json()) {
            let mut buf = BytesMut::from(encode_frame(&value).unwrap().as_slice());
            let decoded = FrameCodec::new().decode(&mut buf).unwrap().unwrap().unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert!(buf.is_empty());
        }
    }
}
