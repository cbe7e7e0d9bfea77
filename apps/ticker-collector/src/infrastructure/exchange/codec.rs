//! Frame Codec Module
//!
//! Turns raw WebSocket frames into venue wire messages and serializes
//! outbound handshakes.
//!
//! # Compression
//!
//! Upbit may deliver binary frames as gzip streams. When sniffing is enabled,
//! a binary payload starting with the gzip magic bytes `1f 8b` is inflated
//! before JSON parsing; anything else (including payloads shorter than two
//! bytes) is parsed as-is. Text frames are never sniffed.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Leading bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Gzip inflation failed.
    #[error("gzip decompression failed: {0}")]
    Decompress(#[from] std::io::Error),

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// Transport framing of an inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 text frame.
    Text,
    /// Binary frame, possibly gzip-compressed.
    Binary,
}

/// Check whether a payload starts with the gzip magic bytes.
#[must_use]
pub fn is_gzip(payload: &[u8]) -> bool {
    payload.starts_with(&GZIP_MAGIC)
}

/// JSON codec with optional gzip sniffing on binary frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec {
    gzip_sniffing: bool,
}

impl JsonCodec {
    /// Plain JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gzip_sniffing: false,
        }
    }

    /// JSON codec that inflates gzip-framed binary payloads.
    #[must_use]
    pub const fn with_gzip_sniffing() -> Self {
        Self {
            gzip_sniffing: true,
        }
    }

    /// Whether binary frames are sniffed for gzip.
    #[must_use]
    pub const fn gzip_sniffing(&self) -> bool {
        self.gzip_sniffing
    }

    /// Raw JSON bytes of a frame, inflated if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decompress`] if a gzip-marked payload is corrupt.
    pub fn payload<'a>(
        &self,
        kind: FrameKind,
        bytes: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, CodecError> {
        if self.gzip_sniffing && kind == FrameKind::Binary && is_gzip(bytes) {
            let mut inflated = Vec::with_capacity(bytes.len() * 4);
            GzDecoder::new(bytes).read_to_end(&mut inflated)?;
            Ok(Cow::Owned(inflated))
        } else {
            Ok(Cow::Borrowed(bytes))
        }
    }

    /// Decode a frame into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if decompression or JSON parsing fails.
    pub fn decode<T: DeserializeOwned>(
        &self,
        kind: FrameKind,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        let payload = self.payload(kind, bytes)?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Encode an outbound message as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        code: String,
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn sniffing_inflates_gzip_binary() {
        let codec = JsonCodec::with_gzip_sniffing();
        let frame = gzip(br#"{"code":"KRW-BTC"}"#);

        let probe: Probe = codec.decode(FrameKind::Binary, &frame).unwrap();
        assert_eq!(probe.code, "KRW-BTC");
    }

    #[test]
    fn sniffing_passes_plain_binary_through() {
        let codec = JsonCodec::with_gzip_sniffing();
        let probe: Probe = codec
            .decode(FrameKind::Binary, br#"{"code":"KRW-ETH"}"#)
            .unwrap();
        assert_eq!(probe.code, "KRW-ETH");
    }

    #[test]
    fn short_payloads_are_not_sniffed() {
        let codec = JsonCodec::with_gzip_sniffing();
        assert!(matches!(
            codec.payload(FrameKind::Binary, &[0x1f]).unwrap(),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            codec.payload(FrameKind::Binary, &[]).unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let codec = JsonCodec::with_gzip_sniffing();
        let result = codec.payload(FrameKind::Binary, &[0x1f, 0x8b, 0x00, 0x01]);
        assert!(matches!(result, Err(CodecError::Decompress(_))));
    }

    #[test]
    fn plain_codec_ignores_gzip_marker() {
        let codec = JsonCodec::new();
        let frame = gzip(br#"{"code":"KRW-BTC"}"#);
        let result: Result<Probe, _> = codec.decode(FrameKind::Binary, &frame);
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn text_frames_are_never_inflated() {
        let codec = JsonCodec::with_gzip_sniffing();
        let frame = gzip(b"{}");
        assert!(matches!(
            codec.payload(FrameKind::Text, &frame).unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let codec = JsonCodec::new();
        let result: Result<Probe, _> = codec.decode(FrameKind::Text, b"{not json");
        assert!(matches!(result, Err(CodecError::Json(_))));
    }
}
