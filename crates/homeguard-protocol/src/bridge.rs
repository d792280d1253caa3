//! Line codec for the companion keypad board.
//!
//! The companion forwards keypad entries as `KEYPAD:<digits>` lines and
//! receives the authorization outcome plus periodic climate readings:
//!
//! ```text
//! companion -> hub   KEYPAD:1234
//! hub -> companion   {"status":"GRANTED"}
//! hub -> companion   TEMP:24.50,HUM:61.00
//! ```
//!
//! Lines are `\n` terminated; a trailing `\r` is ignored. Lines longer than
//! the configured limit are dropped whole so a noisy link cannot grow the
//! buffer without bound.

use bytes::{BufMut, BytesMut};
use homeguard_core::constants::{AUTH_STATUS_DENIED, AUTH_STATUS_GRANTED, BRIDGE_KEYPAD_PREFIX};
use homeguard_core::{Error, Result};
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

/// Longest accepted inbound line, excluding the terminator.
const DEFAULT_MAX_LINE_LENGTH: usize = 256;

/// One line received from the companion board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeFrame {
    /// Payload of a `KEYPAD:` line, not yet validated.
    Keypad(String),

    /// Any other line; the hub ignores these.
    Unrecognized(String),
}

impl BridgeFrame {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.strip_prefix(BRIDGE_KEYPAD_PREFIX) {
            Some(digits) => BridgeFrame::Keypad(digits.trim().to_string()),
            None => BridgeFrame::Unrecognized(line.to_string()),
        }
    }
}

/// One line sent to the companion board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeMessage {
    AccessResult { granted: bool },
    Climate { temperature: f32, humidity: f32 },
}

#[derive(Serialize)]
struct StatusLine {
    status: &'static str,
}

impl BridgeMessage {
    /// Wire form without the line terminator.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the status line cannot be
    /// serialized.
    pub fn to_line(&self) -> Result<String> {
        match *self {
            BridgeMessage::AccessResult { granted } => {
                let status = if granted {
                    AUTH_STATUS_GRANTED
                } else {
                    AUTH_STATUS_DENIED
                };
                serde_json::to_string(&StatusLine { status })
                    .map_err(|e| Error::InvalidMessageFormat(e.to_string()))
            }
            BridgeMessage::Climate {
                temperature,
                humidity,
            } => Ok(format!("TEMP:{temperature:.2},HUM:{humidity:.2}")),
        }
    }
}

/// Tokio codec for the companion bridge.
#[derive(Debug)]
pub struct BridgeCodec {
    max_line_length: usize,

    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl BridgeCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    #[must_use]
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            discarding: false,
        }
    }

    #[must_use]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for BridgeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BridgeCodec {
    type Item = BridgeFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(newline) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > self.max_line_length {
                    src.clear();
                    self.discarding = true;
                }
                return Ok(None);
            };

            let line = src.split_to(newline + 1);
            if std::mem::take(&mut self.discarding) {
                continue;
            }

            let text = String::from_utf8_lossy(&line[..newline]);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if text.len() > self.max_line_length {
                continue;
            }
            return Ok(Some(BridgeFrame::parse(text)));
        }
    }
}

impl Encoder<BridgeMessage> for BridgeCodec {
    type Error = Error;

    fn encode(&mut self, item: BridgeMessage, dst: &mut BytesMut) -> Result<()> {
        let line = item.to_line()?;
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn decode_all(codec: &mut BridgeCodec, input: &[u8]) -> Vec<BridgeFrame> {
        let mut buf = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[rstest]
    #[case("KEYPAD:1234", BridgeFrame::Keypad("1234".into()))]
    #[case("KEYPAD: 42 ", BridgeFrame::Keypad("42".into()))]
    #[case("KEYPAD:", BridgeFrame::Keypad(String::new()))]
    #[case("HELLO", BridgeFrame::Unrecognized("HELLO".into()))]
    #[case("keypad:1234", BridgeFrame::Unrecognized("keypad:1234".into()))]
    fn test_parse(#[case] line: &str, #[case] expected: BridgeFrame) {
        assert_eq!(BridgeFrame::parse(line), expected);
    }

    #[test]
    fn test_decode_crlf_lines() {
        let mut codec = BridgeCodec::new();
        let frames = decode_all(&mut codec, b"KEYPAD:1234\r\n\r\nKEYPAD:9\n");
        assert_eq!(
            frames,
            vec![
                BridgeFrame::Keypad("1234".into()),
                BridgeFrame::Keypad("9".into())
            ]
        );
    }

    #[test]
    fn test_decode_partial_line_waits() {
        let mut codec = BridgeCodec::new();
        let mut buf = BytesMut::from(&b"KEYPAD:12"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"34\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(BridgeFrame::Keypad("1234".into()))
        );
    }

    #[test]
    fn test_oversized_line_discarded() {
        let mut codec = BridgeCodec::with_max_line_length(8);
        let mut buf = BytesMut::from(&b"KEYPAD:123456789"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"0000\nKEYPAD:1\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(BridgeFrame::Keypad("1".into()))
        );
    }

    #[rstest]
    #[case(BridgeMessage::AccessResult { granted: true }, "{\"status\":\"GRANTED\"}\n")]
    #[case(BridgeMessage::AccessResult { granted: false }, "{\"status\":\"DENIED\"}\n")]
    #[case(BridgeMessage::Climate { temperature: 24.5, humidity: 61.0 }, "TEMP:24.50,HUM:61.00\n")]
    fn test_encode(#[case] message: BridgeMessage, #[case] wire: &str) {
        let mut codec = BridgeCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(message, &mut buf).unwrap();
        assert_eq!(&buf[..], wire.as_bytes());
    }
}
