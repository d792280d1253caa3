//! Mock companion keypad board.
//!
//! The handle writes raw bytes as the companion would put them on the wire;
//! the mock decodes them with the real [`BridgeCodec`] on each poll.

use crate::{HardwareError, Result, traits::BridgeLink};
use bytes::BytesMut;
use homeguard_protocol::{BridgeCodec, BridgeFrame, BridgeMessage};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::codec::Decoder;

#[derive(Debug, Default)]
struct Wire {
    inbound: BytesMut,
    outbound: Vec<BridgeMessage>,
}

/// Mock bridge link for testing and development.
#[derive(Debug)]
pub struct MockBridge {
    wire: Arc<Mutex<Wire>>,
    codec: BridgeCodec,
}

/// Plays the companion board's side of a [`MockBridge`].
#[derive(Debug, Clone)]
pub struct MockBridgeHandle {
    wire: Arc<Mutex<Wire>>,
}

impl MockBridge {
    pub fn new() -> (Self, MockBridgeHandle) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        (
            Self {
                wire: Arc::clone(&wire),
                codec: BridgeCodec::new(),
            },
            MockBridgeHandle { wire },
        )
    }
}

impl BridgeLink for MockBridge {
    async fn try_recv(&mut self) -> Result<Option<BridgeFrame>> {
        let mut wire = self.wire.lock().unwrap_or_else(PoisonError::into_inner);
        self.codec
            .decode(&mut wire.inbound)
            .map_err(|e| HardwareError::invalid_data(e.to_string()))
    }

    async fn send(&mut self, message: BridgeMessage) -> Result<()> {
        self.wire
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .outbound
            .push(message);
        Ok(())
    }
}

impl MockBridgeHandle {
    /// Write raw bytes from the companion side.
    pub fn write(&self, bytes: &[u8]) {
        self.wire
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .inbound
            .extend_from_slice(bytes);
    }

    /// Forward a keypad entry as the companion firmware does.
    pub fn enter_code(&self, digits: &str) {
        self.write(format!("KEYPAD:{digits}\n").as_bytes());
    }

    /// Messages the hub sent to the companion, oldest first.
    pub fn received(&self) -> Vec<BridgeMessage> {
        self.wire
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .outbound
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_frame_per_poll() {
        let (mut bridge, handle) = MockBridge::new();
        handle.enter_code("1234");
        handle.enter_code("5678");

        assert_eq!(
            bridge.try_recv().await.unwrap(),
            Some(BridgeFrame::Keypad("1234".into()))
        );
        assert_eq!(
            bridge.try_recv().await.unwrap(),
            Some(BridgeFrame::Keypad("5678".into()))
        );
        assert_eq!(bridge.try_recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_line_not_delivered() {
        let (mut bridge, handle) = MockBridge::new();
        handle.write(b"KEYPAD:12");
        assert_eq!(bridge.try_recv().await.unwrap(), None);
        handle.write(b"\r\n");
        assert_eq!(
            bridge.try_recv().await.unwrap(),
            Some(BridgeFrame::Keypad("12".into()))
        );
    }

    #[tokio::test]
    async fn test_sent_messages_recorded() {
        let (mut bridge, handle) = MockBridge::new();
        bridge
            .send(BridgeMessage::AccessResult { granted: true })
            .await
            .unwrap();
        assert_eq!(
            handle.received(),
            vec![BridgeMessage::AccessResult { granted: true }]
        );
    }
}
