//! Mock RFID reader.
//!
//! Tags are presented through a [`MockRfidHandle`] and picked up by the next
//! poll. While the antenna is off, presented tags stay queued and are not
//! reported.

use crate::{
    HardwareError, Result,
    traits::RfidReader,
    types::CardRead,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Mock RFID reader for testing and development.
///
/// # Examples
///
/// ```
/// use homeguard_hardware::mock::MockRfid;
/// use homeguard_hardware::traits::RfidReader;
///
/// #[tokio::main]
/// async fn main() -> homeguard_hardware::Result<()> {
///     let (mut reader, handle) = MockRfid::new();
///
///     handle.present_card(vec![0x04, 0xAB]).await?;
///
///     let card = reader.try_read_card().await?.unwrap();
///     assert_eq!(card.uid_hex(), "04ab");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRfid {
    card_rx: mpsc::Receiver<CardRead>,
    sensing: Arc<AtomicBool>,
}

impl MockRfid {
    pub fn new() -> (Self, MockRfidHandle) {
        let (card_tx, card_rx) = mpsc::channel(32);
        let sensing = Arc::new(AtomicBool::new(true));

        let reader = Self {
            card_rx,
            sensing: Arc::clone(&sensing),
        };
        let handle = MockRfidHandle { card_tx, sensing };

        (reader, handle)
    }
}

impl RfidReader for MockRfid {
    async fn try_read_card(&mut self) -> Result<Option<CardRead>> {
        if !self.sensing.load(Ordering::Relaxed) {
            return Ok(None);
        }
        match self.card_rx.try_recv() {
            Ok(card) => Ok(Some(card)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(HardwareError::disconnected("RFID event channel closed"))
            }
        }
    }

    async fn set_sensing(&mut self, enabled: bool) -> Result<()> {
        self.sensing.store(enabled, Ordering::Relaxed);
        Ok(())
    }
}

/// Handle for presenting tags to a [`MockRfid`].
#[derive(Debug, Clone)]
pub struct MockRfidHandle {
    card_tx: mpsc::Sender<CardRead>,
    sensing: Arc<AtomicBool>,
}

impl MockRfidHandle {
    /// Present a tag to the reader.
    ///
    /// # Errors
    /// Returns `HardwareError::Disconnected` if the reader was dropped.
    pub async fn present_card(&self, uid: Vec<u8>) -> Result<()> {
        self.card_tx
            .send(CardRead::new(uid))
            .await
            .map_err(|_| HardwareError::disconnected("RFID reader dropped"))
    }

    /// Whether the antenna is currently on.
    pub fn is_sensing(&self) -> bool {
        self.sensing.load(Ordering::Relaxed)
    }
}
