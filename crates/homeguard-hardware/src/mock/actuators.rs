//! Mock output devices: door servo, light relay and status LEDs.
//!
//! Each device records every command with the (tokio) time it was issued, so
//! tests running on a paused clock can assert exact timings.

use crate::{
    HardwareError, Result,
    traits::{DoorActuator, Indicators, Relay},
    types::{Indication, ServoPosition},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

/// Shared command log between a mock device and its handle.
#[derive(Debug)]
struct Journal<T> {
    entries: Arc<Mutex<Vec<(T, Instant)>>>,
    failing: Arc<AtomicBool>,
}

impl<T> Clone for Journal<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            failing: Arc::clone(&self.failing),
        }
    }
}

impl<T: Copy> Journal<T> {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn record(&self, device: &str, value: T) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(HardwareError::disconnected(device));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((value, Instant::now()));
        Ok(())
    }

    fn last(&self) -> Option<T> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(value, _)| *value)
    }

    fn history(&self) -> Vec<(T, Instant)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

/// Mock door servo.
#[derive(Debug)]
pub struct MockDoor {
    journal: Journal<ServoPosition>,
}

/// Observes and controls a [`MockDoor`].
#[derive(Debug, Clone)]
pub struct MockDoorHandle {
    journal: Journal<ServoPosition>,
}

impl MockDoor {
    pub fn new() -> (Self, MockDoorHandle) {
        let journal = Journal::new();
        (
            Self {
                journal: journal.clone(),
            },
            MockDoorHandle { journal },
        )
    }
}

impl DoorActuator for MockDoor {
    async fn set_position(&mut self, position: ServoPosition) -> Result<()> {
        self.journal.record("door servo", position)
    }
}

impl MockDoorHandle {
    /// Last commanded position; a servo never commanded is closed.
    pub fn position(&self) -> ServoPosition {
        self.journal.last().unwrap_or(ServoPosition::Closed)
    }

    pub fn history(&self) -> Vec<(ServoPosition, Instant)> {
        self.journal.history()
    }

    /// Make every following command fail, simulating a dead servo.
    pub fn set_failing(&self, failing: bool) {
        self.journal.set_failing(failing);
    }
}

/// Mock light relay.
#[derive(Debug)]
pub struct MockRelay {
    journal: Journal<bool>,
}

/// Observes a [`MockRelay`].
#[derive(Debug, Clone)]
pub struct MockRelayHandle {
    journal: Journal<bool>,
}

impl MockRelay {
    pub fn new() -> (Self, MockRelayHandle) {
        let journal = Journal::new();
        (
            Self {
                journal: journal.clone(),
            },
            MockRelayHandle { journal },
        )
    }
}

impl Relay for MockRelay {
    async fn set_energized(&mut self, on: bool) -> Result<()> {
        self.journal.record("light relay", on)
    }
}

impl MockRelayHandle {
    pub fn is_on(&self) -> bool {
        self.journal.last().unwrap_or(false)
    }

    pub fn history(&self) -> Vec<(bool, Instant)> {
        self.journal.history()
    }
}

/// Mock status LEDs.
#[derive(Debug)]
pub struct MockIndicators {
    journal: Journal<Indication>,
}

/// Observes [`MockIndicators`].
#[derive(Debug, Clone)]
pub struct MockIndicatorsHandle {
    journal: Journal<Indication>,
}

impl MockIndicators {
    pub fn new() -> (Self, MockIndicatorsHandle) {
        let journal = Journal::new();
        (
            Self {
                journal: journal.clone(),
            },
            MockIndicatorsHandle { journal },
        )
    }
}

impl Indicators for MockIndicators {
    async fn show(&mut self, indication: Indication) -> Result<()> {
        self.journal.record("indicators", indication)
    }
}

impl MockIndicatorsHandle {
    pub fn current(&self) -> Indication {
        self.journal.last().unwrap_or(Indication::Off)
    }

    pub fn history(&self) -> Vec<Indication> {
        self.journal.history().into_iter().map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_door_records_positions() {
        let (mut door, handle) = MockDoor::new();
        assert_eq!(handle.position(), ServoPosition::Closed);

        door.set_position(ServoPosition::Open).await.unwrap();
        assert_eq!(handle.position(), ServoPosition::Open);

        door.set_position(ServoPosition::Closed).await.unwrap();
        assert_eq!(handle.history().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_door() {
        let (mut door, handle) = MockDoor::new();
        handle.set_failing(true);

        let result = door.set_position(ServoPosition::Open).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
        assert!(handle.history().is_empty());
    }

    #[tokio::test]
    async fn test_relay_state() {
        let (mut relay, handle) = MockRelay::new();
        assert!(!handle.is_on());
        relay.set_energized(true).await.unwrap();
        assert!(handle.is_on());
    }

    #[tokio::test]
    async fn test_indicators_history() {
        let (mut leds, handle) = MockIndicators::new();
        leds.show(Indication::Denied).await.unwrap();
        leds.show(Indication::Off).await.unwrap();
        assert_eq!(handle.history(), vec![Indication::Denied, Indication::Off]);
        assert_eq!(handle.current(), Indication::Off);
    }
}
