//! Hardware device trait definitions.
//!
//! These traits are the contract between the hub's control loop and the
//! peripherals it drives. All methods use native `async fn` (edition 2024
//! RPITIT), so the traits are not object-safe: the hub is generic over the
//! concrete device types, and [`devices`](crate::devices) provides enum
//! wrappers where one slot must hold either a mock or a real link.
//!
//! Every input-side method is non-blocking: it returns whatever is available
//! right now, or nothing. The control loop polls each device once per tick
//! and must never wait on a quiet channel.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{CardRead, ClimateReading, Indication, ServoPosition};
use homeguard_protocol::{BridgeFrame, BridgeMessage};

/// Servo that moves the door latch.
pub trait DoorActuator {
    async fn set_position(&mut self, position: ServoPosition) -> Result<()>;
}

/// Relay switching the light bulb.
pub trait Relay {
    async fn set_energized(&mut self, on: bool) -> Result<()>;
}

/// RFID reader.
///
/// # Examples
///
/// ```no_run
/// use homeguard_hardware::traits::RfidReader;
/// use homeguard_hardware::error::Result;
///
/// async fn poll_uid<R: RfidReader>(reader: &mut R) -> Result<Option<String>> {
///     Ok(reader.try_read_card().await?.map(|card| card.uid_hex()))
/// }
/// ```
pub trait RfidReader {
    /// Return a newly presented tag, if any.
    async fn try_read_card(&mut self) -> Result<Option<CardRead>>;

    /// Switch the antenna on or off. A reader that is not sensing never
    /// reports cards.
    async fn set_sensing(&mut self, enabled: bool) -> Result<()>;
}

/// Temperature and humidity sensor.
pub trait ClimateSensor {
    /// # Errors
    /// Returns `HardwareError::SensorReadError` when the sample is unusable.
    async fn read(&mut self) -> Result<ClimateReading>;
}

/// Status LEDs.
pub trait Indicators {
    async fn show(&mut self, indication: Indication) -> Result<()>;
}

/// Raw text link to the cellular modem.
pub trait ModemLink {
    /// Write `data` exactly as given; callers add terminators.
    async fn write(&mut self, data: &str) -> Result<()>;

    /// Drain everything the modem has emitted since the last call.
    async fn read_available(&mut self) -> Result<String>;
}

/// Line link to the companion keypad board.
pub trait BridgeLink {
    /// Return the next complete line, if any.
    async fn try_recv(&mut self) -> Result<Option<BridgeFrame>>;

    async fn send(&mut self, message: BridgeMessage) -> Result<()>;
}

/// Uplink used for remote authorization and reports.
pub trait NetworkLink {
    async fn is_connected(&mut self) -> bool;

    /// # Errors
    /// Returns an error if the link is still down afterwards.
    async fn reconnect(&mut self) -> Result<()>;
}
