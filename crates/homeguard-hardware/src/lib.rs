//! Hardware abstraction layer for the homeguard hub.
//!
//! Trait-based abstractions for every peripheral the hub drives: door servo,
//! light relay, RFID reader, climate sensor, status LEDs, cellular modem,
//! companion keypad bridge and network uplink. Mock implementations with
//! control handles stand in for real hardware during development and tests;
//! the `serial` feature adds modem and bridge links over real serial ports.
//!
//! # Design
//!
//! - **Async-first**: native `async fn` in traits (edition 2024 RPITIT).
//! - **Poll, never wait**: input methods return what is available now.
//! - **Error-aware**: all operations return [`Result<T>`][error::Result]
//!   with a [`HardwareError`].
//!
//! ```no_run
//! use homeguard_hardware::traits::{DoorActuator, Relay};
//! use homeguard_hardware::types::ServoPosition;
//! use homeguard_hardware::error::Result;
//!
//! async fn lock_down<D: DoorActuator, L: Relay>(door: &mut D, light: &mut L) -> Result<()> {
//!     door.set_position(ServoPosition::Closed).await?;
//!     light.set_energized(false).await
//! }
//! ```

pub mod devices;
pub mod error;
#[cfg(any(feature = "serial", test))]
mod frames;
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;
pub mod types;

pub use devices::{AnyBridge, AnyModem};
pub use error::{HardwareError, Result};
pub use traits::{
    BridgeLink, ClimateSensor, DoorActuator, Indicators, ModemLink, NetworkLink, Relay, RfidReader,
};
pub use types::{CardRead, ClimateReading, Indication, ServoPosition};
