//! Mock device implementations for testing and development.
//!
//! Every mock is created together with a handle that tests (or the binary,
//! when no real port is configured) use to drive and observe it.

pub mod actuators;
pub mod bridge;
pub mod climate;
pub mod modem;
pub mod network;
pub mod rfid;

pub use actuators::{
    MockDoor, MockDoorHandle, MockIndicators, MockIndicatorsHandle, MockRelay, MockRelayHandle,
};
pub use bridge::{MockBridge, MockBridgeHandle};
pub use climate::{MockClimate, MockClimateHandle};
pub use modem::{MockModem, MockModemHandle, SentSms};
pub use network::{MockNetwork, MockNetworkHandle};
pub use rfid::{MockRfid, MockRfidHandle};
