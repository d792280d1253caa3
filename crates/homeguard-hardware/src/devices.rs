//! Enum wrappers for link dispatch.
//!
//! Native `async fn` in traits is not object-safe, so a slot that holds
//! either a mock or a real serial link uses an enum instead of
//! `Box<dyn ModemLink>`. Dispatch is resolved at compile time and the serial
//! variants disappear when the `serial` feature is off.
//!
//! # Examples
//!
//! ```
//! use homeguard_hardware::devices::AnyModem;
//! use homeguard_hardware::mock::MockModem;
//!
//! let (modem, _handle) = MockModem::new();
//! let any_modem = AnyModem::Mock(modem);
//! ```

use crate::mock::{MockBridge, MockModem};
#[cfg(feature = "serial")]
use crate::serial::{SerialBridge, SerialModem};
use crate::traits::{BridgeLink, ModemLink};
use crate::Result;
use homeguard_protocol::{BridgeFrame, BridgeMessage};

/// Enum wrapper for modem link dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyModem {
    Mock(MockModem),
    #[cfg(feature = "serial")]
    Serial(SerialModem),
}

impl ModemLink for AnyModem {
    async fn write(&mut self, data: &str) -> Result<()> {
        match self {
            Self::Mock(link) => link.write(data).await,
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.write(data).await,
        }
    }

    async fn read_available(&mut self) -> Result<String> {
        match self {
            Self::Mock(link) => link.read_available().await,
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.read_available().await,
        }
    }
}

/// Enum wrapper for bridge link dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyBridge {
    Mock(MockBridge),
    #[cfg(feature = "serial")]
    Serial(SerialBridge),
}

impl BridgeLink for AnyBridge {
    async fn try_recv(&mut self) -> Result<Option<BridgeFrame>> {
        match self {
            Self::Mock(link) => link.try_recv().await,
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.try_recv().await,
        }
    }

    async fn send(&mut self, message: BridgeMessage) -> Result<()> {
        match self {
            Self::Mock(link) => link.send(message).await,
            #[cfg(feature = "serial")]
            Self::Serial(link) => link.send(message).await,
        }
    }
}
