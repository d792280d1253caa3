//! Homeguard Hub
//!
//! The orchestration core of the home hub: a single control loop that reads
//! SMS commands, keypad codes, RFID tags and subscriber messages, decides
//! access against the remote authorization service and drives the door,
//! light and indicators.
//!
//! ## Architecture
//!
//! - [`Hub`]: owns the state and every device; one [`Hub::tick`] per loop
//! - [`DoorController`]: lock state plus the single relock deadline
//! - [`AccessAuthorizer`]: fail-closed remote authorization
//! - [`SmsGateway`]: AT-command modem driver and SMS inbox
//! - [`AlertNotifier`]: audit messages to the administrator
//! - [`EventBroadcaster`]: state changes to real-time subscribers
//! - [`dispatcher`]: pure command routing

#![allow(async_fn_in_trait)]

pub mod authorizer;
pub mod broadcaster;
pub mod dispatcher;
pub mod door;
pub mod error;
mod hub;
pub mod notifier;
pub mod sms_gateway;

pub use authorizer::AccessAuthorizer;
pub use broadcaster::EventBroadcaster;
pub use door::{DoorController, DoorState};
pub use error::{HubError, Result};
pub use hub::{Devices, Hub, Platform};
pub use notifier::{Alert, AlertNotifier};
pub use sms_gateway::SmsGateway;
