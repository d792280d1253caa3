//! Wire formats spoken by the homeguard hub.
//!
//! - [`sms`]: tokenizer for the modem's unsolicited notifications and
//!   stored-message list dumps
//! - [`at`]: AT commands the SMS gateway issues
//! - [`bridge`]: line codec for the companion keypad board
//! - [`realtime`]: text protocol of real-time subscribers
//! - [`api`]: JSON bodies exchanged with the remote authorization service

pub mod api;
pub mod at;
pub mod bridge;
pub mod realtime;
pub mod sms;

pub use api::{AuthRequest, AuthResponse, SensorReport};
pub use at::{AtCommand, ModemText, SmsSubmit};
pub use bridge::{BridgeCodec, BridgeFrame, BridgeMessage};
pub use realtime::{
    BroadcastEvent, Outbound, SubscriberCommand, SubscriberId, SubscriberMessage,
};
pub use sms::{Notifications, RecordError, SmsRecord, StoredMessages, StoredRecords};
