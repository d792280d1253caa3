//! Text protocol spoken with real-time subscribers.
//!
//! Each connection sends one command per line and receives per-command
//! replies plus JSON event lines broadcast to every subscriber.
//!
//! ```text
//! subscriber -> hub   TOGGLE
//! hub -> all          {"bulb":"on"}
//! subscriber -> hub   GRANTED
//! hub -> subscriber   DOOR_OPEN_OK
//! hub -> all          {"rfid":"access_granted","rfid_id":"04ab"}
//! ```

use homeguard_core::{AuthDecision, CredentialMethod};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub const REPLY_BULB_ON: &str = "BULB_ON_OK";
pub const REPLY_BULB_OFF: &str = "BULB_OFF_OK";
pub const REPLY_DOOR_OPEN: &str = "DOOR_OPEN_OK";
pub const REPLY_DOOR_CLOSE: &str = "DOOR_CLOSE_OK";
pub const REPLY_UNKNOWN: &str = "ERROR: Unknown command";
pub const REPLY_SYSTEM_SHUTDOWN: &str = "SYSTEM_SHUTDOWN";

/// Connection identity assigned when a subscriber connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Command received from a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberCommand {
    /// `ON`: light on, answered with a state event.
    On,
    /// `BULB_ON`: light on, answered with `BULB_ON_OK`.
    BulbOn,
    Off,
    BulbOff,
    Toggle,
    /// Open the door on behalf of an external decision.
    Granted,
    /// Lock the door on behalf of an external decision.
    Denied,
    Unknown(String),
}

impl SubscriberCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let token = line.trim();
        match token.to_ascii_uppercase().as_str() {
            "ON" => SubscriberCommand::On,
            "BULB_ON" => SubscriberCommand::BulbOn,
            "OFF" => SubscriberCommand::Off,
            "BULB_OFF" => SubscriberCommand::BulbOff,
            "TOGGLE" => SubscriberCommand::Toggle,
            "GRANTED" => SubscriberCommand::Granted,
            "DENIED" => SubscriberCommand::Denied,
            _ => SubscriberCommand::Unknown(token.to_string()),
        }
    }

    /// Light commands are refused while the hub is shut down.
    #[must_use]
    pub fn is_light_command(&self) -> bool {
        matches!(
            self,
            SubscriberCommand::On
                | SubscriberCommand::BulbOn
                | SubscriberCommand::Off
                | SubscriberCommand::BulbOff
                | SubscriberCommand::Toggle
        )
    }
}

/// A line received from one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberMessage {
    pub subscriber: SubscriberId,
    pub text: String,
}

/// A line to deliver to one subscriber, or to all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub target: Option<SubscriberId>,
    pub text: String,
}

impl Outbound {
    #[must_use]
    pub fn broadcast(text: impl Into<String>) -> Self {
        Self {
            target: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn reply(to: SubscriberId, text: impl Into<String>) -> Self {
        Self {
            target: Some(to),
            text: text.into(),
        }
    }

    /// Whether this line goes to the given connection.
    #[must_use]
    pub fn is_for(&self, subscriber: SubscriberId) -> bool {
        self.target.is_none_or(|target| target == subscriber)
    }
}

/// State change pushed to every subscriber as one JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BroadcastEvent {
    Bulb {
        bulb: &'static str,
    },
    Keypad {
        access: &'static str,
        method: &'static str,
    },
    Rfid {
        rfid: &'static str,
        rfid_id: String,
    },
}

impl BroadcastEvent {
    #[must_use]
    pub fn bulb(on: bool) -> Self {
        BroadcastEvent::Bulb {
            bulb: if on { "on" } else { "off" },
        }
    }

    /// Event for an authorization outcome. Keypad codes are never included.
    #[must_use]
    pub fn access(decision: &AuthDecision) -> Self {
        match decision.method {
            CredentialMethod::Keypad => BroadcastEvent::Keypad {
                access: if decision.granted { "granted" } else { "denied" },
                method: CredentialMethod::Keypad.as_wire(),
            },
            CredentialMethod::Rfid => BroadcastEvent::Rfid {
                rfid: if decision.granted {
                    "access_granted"
                } else {
                    "access_denied"
                },
                rfid_id: decision.identifier.clone(),
            },
        }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        // Only string fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
