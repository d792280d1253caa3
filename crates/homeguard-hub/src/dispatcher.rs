//! Command dispatcher.
//!
//! Pure routing: maps a command plus the current [`SystemState`] to the
//! action the control loop performs. The enabled gate is evaluated before
//! the table, so while the system is shut down only OPEN, CLOSE, SHUTDOWN
//! and RESTART get through.
//!
//! | Token    | Gated | Action                         | Ack                        |
//! |----------|-------|--------------------------------|----------------------------|
//! | OPEN     | no    | unlock, timed relock           | `Door opened`              |
//! | CLOSE    | no    | lock                           | `Door closed`              |
//! | ON / OFF | yes   | switch bulb                    | `Light turned ON` / `OFF`  |
//! | SHUTDOWN | no    | disable, lock, bulb off, no RFID | `System SHUTDOWN activated` |
//! | RESTART  | no    | enable, RFID on, cycle bulb/door | `System RESTARTED`       |
//! | STATUS   | yes   | read sensors                   | status report              |
//! | other    | yes   | none                           | `Unknown command. ...`     |

use crate::door::DoorState;
use homeguard_core::constants::{
    ACK_DOOR_CLOSED, ACK_DOOR_OPENED, ACK_LIGHT_OFF, ACK_LIGHT_ON, ACK_RESTART, ACK_SHUTDOWN,
    ACK_SYSTEM_DISABLED, ACK_UNKNOWN_COMMAND,
};
use homeguard_core::{CommandToken, SystemState};
use homeguard_hardware::ClimateReading;
use homeguard_protocol::{BroadcastEvent, SubscriberCommand};
use homeguard_protocol::realtime::{
    REPLY_BULB_OFF, REPLY_BULB_ON, REPLY_DOOR_CLOSE, REPLY_DOOR_OPEN, REPLY_SYSTEM_SHUTDOWN,
    REPLY_UNKNOWN,
};

/// What a command token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Unlock,
    Lock,
    Light(bool),
    Shutdown,
    Restart,
    Status,
    /// Gated command while the system is shut down.
    RefuseDisabled,
    Unknown,
}

impl Action {
    /// Fixed acknowledgment. STATUS has none: its reply is built from live
    /// readings.
    #[must_use]
    pub fn ack(self) -> Option<&'static str> {
        match self {
            Action::Unlock => Some(ACK_DOOR_OPENED),
            Action::Lock => Some(ACK_DOOR_CLOSED),
            Action::Light(true) => Some(ACK_LIGHT_ON),
            Action::Light(false) => Some(ACK_LIGHT_OFF),
            Action::Shutdown => Some(ACK_SHUTDOWN),
            Action::Restart => Some(ACK_RESTART),
            Action::Status => None,
            Action::RefuseDisabled => Some(ACK_SYSTEM_DISABLED),
            Action::Unknown => Some(ACK_UNKNOWN_COMMAND),
        }
    }
}

/// Resolve a command token against the current state.
#[must_use]
pub fn route(token: CommandToken, state: &SystemState) -> Action {
    if !state.enabled && token.requires_enabled() {
        return Action::RefuseDisabled;
    }
    match token {
        CommandToken::Open => Action::Unlock,
        CommandToken::Close => Action::Lock,
        CommandToken::On => Action::Light(true),
        CommandToken::Off => Action::Light(false),
        CommandToken::Shutdown => Action::Shutdown,
        CommandToken::Restart => Action::Restart,
        CommandToken::Status => Action::Status,
        CommandToken::Unknown => Action::Unknown,
    }
}

/// Reply to a STATUS command. An unreadable sensor shows as `N/A`.
#[must_use]
pub fn status_report(state: &SystemState, reading: Option<ClimateReading>) -> String {
    let (temperature, humidity) = match reading {
        Some(reading) => (
            format!("{:.2}", reading.temperature),
            format!("{:.2}", reading.humidity),
        ),
        None => ("N/A".to_string(), "N/A".to_string()),
    };
    let door = if state.door_locked {
        DoorState::Locked
    } else {
        DoorState::Unlocked
    };
    format!(
        "System Status:\nTemp: {temperature}C\nHumidity: {humidity}%\nLight: {}\nDoor: {door}",
        if state.bulb_on { "ON" } else { "OFF" },
    )
}

/// Desired bulb state of a subscriber light command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightTarget {
    On,
    Off,
    Toggle,
}

impl LightTarget {
    #[must_use]
    pub fn resolve(self, current: bool) -> bool {
        match self {
            LightTarget::On => true,
            LightTarget::Off => false,
            LightTarget::Toggle => !current,
        }
    }
}

/// How a light command is acknowledged to its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightReply {
    /// `{"bulb":"on"|"off"}` with the resulting state.
    State,
    Fixed(&'static str),
}

impl LightReply {
    #[must_use]
    pub fn render(self, on: bool) -> String {
        match self {
            LightReply::State => BroadcastEvent::bulb(on).to_json(),
            LightReply::Fixed(text) => text.to_string(),
        }
    }
}

/// What a subscriber command resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberAction {
    Light {
        target: LightTarget,
        reply: LightReply,
    },
    Unlock,
    Lock,
    RefuseDisabled,
    Unknown,
}

impl SubscriberAction {
    /// Reply for actions whose answer does not depend on the outcome.
    #[must_use]
    pub fn fixed_reply(self) -> Option<&'static str> {
        match self {
            SubscriberAction::Light { .. } => None,
            SubscriberAction::Unlock => Some(REPLY_DOOR_OPEN),
            SubscriberAction::Lock => Some(REPLY_DOOR_CLOSE),
            SubscriberAction::RefuseDisabled => Some(REPLY_SYSTEM_SHUTDOWN),
            SubscriberAction::Unknown => Some(REPLY_UNKNOWN),
        }
    }
}

/// Resolve a subscriber command. Light commands are gated like their SMS
/// counterparts; door commands are not.
#[must_use]
pub fn route_subscriber(command: &SubscriberCommand, state: &SystemState) -> SubscriberAction {
    if !state.enabled && command.is_light_command() {
        return SubscriberAction::RefuseDisabled;
    }
    let light = |target, reply| SubscriberAction::Light { target, reply };
    match command {
        SubscriberCommand::On => light(LightTarget::On, LightReply::State),
        SubscriberCommand::BulbOn => light(LightTarget::On, LightReply::Fixed(REPLY_BULB_ON)),
        SubscriberCommand::Off => light(LightTarget::Off, LightReply::State),
        SubscriberCommand::BulbOff => light(LightTarget::Off, LightReply::Fixed(REPLY_BULB_OFF)),
        SubscriberCommand::Toggle => light(LightTarget::Toggle, LightReply::State),
        SubscriberCommand::Granted => SubscriberAction::Unlock,
        SubscriberCommand::Denied => SubscriberAction::Lock,
        SubscriberCommand::Unknown(_) => SubscriberAction::Unknown,
    }
}
