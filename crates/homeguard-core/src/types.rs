use crate::{Result, constants::DEFAULT_ADMIN_MATCH_DIGITS, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use subtle::ConstantTimeEq;

/// How a credential was presented to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMethod {
    Keypad,
    Rfid,
}

impl CredentialMethod {
    /// Lowercase name used in remote requests and subscriber events.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            CredentialMethod::Keypad => "keypad",
            CredentialMethod::Rfid => "rfid",
        }
    }
}

impl fmt::Display for CredentialMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CredentialMethod::Keypad => write!(f, "Keypad"),
            CredentialMethod::Rfid => write!(f, "RFID"),
        }
    }
}

/// A credential presented on one of the local input channels.
///
/// Created when a channel is polled and consumed immediately by the access
/// authorizer. Never persisted.
#[derive(Debug, Clone)]
pub struct CredentialAttempt {
    pub method: CredentialMethod,
    pub value: String,
    pub received_at: Instant,
}

impl CredentialAttempt {
    /// Create a keypad attempt from the digits typed on the companion keypad.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the payload is empty or contains
    /// anything other than ASCII digits.
    pub fn keypad(digits: &str) -> Result<Self> {
        let digits = digits.trim();
        if digits.is_empty() {
            return Err(Error::InvalidCredential("Keypad code is empty".to_string()));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCredential(
                "Keypad code must contain only digits".to_string(),
            ));
        }
        Ok(Self {
            method: CredentialMethod::Keypad,
            value: digits.to_string(),
            received_at: Instant::now(),
        })
    }

    /// Create an RFID attempt from a rendered tag uid.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the uid is empty.
    pub fn rfid(uid: &str) -> Result<Self> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(Error::InvalidCredential("RFID uid is empty".to_string()));
        }
        Ok(Self {
            method: CredentialMethod::Rfid,
            value: uid.to_string(),
            received_at: Instant::now(),
        })
    }
}

/// Outcome of a remote authorization round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub method: CredentialMethod,
    pub identifier: String,
    pub granted: bool,
}

impl AuthDecision {
    #[must_use]
    pub fn granted(attempt: &CredentialAttempt) -> Self {
        Self {
            method: attempt.method,
            identifier: attempt.value.clone(),
            granted: true,
        }
    }

    #[must_use]
    pub fn denied(attempt: &CredentialAttempt) -> Self {
        Self {
            method: attempt.method,
            identifier: attempt.value.clone(),
            granted: false,
        }
    }

    /// Identifier safe to put in logs and alerts.
    ///
    /// Keypad codes are secrets and are replaced by one `*` per digit; tag
    /// uids are returned as is.
    #[must_use]
    pub fn display_identifier(&self) -> String {
        match self.method {
            CredentialMethod::Keypad => "*".repeat(self.identifier.chars().count()),
            CredentialMethod::Rfid => self.identifier.clone(),
        }
    }
}

/// Read state reported by the modem for a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmsStatus {
    Read,
    Unread,
}

impl SmsStatus {
    /// Map a modem status field (`REC READ`, `REC UNREAD`, quotes already
    /// removed) to a status. Outgoing storage states are not messages the hub
    /// acts on and yield `None`.
    #[must_use]
    pub fn from_wire(field: &str) -> Option<Self> {
        match field.trim().to_ascii_uppercase().as_str() {
            "REC READ" | "READ" => Some(SmsStatus::Read),
            "REC UNREAD" | "UNREAD" => Some(SmsStatus::Unread),
            _ => None,
        }
    }
}

/// A text message received through the SMS gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    /// Storage slot; present only for messages read from the list dump.
    pub index: Option<u32>,
    pub sender: String,
    pub status: SmsStatus,
    /// Body, trimmed and upper-cased.
    pub content: String,
}

impl SmsMessage {
    /// Build a message, normalizing the body.
    #[must_use]
    pub fn new(index: Option<u32>, sender: &str, status: SmsStatus, content: &str) -> Self {
        Self {
            index,
            sender: sender.trim().to_string(),
            status,
            content: content.trim().to_uppercase(),
        }
    }
}

/// Process-wide state owned by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub enabled: bool,
    pub door_locked: bool,
    pub bulb_on: bool,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            enabled: true,
            door_locked: true,
            bulb_on: false,
        }
    }
}

/// Closed set of commands understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandToken {
    Open,
    Close,
    On,
    Off,
    Shutdown,
    Restart,
    Status,
    Unknown,
}

impl CommandToken {
    /// Normalize raw channel text and classify it.
    ///
    /// Line terminators anywhere in the text are removed, surrounding
    /// whitespace is trimmed and the comparison is case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use homeguard_core::CommandToken;
    ///
    /// assert_eq!(CommandToken::parse(" open\r\n"), CommandToken::Open);
    /// assert_eq!(CommandToken::parse("hello"), CommandToken::Unknown);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect::<String>()
            .trim()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "OPEN" => CommandToken::Open,
            "CLOSE" => CommandToken::Close,
            "ON" => CommandToken::On,
            "OFF" => CommandToken::Off,
            "SHUTDOWN" => CommandToken::Shutdown,
            "RESTART" => CommandToken::Restart,
            "STATUS" => CommandToken::Status,
            _ => CommandToken::Unknown,
        }
    }

    /// Returns `true` if the command is refused while the system is disabled.
    #[must_use]
    pub fn requires_enabled(self) -> bool {
        !matches!(
            self,
            CommandToken::Open | CommandToken::Close | CommandToken::Shutdown | CommandToken::Restart
        )
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CommandToken::Open => "OPEN",
            CommandToken::Close => "CLOSE",
            CommandToken::On => "ON",
            CommandToken::Off => "OFF",
            CommandToken::Shutdown => "SHUTDOWN",
            CommandToken::Restart => "RESTART",
            CommandToken::Status => "STATUS",
            CommandToken::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Channel a command arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Sms,
    Local,
}

impl Origin {
    /// Returns `true` if acknowledgments are sent back over this channel by
    /// the alert notifier.
    #[must_use]
    pub fn replies_by_sms(self) -> bool {
        matches!(self, Origin::Sms)
    }
}

/// The single phone number allowed to command the hub over SMS.
///
/// Numbers are compared on their trailing significant digits so that the
/// international form and the country-code variants a network may deliver
/// (`+260970846745`, `+26970846745`) identify the same subscriber.
///
/// # Security
/// The digit comparison runs in constant time.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    number: String,
    significant: String,
}

impl AdminIdentity {
    /// Create an admin identity comparing the default number of digits.
    ///
    /// # Errors
    /// Returns `Error::InvalidPhoneNumber` if the number has fewer digits
    /// than are compared.
    pub fn new(number: &str) -> Result<Self> {
        Self::with_match_digits(number, DEFAULT_ADMIN_MATCH_DIGITS)
    }

    /// Create an admin identity comparing the last `match_digits` digits.
    ///
    /// # Errors
    /// Returns `Error::InvalidPhoneNumber` if `match_digits` is zero or the
    /// number has fewer digits than that.
    pub fn with_match_digits(number: &str, match_digits: usize) -> Result<Self> {
        if match_digits == 0 {
            return Err(Error::InvalidPhoneNumber(
                "At least one digit must be compared".to_string(),
            ));
        }
        let significant = significant_digits(number, match_digits).ok_or_else(|| {
            Error::InvalidPhoneNumber(format!(
                "'{number}' has fewer than {match_digits} digits"
            ))
        })?;
        Ok(Self {
            number: number.trim().to_string(),
            significant,
        })
    }

    /// Number alerts are addressed to, as configured.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Returns `true` if `sender` identifies the admin.
    #[must_use]
    pub fn matches(&self, sender: &str) -> bool {
        match significant_digits(sender, self.significant.len()) {
            Some(candidate) => candidate
                .as_bytes()
                .ct_eq(self.significant.as_bytes())
                .into(),
            None => false,
        }
    }
}

/// Last `count` ASCII digits of `number`, or `None` if there are fewer.
fn significant_digits(number: &str, count: usize) -> Option<String> {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < count {
        return None;
    }
    Some(digits[digits.len() - count..].iter().collect())
}

/// Stable identity of this hub, sent with every remote request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// # Errors
    /// Returns `Error::Config` if the identity is blank.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::Config("Device identity must not be empty".to_string()));
        }
        Ok(Self(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OPEN", CommandToken::Open)]
    #[case("close", CommandToken::Close)]
    #[case("  On \r\n", CommandToken::On)]
    #[case("off\n", CommandToken::Off)]
    #[case("ShutDown", CommandToken::Shutdown)]
    #[case("restart\r", CommandToken::Restart)]
    #[case("status", CommandToken::Status)]
    #[case("hello", CommandToken::Unknown)]
    #[case("", CommandToken::Unknown)]
    #[case("OPEN NOW", CommandToken::Unknown)]
    fn test_command_token_parse(#[case] input: &str, #[case] expected: CommandToken) {
        assert_eq!(CommandToken::parse(input), expected);
    }

    #[test]
    fn test_command_token_gating() {
        assert!(!CommandToken::Open.requires_enabled());
        assert!(!CommandToken::Close.requires_enabled());
        assert!(!CommandToken::Shutdown.requires_enabled());
        assert!(!CommandToken::Restart.requires_enabled());
        assert!(CommandToken::On.requires_enabled());
        assert!(CommandToken::Off.requires_enabled());
        assert!(CommandToken::Status.requires_enabled());
        assert!(CommandToken::Unknown.requires_enabled());
    }

    #[rstest]
    #[case("+260970846745")]
    #[case("+26970846745")]
    #[case("0970846745")]
    #[case("260970846745")]
    fn test_admin_identity_accepts_alternate_forms(#[case] sender: &str) {
        let admin = AdminIdentity::new("+260970846745").unwrap();
        assert!(admin.matches(sender));
    }

    #[rstest]
    #[case("+260970846746")]
    #[case("+260971111111")]
    #[case("70846745")]
    #[case("")]
    #[case("SERVICE")]
    fn test_admin_identity_rejects_others(#[case] sender: &str) {
        let admin = AdminIdentity::new("+260970846745").unwrap();
        assert!(!admin.matches(sender));
    }

    #[test]
    fn test_admin_identity_requires_enough_digits() {
        assert!(AdminIdentity::new("12345").is_err());
        assert!(AdminIdentity::with_match_digits("+260970846745", 0).is_err());
        assert!(AdminIdentity::with_match_digits("12345", 5).is_ok());
    }

    #[test]
    fn test_keypad_attempt_validation() {
        let attempt = CredentialAttempt::keypad(" 1234 ").unwrap();
        assert_eq!(attempt.method, CredentialMethod::Keypad);
        assert_eq!(attempt.value, "1234");

        assert!(CredentialAttempt::keypad("").is_err());
        assert!(CredentialAttempt::keypad("12a4").is_err());
    }

    #[test]
    fn test_decision_masks_keypad_code() {
        let attempt = CredentialAttempt::keypad("4321").unwrap();
        assert_eq!(AuthDecision::denied(&attempt).display_identifier(), "****");

        let attempt = CredentialAttempt::rfid("04abcdef").unwrap();
        assert_eq!(
            AuthDecision::granted(&attempt).display_identifier(),
            "04abcdef"
        );
    }

    #[test]
    fn test_sms_status_from_wire() {
        assert_eq!(SmsStatus::from_wire("REC UNREAD"), Some(SmsStatus::Unread));
        assert_eq!(SmsStatus::from_wire("rec read"), Some(SmsStatus::Read));
        assert_eq!(SmsStatus::from_wire("STO SENT"), None);
    }

    #[test]
    fn test_sms_message_normalizes_content() {
        let msg = SmsMessage::new(Some(3), " +260970846745 ", SmsStatus::Read, "  status\r\n");
        assert_eq!(msg.sender, "+260970846745");
        assert_eq!(msg.content, "STATUS");
    }

    #[test]
    fn test_system_state_boot_defaults() {
        let state = SystemState::default();
        assert!(state.enabled);
        assert!(state.door_locked);
        assert!(!state.bulb_on);
    }

    #[test]
    fn test_credential_method_names() {
        assert_eq!(CredentialMethod::Rfid.to_string(), "RFID");
        assert_eq!(CredentialMethod::Keypad.as_wire(), "keypad");
        assert_eq!(
            serde_json::to_string(&CredentialMethod::Rfid).unwrap(),
            "\"rfid\""
        );
    }
}
