//! Wire-level and behavioural constants for the homeguard hub.
//!
//! Everything the hub says to the outside world (modem commands, serial bridge
//! lines, SMS acknowledgments) and every default timing lives here so the
//! components agree on a single literal.
//!
//! # Modem text protocol
//!
//! ```text
//! +CMT: "+260970846745","","24/05/10,12:46:06+08"   <- unsolicited notification
//! OPEN                                              <- body line
//!
//! +CMGL: 1,"REC UNREAD","+260970846745","","24/05/10,12:46:06+08"
//! STATUS
//! +CMGL: 2,"REC READ","+260970846745","","24/05/10,12:47:00+08"
//! OFF
//! OK                                                <- end-of-list sentinel
//! ```
//!
//! # Serial bridge
//!
//! ```text
//! companion -> hub   KEYPAD:1234\n
//! hub -> companion   {"status":"GRANTED"}\n
//! hub -> companion   TEMP:24.50,HUM:61.00\n
//! ```

// ============================================================================
// Modem (AT command) protocol
// ============================================================================

/// Marker that introduces an unsolicited new-message notification.
pub const SMS_NOTIFY_MARKER: &str = "+CMT:";

/// Marker that introduces one record of a stored-message list dump.
pub const SMS_LIST_MARKER: &str = "+CMGL:";

/// Final result line terminating a successful modem response.
pub const MODEM_OK: &str = "OK";

/// Liveness probe.
pub const AT_PROBE: &str = "AT";

/// Modem configuration sequence issued after a successful probe:
/// full functionality, text mode, new-message indications, SIM storage.
pub const AT_INIT_SEQUENCE: [&str; 4] = [
    "AT+CFUN=1",
    "AT+CMGF=1",
    "AT+CNMI=2,1,0,0,0",
    "AT+CPMS=\"SM\",\"SM\",\"SM\"",
];

/// Request every stored message.
pub const AT_LIST_ALL: &str = "AT+CMGL=\"ALL\"";

/// Ctrl-Z, terminates the body of an outgoing SMS.
pub const SMS_SUBMIT_TERMINATOR: char = '\u{1A}';

// ============================================================================
// Serial bridge protocol
// ============================================================================

/// Prefix of a keypad credential line forwarded by the companion board.
pub const BRIDGE_KEYPAD_PREFIX: &str = "KEYPAD:";

/// Exact status literal that grants access. Anything else is a denial.
pub const AUTH_STATUS_GRANTED: &str = "GRANTED";

/// Status literal written back to the bridge on denial.
pub const AUTH_STATUS_DENIED: &str = "DENIED";

// ============================================================================
// Acknowledgments and alerts
// ============================================================================

pub const ACK_DOOR_OPENED: &str = "Door opened";
pub const ACK_DOOR_CLOSED: &str = "Door closed";
pub const ACK_LIGHT_ON: &str = "Light turned ON";
pub const ACK_LIGHT_OFF: &str = "Light turned OFF";
pub const ACK_SHUTDOWN: &str = "System SHUTDOWN activated";
pub const ACK_RESTART: &str = "System RESTARTED";
pub const ACK_SYSTEM_DISABLED: &str = "System is currently SHUTDOWN";
pub const ACK_UNKNOWN_COMMAND: &str = "Unknown command. Try: OPEN, CLOSE, ON, OFF, STATUS";

pub const ALERT_SYSTEM_READY: &str = "System initialized and ready";
pub const ALERT_SHUTDOWN_COMPLETE: &str = "System shutdown complete";
pub const ALERT_RESTART_COMPLETE: &str = "System restart complete";

// ============================================================================
// Defaults
// ============================================================================

/// How long the door stays unlocked before relocking (ms).
pub const DEFAULT_UNLOCK_DURATION_MS: u64 = 3_000;

/// Pause after actuator moves during RESTART (ms).
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Upper bound on a remote authorization round-trip (ms).
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 5_000;

/// Interval between stored-message list requests (ms).
pub const DEFAULT_SMS_POLL_INTERVAL_MS: u64 = 30_000;

/// Wall-clock window for collecting a list dump (ms).
pub const DEFAULT_SMS_LIST_WINDOW_MS: u64 = 5_000;

/// Interval between sensor reports (ms).
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 10_000;

/// Control loop period (ms).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Trailing digits compared when matching the admin phone number.
pub const DEFAULT_ADMIN_MATCH_DIGITS: usize = 9;

/// Default serial baud rate for the modem and the companion bridge.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Default bind address of the real-time subscriber server.
pub const DEFAULT_SUBSCRIBER_BIND: &str = "0.0.0.0:81";

/// Maximum simultaneous real-time subscribers.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 16;

/// Capacity of every inbound event queue feeding the control loop.
pub const EVENT_QUEUE_CAPACITY: usize = 32;
