//! Hub configuration.
//!
//! All fields have defaults so a configuration file only needs to name what
//! differs from them. The binary reads the file as JSON; tests build configs
//! with the setter methods.

use crate::constants::{
    DEFAULT_ADMIN_MATCH_DIGITS, DEFAULT_AUTH_TIMEOUT_MS, DEFAULT_BAUD_RATE,
    DEFAULT_MAX_SUBSCRIBERS, DEFAULT_REPORT_INTERVAL_MS, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_SMS_LIST_WINDOW_MS, DEFAULT_SMS_POLL_INTERVAL_MS, DEFAULT_SUBSCRIBER_BIND,
    DEFAULT_TICK_INTERVAL_MS, DEFAULT_UNLOCK_DURATION_MS,
};
use crate::types::{AdminIdentity, DeviceIdentity};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Serial port settings for the modem or the companion bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub path: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Complete runtime configuration of the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Stable identity sent with every remote request.
    pub device_id: String,

    /// Phone number allowed to issue SMS commands; alerts go here.
    pub admin_number: String,

    /// Trailing digits compared when matching senders to the admin number.
    pub admin_match_digits: usize,

    /// Remote authorization endpoint.
    pub auth_url: String,

    /// Sensor report endpoint.
    pub report_url: String,

    pub auth_timeout_ms: u64,
    pub unlock_duration_ms: u64,
    pub settle_delay_ms: u64,
    pub sms_poll_interval_ms: u64,
    pub sms_list_window_ms: u64,
    pub report_interval_ms: u64,
    pub tick_interval_ms: u64,

    /// Listen address of the real-time subscriber server.
    pub subscriber_bind: String,

    pub max_subscribers: usize,

    /// Modem serial port. Without it the SMS channel is simulated.
    pub modem: Option<SerialConfig>,

    /// Companion bridge serial port. Without it the keypad is simulated.
    pub bridge: Option<SerialConfig>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            admin_number: String::new(),
            admin_match_digits: DEFAULT_ADMIN_MATCH_DIGITS,
            auth_url: String::new(),
            report_url: String::new(),
            auth_timeout_ms: DEFAULT_AUTH_TIMEOUT_MS,
            unlock_duration_ms: DEFAULT_UNLOCK_DURATION_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            sms_poll_interval_ms: DEFAULT_SMS_POLL_INTERVAL_MS,
            sms_list_window_ms: DEFAULT_SMS_LIST_WINDOW_MS,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            subscriber_bind: DEFAULT_SUBSCRIBER_BIND.to_string(),
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            modem: None,
            bridge: None,
        }
    }
}

impl HubConfig {
    /// Create a configuration for the given device identity.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration document and validate it.
    ///
    /// # Errors
    /// Returns `Error::Config` if the document is not valid JSON for this
    /// structure, or any error from [`HubConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn admin_number(mut self, number: impl Into<String>) -> Self {
        self.admin_number = number.into();
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn report_url(mut self, url: impl Into<String>) -> Self {
        self.report_url = url.into();
        self
    }

    pub fn unlock_duration(mut self, duration: Duration) -> Self {
        self.unlock_duration_ms = duration_ms(duration);
        self
    }

    pub fn settle_delay(mut self, duration: Duration) -> Self {
        self.settle_delay_ms = duration_ms(duration);
        self
    }

    pub fn auth_timeout(mut self, duration: Duration) -> Self {
        self.auth_timeout_ms = duration_ms(duration);
        self
    }

    pub fn sms_poll_interval(mut self, duration: Duration) -> Self {
        self.sms_poll_interval_ms = duration_ms(duration);
        self
    }

    pub fn sms_list_window(mut self, duration: Duration) -> Self {
        self.sms_list_window_ms = duration_ms(duration);
        self
    }

    pub fn report_interval(mut self, duration: Duration) -> Self {
        self.report_interval_ms = duration_ms(duration);
        self
    }

    pub fn subscriber_bind(mut self, addr: impl Into<String>) -> Self {
        self.subscriber_bind = addr.into();
        self
    }

    pub fn modem(mut self, serial: SerialConfig) -> Self {
        self.modem = Some(serial);
        self
    }

    pub fn bridge(mut self, serial: SerialConfig) -> Self {
        self.bridge = Some(serial);
        self
    }

    /// Check that the configuration can drive a hub.
    ///
    /// # Errors
    /// - `Error::MissingConfig` if a required key is empty
    /// - `Error::Config` if a duration is zero, the admin number is unusable
    ///   or the subscriber bind address does not parse
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("device_id", &self.device_id),
            ("admin_number", &self.admin_number),
            ("auth_url", &self.auth_url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingConfig(key.to_string()));
            }
        }

        for (key, value) in [
            ("auth_timeout_ms", self.auth_timeout_ms),
            ("unlock_duration_ms", self.unlock_duration_ms),
            ("sms_poll_interval_ms", self.sms_poll_interval_ms),
            ("sms_list_window_ms", self.sms_list_window_ms),
            ("report_interval_ms", self.report_interval_ms),
            ("tick_interval_ms", self.tick_interval_ms),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{key} must be greater than zero")));
            }
        }

        if self.settle_delay_ms >= self.unlock_duration_ms {
            return Err(Error::Config(
                "settle_delay_ms must be shorter than unlock_duration_ms".to_string(),
            ));
        }

        self.admin_identity()
            .map_err(|e| Error::Config(format!("admin_number: {e}")))?;
        self.subscriber_addr()?;

        Ok(())
    }

    /// # Errors
    /// Returns `Error::InvalidPhoneNumber` if the admin number is unusable.
    pub fn admin_identity(&self) -> Result<AdminIdentity> {
        AdminIdentity::with_match_digits(&self.admin_number, self.admin_match_digits)
    }

    /// # Errors
    /// Returns `Error::Config` if the device id is blank.
    pub fn device_identity(&self) -> Result<DeviceIdentity> {
        DeviceIdentity::new(&self.device_id)
    }

    /// # Errors
    /// Returns `Error::Config` if the bind address does not parse.
    pub fn subscriber_addr(&self) -> Result<SocketAddr> {
        self.subscriber_bind.parse().map_err(|e| {
            Error::Config(format!(
                "Invalid subscriber_bind '{}': {e}",
                self.subscriber_bind
            ))
        })
    }

    #[must_use]
    pub fn unlock_duration_value(&self) -> Duration {
        Duration::from_millis(self.unlock_duration_ms)
    }

    #[must_use]
    pub fn settle_delay_value(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn auth_timeout_value(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    #[must_use]
    pub fn sms_poll_interval_value(&self) -> Duration {
        Duration::from_millis(self.sms_poll_interval_ms)
    }

    #[must_use]
    pub fn sms_list_window_value(&self) -> Duration {
        Duration::from_millis(self.sms_list_window_ms)
    }

    #[must_use]
    pub fn report_interval_value(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    #[must_use]
    pub fn tick_interval_value(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> HubConfig {
        HubConfig::new("24:6F:28:AA:BB:CC")
            .admin_number("+260970846745")
            .auth_url("http://127.0.0.1:8000/api/check-auth/")
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.unlock_duration_value(), Duration::from_secs(3));
        assert_eq!(config.sms_poll_interval_value(), Duration::from_secs(30));
        assert_eq!(config.sms_list_window_value(), Duration::from_secs(5));
        assert_eq!(config.admin_match_digits, 9);
        assert!(config.modem.is_none());
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_required_keys() {
        let err = HubConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::MissingConfig(key) if key == "device_id"));

        let err = valid().admin_number("").validate().unwrap_err();
        assert!(matches!(err, Error::MissingConfig(key) if key == "admin_number"));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let err = valid()
            .unlock_duration(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_settle_delay_must_fit_in_unlock_window() {
        let config = valid()
            .unlock_duration(Duration::from_millis(400))
            .settle_delay(Duration::from_millis(500));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_subscriber_addr() {
        let config = valid().subscriber_bind("not an address");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_uses_defaults_for_missing_fields() {
        let json = r#"{
            "device_id": "hub-01",
            "admin_number": "+260970846745",
            "auth_url": "http://localhost:8000/api/check-auth/",
            "unlock_duration_ms": 4000,
            "modem": { "path": "/dev/ttyS2" }
        }"#;

        let config = HubConfig::from_json_str(json).unwrap();
        assert_eq!(config.unlock_duration_ms, 4000);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.modem, Some(SerialConfig::new("/dev/ttyS2")));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            HubConfig::from_json_str("{ not json"),
            Err(Error::Config(_))
        ));
    }
}
