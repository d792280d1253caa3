//! JSON bodies exchanged with the remote authorization service.
//!
//! ```text
//! POST <auth_url>    {"type":"rfid","value":"04ab","device_id":"hub-01"}
//!                 <- {"status":"GRANTED"}
//! POST <report_url>  {"temperature":24.5,"humidity":61.0,"device_id":"hub-01"}
//! ```

use homeguard_core::constants::AUTH_STATUS_GRANTED;
use homeguard_core::{CredentialAttempt, DeviceIdentity, Error, Result};
use serde::{Deserialize, Serialize};

/// Authorization request for one credential attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub device_id: String,
}

impl AuthRequest {
    #[must_use]
    pub fn new(attempt: &CredentialAttempt, device: &DeviceIdentity) -> Self {
        Self {
            kind: attempt.method.as_wire().to_string(),
            value: attempt.value.clone(),
            device_id: device.as_str().to_string(),
        }
    }
}

/// Authorization response. Only the `status` field is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl AuthResponse {
    /// Parse a response body.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the body is not a JSON object
    /// with an optional string `status`.
    pub fn parse(body: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::InvalidMessageFormat(format!("auth response: {e}"));
        let value: serde_json::Value = serde_json::from_str(body).map_err(invalid)?;
        if !value.is_object() {
            return Err(Error::InvalidMessageFormat(
                "auth response is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(invalid)
    }

    /// Access is granted only for the exact literal `GRANTED`.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.status.as_deref() == Some(AUTH_STATUS_GRANTED)
    }
}

/// Periodic climate report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReport {
    pub temperature: f32,
    pub humidity: f32,
    pub device_id: String,
}

impl SensorReport {
    #[must_use]
    pub fn new(temperature: f32, humidity: f32, device: &DeviceIdentity) -> Self {
        Self {
            temperature,
            humidity,
            device_id: device.as_str().to_string(),
        }
    }
}
