//! Common types shared across hardware device implementations.

use crate::{HardwareError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Servo position of the door latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServoPosition {
    Closed,
    Open,
}

impl ServoPosition {
    /// Servo angle in degrees.
    #[must_use]
    pub fn angle(self) -> u8 {
        match self {
            ServoPosition::Closed => 0,
            ServoPosition::Open => 90,
        }
    }
}

/// What the status LEDs show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indication {
    /// Green: access granted, lit until the door relocks.
    Granted,
    /// Red: access denied.
    Denied,
    /// Steady red while the system is shut down.
    Shutdown,
    Off,
}

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

impl ClimateReading {
    /// # Errors
    /// Returns `HardwareError::SensorReadError` if either value is not a
    /// finite number, which is how the sensor reports a failed read.
    pub fn new(temperature: f32, humidity: f32) -> Result<Self> {
        if !temperature.is_finite() || !humidity.is_finite() {
            return Err(HardwareError::sensor_read(format!(
                "non-finite sample (temperature={temperature}, humidity={humidity})"
            )));
        }
        Ok(Self {
            temperature,
            humidity,
        })
    }
}

/// A tag seen by the RFID reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRead {
    pub uid: Vec<u8>,
    pub read_at: DateTime<Utc>,
}

impl CardRead {
    #[must_use]
    pub fn new(uid: Vec<u8>) -> Self {
        Self {
            uid,
            read_at: Utc::now(),
        }
    }

    /// Lowercase hex, two digits per byte: `[0x04, 0xAB]` is `"04ab"`.
    #[must_use]
    pub fn uid_hex(&self) -> String {
        let mut hex = String::with_capacity(self.uid.len() * 2);
        for byte in &self.uid {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![0x04, 0xAB], "04ab")]
    #[case(vec![0x00, 0x01, 0xFF, 0x10], "0001ff10")]
    #[case(vec![], "")]
    fn test_uid_hex(#[case] uid: Vec<u8>, #[case] expected: &str) {
        assert_eq!(CardRead::new(uid).uid_hex(), expected);
    }

    #[test]
    fn test_climate_reading_rejects_nan() {
        assert!(ClimateReading::new(f32::NAN, 40.0).is_err());
        assert!(ClimateReading::new(21.0, f32::INFINITY).is_err());
        assert!(ClimateReading::new(21.0, 40.0).is_ok());
    }

    #[test]
    fn test_servo_angles() {
        assert_eq!(ServoPosition::Closed.angle(), 0);
        assert_eq!(ServoPosition::Open.angle(), 90);
    }

    #[test]
    fn test_indication_serde() {
        let json = serde_json::to_string(&Indication::Granted).unwrap();
        assert_eq!(json, "\"Granted\"");
    }
}
