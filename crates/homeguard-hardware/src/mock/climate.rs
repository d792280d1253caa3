//! Mock temperature/humidity sensor.

use crate::{Result, traits::ClimateSensor, types::ClimateReading};
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_TEMPERATURE: f32 = 22.0;
const DEFAULT_HUMIDITY: f32 = 45.0;

/// Mock sensor returning whatever sample its handle last set.
#[derive(Debug)]
pub struct MockClimate {
    sample: Arc<Mutex<(f32, f32)>>,
}

/// Sets the sample reported by a [`MockClimate`].
#[derive(Debug, Clone)]
pub struct MockClimateHandle {
    sample: Arc<Mutex<(f32, f32)>>,
}

impl MockClimate {
    pub fn new() -> (Self, MockClimateHandle) {
        let sample = Arc::new(Mutex::new((DEFAULT_TEMPERATURE, DEFAULT_HUMIDITY)));
        (
            Self {
                sample: Arc::clone(&sample),
            },
            MockClimateHandle { sample },
        )
    }
}

impl ClimateSensor for MockClimate {
    async fn read(&mut self) -> Result<ClimateReading> {
        let (temperature, humidity) = *self.sample.lock().unwrap_or_else(PoisonError::into_inner);
        ClimateReading::new(temperature, humidity)
    }
}

impl MockClimateHandle {
    pub fn set(&self, temperature: f32, humidity: f32) {
        *self.sample.lock().unwrap_or_else(PoisonError::into_inner) = (temperature, humidity);
    }

    /// Make reads fail the way a real sensor does, with NaN samples.
    pub fn fail(&self) {
        self.set(f32::NAN, f32::NAN);
    }
}
