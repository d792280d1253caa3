use homeguard_hardware::HardwareError;
use thiserror::Error;

/// Errors raised inside the hub.
///
/// None of these are fatal once the hub is running: the control loop logs
/// them and moves on to the next tick. Only [`Hub::new`](crate::Hub::new)
/// returns one to its caller.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Modem is not ready")]
    ModemNotReady,

    #[error("Modem did not answer '{command}' within {window_ms} ms")]
    ModemTimeout { command: String, window_ms: u64 },

    #[error("Modem rejected '{command}'")]
    ModemRejected { command: String },

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Core(#[from] homeguard_core::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;
