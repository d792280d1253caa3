//! Core types shared by every homeguard crate.
//!
//! The hub accepts credentials and commands from several untrusted channels
//! (SMS gateway, serial keypad bridge, RFID reader, real-time subscribers).
//! This crate holds the vocabulary those channels are reduced to before the
//! control loop acts on them, plus the configuration and error types.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{HubConfig, SerialConfig};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
