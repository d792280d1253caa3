//! Network communication layer for the homeguard hub.
//!
//! # Components
//!
//! - **HttpHubApi**: reqwest client for the remote authorization service and
//!   the sensor report endpoint, behind the [`HubApi`] trait
//! - **SubscriberServer**: TCP server for real-time subscribers, one
//!   newline-delimited text connection per subscriber
//! - **HostLink**: uplink reachability probe implementing `NetworkLink`
//!
//! # Example
//!
//! ```no_run
//! use homeguard_network::{HttpHubApi, HttpHubApiConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpHubApi::new(HttpHubApiConfig {
//!     auth_url: "http://127.0.0.1:8000/api/check-auth/".to_string(),
//!     report_url: None,
//!     timeout: Duration::from_secs(5),
//! })?;
//! # Ok(())
//! # }
//! ```

mod api;
mod link;
pub mod mock;
mod server;

pub use api::{ApiError, HttpHubApi, HttpHubApiConfig, HubApi};
pub use link::HostLink;
pub use server::{SubscriberChannels, SubscriberServer, SubscriberServerConfig, SubscriberServerError};
