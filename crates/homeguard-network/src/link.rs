//! Uplink reachability probe.
//!
//! The hub has no radio to manage on a host; "connected" means the
//! authorization service accepts a TCP connection. The result is cached for
//! a short interval so checking before every request stays cheap.

use homeguard_hardware::{HardwareError, NetworkLink};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::ApiError;

const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

/// [`NetworkLink`] backed by a TCP connect probe.
#[derive(Debug)]
pub struct HostLink {
    target: String,
    probe_timeout: Duration,
    last_check: Option<(Instant, bool)>,
}

impl HostLink {
    /// Probe the host and port of `url`.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidConfig` if the URL has no host or port.
    pub fn for_url(url: &str, probe_timeout: Duration) -> Result<Self, ApiError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| ApiError::InvalidConfig(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ApiError::InvalidConfig(format!("{url}: missing host")))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ApiError::InvalidConfig(format!("{url}: missing port")))?;

        Ok(Self {
            target: format!("{host}:{port}"),
            probe_timeout,
            last_check: None,
        })
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn probe(&mut self) -> bool {
        let reachable = matches!(
            timeout(self.probe_timeout, TcpStream::connect(&self.target)).await,
            Ok(Ok(_))
        );
        self.last_check = Some((Instant::now(), reachable));
        reachable
    }
}

impl NetworkLink for HostLink {
    async fn is_connected(&mut self) -> bool {
        if let Some((checked_at, reachable)) = self.last_check
            && checked_at.elapsed() < RECHECK_INTERVAL
        {
            return reachable;
        }
        let reachable = self.probe().await;
        if !reachable {
            debug!(target = %self.target, "Uplink probe failed");
        }
        reachable
    }

    async fn reconnect(&mut self) -> Result<(), HardwareError> {
        if self.probe().await {
            info!(target = %self.target, "Uplink reachable");
            Ok(())
        } else {
            warn!(target = %self.target, "Uplink still unreachable");
            Err(HardwareError::communication(format!(
                "{} unreachable",
                self.target
            )))
        }
    }
}
