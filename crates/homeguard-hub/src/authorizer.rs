//! Access authorizer.
//!
//! Turns a [`CredentialAttempt`] into an [`AuthDecision`] by asking the
//! remote authorization service. The policy is fail-closed: the only path
//! to a grant is a response, received in time over a live link, whose
//! status is exactly `GRANTED`. Every other outcome is a logged denial.

use homeguard_core::{AuthDecision, CredentialAttempt, DeviceIdentity};
use homeguard_hardware::NetworkLink;
use homeguard_network::HubApi;
use homeguard_protocol::AuthRequest;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AccessAuthorizer {
    device: DeviceIdentity,
    timeout: Duration,
}

impl AccessAuthorizer {
    #[must_use]
    pub fn new(device: DeviceIdentity, timeout: Duration) -> Self {
        Self { device, timeout }
    }

    #[must_use]
    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Ask the remote service about `attempt`.
    ///
    /// Never fails: transport errors, timeouts and unparseable responses all
    /// produce a denial.
    pub async fn authorize<A, N>(
        &self,
        api: &A,
        link: &mut N,
        attempt: &CredentialAttempt,
    ) -> AuthDecision
    where
        A: HubApi,
        N: NetworkLink,
    {
        if !link.is_connected().await {
            warn!(method = %attempt.method, "Network link down, access denied");
            return AuthDecision::denied(attempt);
        }

        let request = AuthRequest::new(attempt, &self.device);
        let decision = match tokio::time::timeout(self.timeout, api.check_auth(&request)).await {
            Ok(Ok(response)) if response.is_granted() => AuthDecision::granted(attempt),
            Ok(Ok(response)) => {
                debug!(status = ?response.status, "Authorization service refused credential");
                AuthDecision::denied(attempt)
            }
            Ok(Err(e)) => {
                warn!(method = %attempt.method, error = %e, "Authorization failed, access denied");
                AuthDecision::denied(attempt)
            }
            Err(_) => {
                warn!(
                    method = %attempt.method,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Authorization timed out, access denied"
                );
                AuthDecision::denied(attempt)
            }
        };

        info!(
            method = %decision.method,
            identifier = %decision.display_identifier(),
            granted = decision.granted,
            "Access decision"
        );
        decision
    }
}
