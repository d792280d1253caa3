//! Alert notifier.
//!
//! Formats audit messages and sends them by SMS to the administrator. One
//! call per notable event; delivery failure is logged and the alert is
//! dropped.

use crate::sms_gateway::SmsGateway;
use homeguard_core::constants::{
    ALERT_RESTART_COMPLETE, ALERT_SHUTDOWN_COMPLETE, ALERT_SYSTEM_READY,
};
use homeguard_core::{AdminIdentity, AuthDecision};
use homeguard_hardware::ModemLink;
use std::fmt;
use tracing::{info, warn};

/// A notable event reported to the administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    SystemReady,
    Access(AuthDecision),
    ShutdownComplete,
    RestartComplete,
    /// Reply to a command received by SMS.
    CommandAck(String),
}

impl Alert {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Alert::SystemReady => "system_ready",
            Alert::Access(_) => "access",
            Alert::ShutdownComplete => "shutdown_complete",
            Alert::RestartComplete => "restart_complete",
            Alert::CommandAck(_) => "command_ack",
        }
    }

    /// SMS body. Keypad codes are masked.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Alert::SystemReady => ALERT_SYSTEM_READY.to_string(),
            Alert::Access(decision) => format!(
                "{} access {} for {}",
                decision.method,
                if decision.granted { "GRANTED" } else { "DENIED" },
                decision.display_identifier()
            ),
            Alert::ShutdownComplete => ALERT_SHUTDOWN_COMPLETE.to_string(),
            Alert::RestartComplete => ALERT_RESTART_COMPLETE.to_string(),
            Alert::CommandAck(text) => text.clone(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone)]
pub struct AlertNotifier {
    admin: AdminIdentity,
}

impl AlertNotifier {
    #[must_use]
    pub fn new(admin: AdminIdentity) -> Self {
        Self { admin }
    }

    #[must_use]
    pub fn admin(&self) -> &AdminIdentity {
        &self.admin
    }

    /// Send `alert` to the administrator. Returns whether the modem accepted
    /// it; a failed alert is not retried.
    pub async fn notify<M: ModemLink>(&self, gateway: &mut SmsGateway<M>, alert: &Alert) -> bool {
        match gateway.send_sms(self.admin.number(), &alert.message()).await {
            Ok(()) => {
                info!(alert = alert.kind(), "Alert sent");
                true
            }
            Err(e) => {
                warn!(alert = alert.kind(), error = %e, "Alert dropped");
                false
            }
        }
    }
}
