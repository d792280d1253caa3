//! Scriptable [`HubApi`] for tests and for running the hub without a
//! backend.

use crate::{ApiError, HubApi};
use homeguard_protocol::{AuthRequest, AuthResponse, SensorReport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How the mock answers authorization requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBehavior {
    /// Parse this body as if the server had returned it.
    Respond(String),
    /// Fail with a transport error.
    Unreachable,
    /// Answer with the given non-2xx status.
    Status(u16),
    /// Never answer.
    Hang,
}

impl AuthBehavior {
    pub fn granted() -> Self {
        AuthBehavior::Respond(r#"{"status":"GRANTED"}"#.to_string())
    }

    pub fn denied() -> Self {
        AuthBehavior::Respond(r#"{"status":"DENIED"}"#.to_string())
    }
}

#[derive(Debug)]
struct ApiState {
    behavior: AuthBehavior,
    requests: Vec<AuthRequest>,
    reports: Vec<SensorReport>,
}

/// Mock authorization service. Denies everything until told otherwise.
#[derive(Debug)]
pub struct MockHubApi {
    state: Arc<Mutex<ApiState>>,
}

/// Scripts and inspects a [`MockHubApi`].
#[derive(Debug, Clone)]
pub struct MockHubApiHandle {
    state: Arc<Mutex<ApiState>>,
}

fn lock(state: &Mutex<ApiState>) -> MutexGuard<'_, ApiState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHubApi {
    pub fn new() -> (Self, MockHubApiHandle) {
        let state = Arc::new(Mutex::new(ApiState {
            behavior: AuthBehavior::denied(),
            requests: Vec::new(),
            reports: Vec::new(),
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHubApiHandle { state },
        )
    }
}

impl HubApi for MockHubApi {
    async fn check_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        let behavior = {
            let mut state = lock(&self.state);
            state.requests.push(request.clone());
            state.behavior.clone()
        };

        match behavior {
            AuthBehavior::Respond(body) => {
                AuthResponse::parse(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
            }
            AuthBehavior::Unreachable => Err(ApiError::Transport("connection refused".into())),
            AuthBehavior::Status(code) => Err(ApiError::Status(code)),
            AuthBehavior::Hang => std::future::pending().await,
        }
    }

    async fn post_report(&self, report: &SensorReport) -> Result<(), ApiError> {
        lock(&self.state).reports.push(report.clone());
        Ok(())
    }
}

impl MockHubApiHandle {
    pub fn set_behavior(&self, behavior: AuthBehavior) {
        lock(&self.state).behavior = behavior;
    }

    /// Authorization requests received, oldest first.
    pub fn requests(&self) -> Vec<AuthRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn reports(&self) -> Vec<SensorReport> {
        lock(&self.state).reports.clone()
    }
}
