//! Client for the remote authorization service.

#![allow(async_fn_in_trait)]

use homeguard_protocol::{AuthRequest, AuthResponse, SensorReport};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from remote API calls. Every one of them is a denial when it comes
/// from the authorization path.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = e.status() {
            ApiError::Status(status.as_u16())
        } else if e.is_decode() {
            ApiError::MalformedResponse(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Remote endpoints used by the hub.
///
/// # Object Safety
///
/// Uses native `async fn`, so the hub is generic over the implementation
/// rather than holding a `Box<dyn HubApi>`.
pub trait HubApi {
    /// Submit one credential for authorization.
    async fn check_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError>;

    /// Post one climate sample.
    async fn post_report(&self, report: &SensorReport) -> Result<(), ApiError>;
}

/// Configuration for [`HttpHubApi`].
#[derive(Debug, Clone)]
pub struct HttpHubApiConfig {
    pub auth_url: String,

    /// Reports are dropped when no endpoint is configured.
    pub report_url: Option<String>,

    /// Upper bound on a whole request, connect to last body byte.
    pub timeout: Duration,
}

/// HTTP implementation of [`HubApi`].
#[derive(Debug, Clone)]
pub struct HttpHubApi {
    client: reqwest::Client,
    auth_url: reqwest::Url,
    report_url: Option<reqwest::Url>,
}

fn parse_url(url: &str) -> Result<reqwest::Url, ApiError> {
    reqwest::Url::parse(url).map_err(|e| ApiError::InvalidConfig(format!("{url}: {e}")))
}

impl HttpHubApi {
    /// # Errors
    /// Returns `ApiError::InvalidConfig` if a URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(config: HttpHubApiConfig) -> Result<Self, ApiError> {
        let auth_url = parse_url(&config.auth_url)?;
        let report_url = config
            .report_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(parse_url)
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            auth_url,
            report_url,
        })
    }

    #[must_use]
    pub fn auth_url(&self) -> &reqwest::Url {
        &self.auth_url
    }
}

impl HubApi for HttpHubApi {
    async fn check_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        trace!(url = %self.auth_url, kind = %request.kind, "Sending authorization request");

        let response = self
            .client
            .post(self.auth_url.clone())
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        debug!(bytes = body.len(), "Authorization response received");

        AuthResponse::parse(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    async fn post_report(&self, report: &SensorReport) -> Result<(), ApiError> {
        let Some(url) = &self.report_url else {
            trace!("No report endpoint configured, dropping report");
            return Ok(());
        };

        self.client
            .post(url.clone())
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth_url: &str) -> HttpHubApiConfig {
        HttpHubApiConfig {
            auth_url: auth_url.to_string(),
            report_url: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(
            HttpHubApi::new(config("not a url")),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_blank_report_url_means_none() {
        let mut cfg = config("http://127.0.0.1:8000/api/check-auth/");
        cfg.report_url = Some("  ".to_string());
        let api = HttpHubApi::new(cfg).unwrap();
        assert!(api.report_url.is_none());
        assert_eq!(api.auth_url().path(), "/api/check-auth/");
    }
}
