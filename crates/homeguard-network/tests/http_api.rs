//! Integration tests for HttpHubApi against a local HTTP responder.

use homeguard_core::{CredentialAttempt, DeviceIdentity};
use homeguard_network::{ApiError, HttpHubApi, HttpHubApiConfig, HubApi};
use homeguard_protocol::{AuthRequest, SensorReport};
use rstest::rstest;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve exactly one request with the given status line and body. The
/// request body is sent back through the returned receiver.
async fn respond_once(status: &'static str, body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (body_tx, body_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];

        let request_body = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            raw.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let headers = text[..split].to_ascii_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let body = &text[split + 4..];
                if body.len() >= length {
                    break body.to_string();
                }
            }
            if n == 0 {
                break String::new();
            }
        };
        let _ = body_tx.send(request_body);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });

    (addr, body_rx)
}

fn api(addr: SocketAddr) -> HttpHubApi {
    HttpHubApi::new(HttpHubApiConfig {
        auth_url: format!("http://{addr}/api/check-auth/"),
        report_url: Some(format!("http://{addr}/api/sensor-data/")),
        timeout: Duration::from_secs(2),
    })
    .unwrap()
}

fn request() -> AuthRequest {
    let device = DeviceIdentity::new("hub-01").unwrap();
    AuthRequest::new(&CredentialAttempt::keypad("1234").unwrap(), &device)
}

#[tokio::test]
async fn test_granted_response() {
    let (addr, body_rx) = respond_once("200 OK", r#"{"status":"GRANTED"}"#).await;

    let response = api(addr).check_auth(&request()).await.unwrap();
    assert!(response.is_granted());

    let sent: serde_json::Value = serde_json::from_str(&body_rx.await.unwrap()).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({"type": "keypad", "value": "1234", "device_id": "hub-01"})
    );
}

#[rstest]
#[case(r#"{"status":"granted"}"#)]
#[case(r#"{"status":"MAYBE"}"#)]
#[case(r#"{"result":"GRANTED"}"#)]
#[tokio::test]
async fn test_non_granting_bodies(#[case] body: &'static str) {
    let (addr, _) = respond_once("200 OK", body).await;
    let response = api(addr).check_auth(&request()).await.unwrap();
    assert!(!response.is_granted());
}

#[tokio::test]
async fn test_non_2xx_status_is_error() {
    let (addr, _) = respond_once("503 Service Unavailable", r#"{"status":"GRANTED"}"#).await;
    let result = api(addr).check_auth(&request()).await;
    assert!(matches!(result, Err(ApiError::Status(503))));
}

#[tokio::test]
async fn test_malformed_body_is_error() {
    let (addr, _) = respond_once("200 OK", "not json").await;
    let result = api(addr).check_auth(&request()).await;
    assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = api(addr).check_auth(&request()).await;
    assert!(matches!(result, Err(ApiError::Transport(_))));
}

#[tokio::test]
async fn test_sensor_report_posted() {
    let (addr, body_rx) = respond_once("200 OK", "{}").await;
    let device = DeviceIdentity::new("hub-01").unwrap();

    api(addr)
        .post_report(&SensorReport::new(24.5, 61.0, &device))
        .await
        .unwrap();

    let sent: serde_json::Value = serde_json::from_str(&body_rx.await.unwrap()).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({"temperature": 24.5, "humidity": 61.0, "device_id": "hub-01"})
    );
}
