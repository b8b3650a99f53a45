mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use notify_core::PushMessage;
use notify_host::adapters::push::{ExpoPushRelay, PushRelay};
use notify_host::config::PushConfig;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Answers one request with `status_line` and `body`, handing the request
/// body back through the returned channel.
async fn start_test_server(
    body: &'static str,
    status_line: &'static str,
) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });
    (addr, rx)
}

/// Reads headers and a `Content-Length` body; returns the body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(split) = text.find("\r\n\r\n") {
            let length = text[..split]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= split + 4 + length {
                return String::from_utf8_lossy(&buf[split + 4..split + 4 + length]).into_owned();
            }
        }
    }
    String::new()
}

fn relay(addr: SocketAddr) -> ExpoPushRelay {
    ExpoPushRelay::new(PushConfig {
        endpoint: format!("http://{addr}/--/api/v2/push/send"),
        timeout: Duration::from_secs(5),
        ..PushConfig::default()
    })
    .unwrap()
}

fn message() -> PushMessage {
    PushMessage::new(
        "ExponentPushToken[abc]",
        "Results ready",
        "Open the app",
        json!({ "type": "results_ready" }),
    )
}

#[tokio::test]
async fn accepted_ticket_is_success() {
    if !helpers::loopback_available().await {
        eprintln!("skipping accepted_ticket_is_success: loopback bind not permitted");
        return;
    }
    let (addr, request) =
        start_test_server(r#"{"data":{"status":"ok","id":"tkt-1"}}"#, "200 OK").await;

    let result = relay(addr).deliver(message()).await;
    assert!(result.success);
    assert_eq!(result.ticket_id.as_deref(), Some("tkt-1"));

    let sent: Value = serde_json::from_str(&request.await.unwrap()).unwrap();
    assert_eq!(sent["to"], "ExponentPushToken[abc]");
    assert_eq!(sent["priority"], "high");
    assert_eq!(sent["channelId"], "results");
    assert_eq!(sent["data"]["type"], "results_ready");
    assert!(sent.get("sound").is_none());
}

#[tokio::test]
async fn error_ticket_is_failure_with_reason() {
    if !helpers::loopback_available().await {
        eprintln!("skipping error_ticket_is_failure_with_reason: loopback bind not permitted");
        return;
    }
    let (addr, _) = start_test_server(
        r#"{"data":{"status":"error","message":"DeviceNotRegistered"}}"#,
        "200 OK",
    )
    .await;
    let result = relay(addr).deliver(message()).await;
    assert!(!result.success);
    assert_eq!(result.reason.as_deref(), Some("DeviceNotRegistered"));
}

#[tokio::test]
async fn request_level_errors_are_failures() {
    if !helpers::loopback_available().await {
        eprintln!("skipping request_level_errors_are_failures: loopback bind not permitted");
        return;
    }
    let (addr, _) = start_test_server(
        r#"{"errors":[{"code":"VALIDATION_ERROR","message":"\"to\" must be a string"}]}"#,
        "400 Bad Request",
    )
    .await;
    let result = relay(addr).deliver(message()).await;
    assert!(!result.success);
    assert!(result.reason.unwrap().contains("must be a string"));
}

#[tokio::test]
async fn non_json_reply_is_failure() {
    if !helpers::loopback_available().await {
        eprintln!("skipping non_json_reply_is_failure: loopback bind not permitted");
        return;
    }
    let (addr, _) = start_test_server("upstream down", "502 Bad Gateway").await;
    let result = relay(addr).deliver(message()).await;
    assert!(!result.success);
    assert!(result.reason.unwrap().contains("502"));
}

#[tokio::test]
async fn unreachable_endpoint_is_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await;
    let Ok(listener) = listener else {
        eprintln!("skipping unreachable_endpoint_is_failure: loopback bind not permitted");
        return;
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let result = relay(addr).deliver(message()).await;
    assert!(!result.success);
    assert!(result.reason.is_some());
}
