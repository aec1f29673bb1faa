use std::time::Duration;

use cds_component::{ComponentError, ComponentNode, StepContext};
use cds_components::{NetconfComponent, RestfulComponent};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const END: &str = "]]>]]>";

/// Answer one HTTP request with `status` and `body`, reporting the raw request.
async fn serve_http(status: u16, body: &str) -> (String, mpsc::UnboundedReceiver<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let (tx, rx) = mpsc::unbounded_channel();
  let body = body.to_string();

  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
      let n = socket.read(&mut chunk).await.unwrap();
      if n == 0 {
        break;
      }
      buf.extend_from_slice(&chunk[..n]);
      if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
        let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
        let length = head
          .lines()
          .find_map(|l| l.strip_prefix("content-length:"))
          .and_then(|v| v.trim().parse::<usize>().ok())
          .unwrap_or(0);
        if buf.len() >= pos + 4 + length {
          break;
        }
      }
    }
    let _ = tx.send(String::from_utf8_lossy(&buf).to_string());

    let response = format!(
      "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status,
      body.len(),
      body
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = socket.shutdown().await;
  });

  (format!("http://{}", addr), rx)
}

async fn read_frame(socket: &mut TcpStream, buffer: &mut Vec<u8>) -> Option<String> {
  loop {
    if let Some(pos) = buffer.windows(END.len()).position(|w| w == END.as_bytes()) {
      let frame = String::from_utf8_lossy(&buffer[..pos]).to_string();
      buffer.drain(..pos + END.len());
      return Some(frame);
    }
    let mut chunk = [0u8; 1024];
    let n = socket.read(&mut chunk).await.ok()?;
    if n == 0 {
      return None;
    }
    buffer.extend_from_slice(&chunk[..n]);
  }
}

/// A device that greets, answers each rpc with `reply_for`, and reports the
/// frames it received.
async fn serve_netconf(
  reply_for: fn(&str) -> String,
) -> (u16, mpsc::UnboundedReceiver<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let port = listener.local_addr().unwrap().port();
  let (tx, rx) = mpsc::unbounded_channel();

  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let hello = format!(
      "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities><session-id>7</session-id></hello>{}",
      END
    );
    socket.write_all(hello.as_bytes()).await.unwrap();

    let mut buffer = Vec::new();
    while let Some(frame) = read_frame(&mut socket, &mut buffer).await {
      let _ = tx.send(frame.clone());
      if frame.contains("<hello") {
        continue;
      }
      let reply = format!("{}{}", reply_for(&frame), END);
      if socket.write_all(reply.as_bytes()).await.is_err() {
        break;
      }
      if frame.contains("<close-session/>") {
        break;
      }
    }
  });

  (port, rx)
}

fn ok_reply(_frame: &str) -> String {
  "<rpc-reply><ok/></rpc-reply>".to_string()
}

fn lock_fails(frame: &str) -> String {
  if frame.contains("<lock>") {
    "<rpc-reply><rpc-error><error-tag>lock-denied</error-tag></rpc-error></rpc-reply>".to_string()
  } else {
    ok_reply(frame)
  }
}

#[tokio::test]
async fn test_restful_success() {
  let (url, mut requests) = serve_http(201, r#"{"id": "svc-1"}"#).await;
  let inputs = json!({
    "method": "POST",
    "url": format!("{}/services", url),
    "headers": { "X-Trace": "t-1" },
    "body": { "name": "vfw" },
    "expected-status": [201]
  });

  let attrs = RestfulComponent::new()
    .process(&StepContext::default(), &inputs, &CancellationToken::new())
    .await
    .unwrap();
  assert!(attrs.is_success());
  assert_eq!(attrs.response_data["status"], 201);
  assert_eq!(attrs.response_data["body"]["id"], "svc-1");

  let request = requests.recv().await.unwrap();
  assert!(request.starts_with("POST /services HTTP/1.1"));
  assert!(request.to_lowercase().contains("x-trace: t-1"));
  assert!(request.ends_with(r#"{"name":"vfw"}"#));
}

#[tokio::test]
async fn test_restful_non_success_fails() {
  let (url, _requests) = serve_http(503, r#"{"error": "busy"}"#).await;
  let inputs = json!({ "url": url });

  let attrs = RestfulComponent::new()
    .process(&StepContext::default(), &inputs, &CancellationToken::new())
    .await
    .unwrap();
  assert!(!attrs.is_success());
  assert_eq!(attrs.response_data["status"], 503);
  assert!(attrs.error_message().unwrap().contains("503"));
}

#[tokio::test]
async fn test_restful_cancelled_while_reading_body() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let url = format!("http://{}", listener.local_addr().unwrap());
  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut chunk = [0u8; 1024];
    let _ = socket.read(&mut chunk).await.unwrap();
    // Promise a body that never fully arrives.
    socket
      .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n{\"partial\":")
      .await
      .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
  });

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(50)).await;
    trigger.cancel();
  });

  let result = tokio::time::timeout(
    Duration::from_secs(2),
    RestfulComponent::new().process(&StepContext::default(), &json!({ "url": url }), &cancel),
  )
  .await
  .unwrap();
  assert!(matches!(result, Err(ComponentError::Cancelled)));
}

#[tokio::test]
async fn test_netconf_session() {
  let (port, mut frames) = serve_netconf(ok_reply).await;
  let inputs = json!({
    "host": "127.0.0.1",
    "port": port,
    "rpcs": ["<get-config><source><running/></source></get-config>"]
  });

  let attrs = NetconfComponent::new()
    .process(&StepContext::default(), &inputs, &CancellationToken::new())
    .await
    .unwrap();
  assert!(attrs.is_success());
  assert_eq!(
    attrs.response_data["replies"],
    json!(["<rpc-reply><ok/></rpc-reply>"])
  );

  let hello = frames.recv().await.unwrap();
  assert!(hello.contains("<hello"));
  let rpc = frames.recv().await.unwrap();
  assert!(rpc.contains(r#"message-id="1""#));
  assert!(rpc.contains("<get-config>"));
  let close = frames.recv().await.unwrap();
  assert!(close.contains("<close-session/>"));
}

#[tokio::test]
async fn test_netconf_rpc_error_fails_and_closes() {
  let (port, mut frames) = serve_netconf(lock_fails).await;
  let inputs = json!({
    "host": "127.0.0.1",
    "port": port,
    "rpcs": ["<lock><target><candidate/></target></lock>", "<commit/>"]
  });

  let attrs = NetconfComponent::new()
    .process(&StepContext::default(), &inputs, &CancellationToken::new())
    .await
    .unwrap();
  assert!(!attrs.is_success());
  assert_eq!(attrs.response_data["replies"].as_array().unwrap().len(), 1);

  let mut received = Vec::new();
  while let Some(frame) = frames.recv().await {
    received.push(frame);
  }
  assert!(!received.iter().any(|f| f.contains("<commit/>")));
  assert!(received.last().unwrap().contains("<close-session/>"));
}

#[tokio::test]
async fn test_netconf_connection_refused() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let port = listener.local_addr().unwrap().port();
  drop(listener);

  let result = NetconfComponent::new()
    .process(
      &StepContext::default(),
      &json!({ "host": "127.0.0.1", "port": port, "rpcs": [] }),
      &CancellationToken::new(),
    )
    .await;
  assert!(result.is_err());
}
