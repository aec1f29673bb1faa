use std::time::Duration;

use async_trait::async_trait;
use cds_component::{ComponentError, ComponentNode, StepAttributes, StepContext, parse_inputs};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const NETCONF_COMPONENT: &str = "component-netconf";

/// NETCONF 1.0 end-of-message marker.
const END_PATTERN: &str = "]]>]]>";

const BASE_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NetconfInput {
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  /// RPC bodies, sent in order inside `<rpc>` elements.
  rpcs: Vec<String>,
  #[serde(default = "default_reply_timeout_ms")]
  reply_timeout_ms: u64,
}

fn default_port() -> u16 {
  830
}

fn default_reply_timeout_ms() -> u64 {
  30_000
}

/// Framed NETCONF 1.0 message stream.
pub(crate) struct NetconfSession<S> {
  stream: S,
  buffer: Vec<u8>,
  next_message_id: u64,
  reply_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> NetconfSession<S> {
  pub(crate) fn new(stream: S, reply_timeout: Duration) -> Self {
    Self {
      stream,
      buffer: Vec::new(),
      next_message_id: 1,
      reply_timeout,
    }
  }

  /// Read the server hello and answer with ours.
  pub(crate) async fn hello(&mut self) -> Result<String, ComponentError> {
    let server_hello = self.read_message().await?;
    if !server_hello.contains("<hello") {
      return Err(ComponentError::execution("device did not send a hello"));
    }
    let hello = format!(
      r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{}"><capabilities><capability>{}</capability></capabilities></hello>"#,
      BASE_NAMESPACE, BASE_CAPABILITY
    );
    self.write_message(&hello).await?;
    Ok(server_hello)
  }

  /// Send one RPC and wait for its reply.
  pub(crate) async fn rpc(&mut self, body: &str) -> Result<String, ComponentError> {
    let message_id = self.next_message_id;
    self.next_message_id += 1;
    let rpc = format!(
      r#"<rpc message-id="{}" xmlns="{}">{}</rpc>"#,
      message_id, BASE_NAMESPACE, body
    );
    self.write_message(&rpc).await?;
    self.read_message().await
  }

  pub(crate) async fn close(&mut self) -> Result<String, ComponentError> {
    self.rpc("<close-session/>").await
  }

  async fn write_message(&mut self, message: &str) -> Result<(), ComponentError> {
    self.stream.write_all(message.as_bytes()).await?;
    self.stream.write_all(END_PATTERN.as_bytes()).await?;
    self.stream.flush().await?;
    Ok(())
  }

  async fn read_message(&mut self) -> Result<String, ComponentError> {
    let reply_timeout = self.reply_timeout;
    tokio::time::timeout(reply_timeout, self.read_frame())
      .await
      .map_err(|_| {
        ComponentError::execution(format!(
          "no netconf reply within {}ms",
          reply_timeout.as_millis()
        ))
      })?
  }

  async fn read_frame(&mut self) -> Result<String, ComponentError> {
    let marker = END_PATTERN.as_bytes();
    loop {
      if let Some(pos) = self.buffer.windows(marker.len()).position(|w| w == marker) {
        let message: Vec<u8> = self.buffer.drain(..pos + marker.len()).take(pos).collect();
        return Ok(String::from_utf8_lossy(&message).trim().to_string());
      }
      let mut chunk = [0u8; 4096];
      let n = self.stream.read(&mut chunk).await?;
      if n == 0 {
        return Err(ComponentError::execution("netconf session closed by device"));
      }
      self.buffer.extend_from_slice(&chunk[..n]);
    }
  }
}

/// Whether a reply reports an `<rpc-error>`.
pub(crate) fn is_rpc_error(reply: &str) -> bool {
  reply.contains("<rpc-error") || reply.contains(":rpc-error")
}

/// Runs RPCs against a device over a NETCONF 1.0 session on TCP.
#[derive(Debug, Clone, Default)]
pub struct NetconfComponent;

impl NetconfComponent {
  pub fn new() -> Self {
    Self
  }

  async fn run_session(
    &self,
    ctx: &StepContext,
    input: &NetconfInput,
  ) -> Result<StepAttributes, ComponentError> {
    let stream = TcpStream::connect((input.host.as_str(), input.port)).await?;
    let mut session = NetconfSession::new(stream, Duration::from_millis(input.reply_timeout_ms));
    session.hello().await?;
    info!(step = %ctx.step_name, host = %input.host, port = input.port, "netconf_session_opened");

    let mut replies = Vec::with_capacity(input.rpcs.len());
    let mut failure = None;
    for rpc in &input.rpcs {
      let reply = session.rpc(rpc).await?;
      debug!(step = %ctx.step_name, "netconf_rpc_reply");
      let errored = is_rpc_error(&reply);
      replies.push(serde_json::Value::String(reply));
      if errored {
        failure = Some(format!("rpc {} returned rpc-error", replies.len()));
        break;
      }
    }

    if let Err(e) = session.close().await {
      warn!(step = %ctx.step_name, error = %e, "netconf_close_failed");
    }

    let data = json!({ "replies": replies });
    Ok(match failure {
      Some(message) => StepAttributes::failure(data).with_attribute("error", message),
      None => StepAttributes::success(data),
    })
  }
}

#[async_trait]
impl ComponentNode for NetconfComponent {
  fn name(&self) -> &str {
    NETCONF_COMPONENT
  }

  fn validate(&self, _ctx: &StepContext, inputs: &serde_json::Value) -> Result<(), ComponentError> {
    let input: NetconfInput = parse_inputs(inputs)?;
    if input.host.is_empty() {
      return Err(ComponentError::invalid_input("host", "must not be empty"));
    }
    Ok(())
  }

  async fn process(
    &self,
    ctx: &StepContext,
    inputs: &serde_json::Value,
    cancel: &CancellationToken,
  ) -> Result<StepAttributes, ComponentError> {
    let input: NetconfInput = parse_inputs(inputs)?;
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(ComponentError::Cancelled),
      result = self.run_session(ctx, &input) => result,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_framing_splits_messages() {
    let (client, mut device) = tokio::io::duplex(1024);
    device
      .write_all(b"<hello><capabilities/></hello>]]>]]><rpc-reply><ok/></rpc-reply>]]>]]>")
      .await
      .unwrap();

    let mut session = NetconfSession::new(client, Duration::from_secs(1));
    let hello = session.hello().await.unwrap();
    assert_eq!(hello, "<hello><capabilities/></hello>");

    let reply = session.rpc("<get/>").await.unwrap();
    assert_eq!(reply, "<rpc-reply><ok/></rpc-reply>");

    let mut sent = vec![0u8; 1024];
    let n = device.read(&mut sent).await.unwrap();
    let sent = String::from_utf8_lossy(&sent[..n]);
    assert!(sent.contains(BASE_CAPABILITY));
    assert!(sent.contains(r#"<rpc message-id="1""#));
    assert!(sent.ends_with(END_PATTERN));
  }

  #[tokio::test]
  async fn test_reply_timeout() {
    let (client, _device) = tokio::io::duplex(64);
    let mut session = NetconfSession::new(client, Duration::from_millis(20));
    assert!(matches!(
      session.hello().await,
      Err(ComponentError::Execution { .. })
    ));
  }

  #[test]
  fn test_is_rpc_error() {
    assert!(is_rpc_error("<rpc-reply><rpc-error><error-tag>x</error-tag></rpc-error></rpc-reply>"));
    assert!(is_rpc_error("<nc:rpc-reply><nc:rpc-error/></nc:rpc-reply>"));
    assert!(!is_rpc_error("<rpc-reply><ok/></rpc-reply>"));
  }
}
