use std::process::{Output, Stdio};

use cds_component::ComponentError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Run a child process to completion, feeding `stdin` if given. The child is
/// killed when `cancel` fires or the returned future is dropped.
pub(crate) async fn run_child(
  mut command: Command,
  stdin: Option<Vec<u8>>,
  cancel: &CancellationToken,
) -> Result<Output, ComponentError> {
  command
    .stdin(if stdin.is_some() {
      Stdio::piped()
    } else {
      Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let mut child = command.spawn()?;

  let run = async move {
    if let Some(bytes) = stdin
      && let Some(mut pipe) = child.stdin.take()
    {
      pipe.write_all(&bytes).await?;
      drop(pipe);
    }
    child.wait_with_output().await
  };

  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(ComponentError::Cancelled),
    output = run => Ok(output?),
  }
}

/// Lossy UTF-8 of a captured stream with trailing whitespace removed.
pub(crate) fn stream_text(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).trim_end().to_string()
}
