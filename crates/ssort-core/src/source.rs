use std::process::Stdio;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};

use ssort_types::{InputSource, MAX_LINE_LENGTH, QUEUE_CAPACITY};

use crate::error::SetupError;

/// Sequential feed of input lines produced on a background task.
///
/// Lines travel through a bounded queue; when it is full the reader waits.
/// A read error ends the feed the same way end-of-input does.
pub struct LineSource {
    /// Line receiver
    lines: mpsc::Receiver<String>,

    /// Reader task handle
    task: tokio::task::JoinHandle<()>,
}

impl LineSource {
    /// Open whichever input the configuration names
    pub fn open(source: &InputSource) -> Result<Self, SetupError> {
        match source {
            InputSource::Stdin => Ok(Self::stdin()),
            InputSource::Command(argv) => Self::command(argv),
        }
    }

    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    /// Read lines from any async reader
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(async move {
            pump_lines(reader, &tx).await;
        });

        Self { lines: rx, task }
    }

    /// Spawn `argv` and read its standard output.
    ///
    /// Spawn failures are reported here; the exit status is only logged.
    pub fn command(argv: &[String]) -> Result<Self, SetupError> {
        let (program, args) = argv.split_first().ok_or(SetupError::EmptyCommand)?;
        let command_line = argv.join(" ");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SetupError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SetupError::Spawn {
            command: command_line.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        tracing::debug!(command = %command_line, pid = ?child.id(), "spawned input command");

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(async move {
            pump_lines(stdout, &tx).await;
            // The queue stays open until the child is reaped
            reap(child, &command_line).await;
        });

        Ok(Self { lines: rx, task })
    }

    /// Receive the next line; `None` once the source is exhausted
    pub async fn next(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Forward lines until end-of-input, a read error, or a closed queue
async fn pump_lines<R>(reader: R, tx: &mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_LENGTH);
    let mut frames = FramedRead::new(reader, codec);
    let mut count: u64 = 0;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(bytes) => {
                let mut line = String::from_utf8_lossy(&bytes).into_owned();
                if line.ends_with('\r') {
                    line.pop();
                }
                if tx.send(line).await.is_err() {
                    // Consumer gone, nothing left to feed
                    break;
                }
                count += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading input");
                break;
            }
        }
    }

    tracing::debug!(lines = count, "input closed");
}

async fn reap(mut child: Child, command_line: &str) {
    match child.wait().await {
        Ok(status) => tracing::debug!(command = %command_line, %status, "input command exited"),
        Err(e) => tracing::debug!(command = %command_line, error = %e, "failed to wait on input command"),
    }
}
