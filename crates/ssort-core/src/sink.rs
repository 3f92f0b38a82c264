use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

use ssort_types::Emission;

/// Writes emitted lines on a background task.
///
/// Ranked lines count against the optional budget; once it is spent the sink
/// keeps receiving and discarding so upstream never blocks on it.
pub struct OutputSink<W> {
    task: tokio::task::JoinHandle<W>,
}

impl<W> OutputSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn spawn(lines: mpsc::Receiver<Emission>, writer: W, budget: Option<usize>) -> Self {
        let task = tokio::spawn(drain(lines, writer, budget));
        Self { task }
    }

    /// Wait until every sender is gone and the queue is empty
    pub async fn finish(self) -> W {
        match self.task.await {
            Ok(writer) => writer,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

/// Remaining-output counter
#[derive(Clone, Copy, Debug)]
struct Budget(Option<usize>);

impl Budget {
    /// Take one unit if the emission is budgeted; false when spent
    fn admit(&mut self, emission: &Emission) -> bool {
        if !emission.is_budgeted() {
            return true;
        }
        match &mut self.0 {
            None => true,
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

async fn drain<W>(mut lines: mpsc::Receiver<Emission>, writer: W, budget: Option<usize>) -> W
where
    W: AsyncWrite + Unpin,
{
    let mut out = BufWriter::new(writer);
    let mut budget = Budget(budget);
    let mut healthy = true;
    let mut written: u64 = 0;
    let mut discarded: u64 = 0;

    while let Some(first) = lines.recv().await {
        // Write everything already queued, then flush once
        let mut next = Some(first);
        while let Some(emission) = next {
            if healthy && budget.admit(&emission) {
                match write_line(&mut out, emission.line()).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        report_write_error(&e);
                        healthy = false;
                    }
                }
            } else {
                discarded += 1;
            }
            next = lines.try_recv().ok();
        }

        if healthy {
            if let Err(e) = out.flush().await {
                report_write_error(&e);
                healthy = false;
            }
        }
    }

    tracing::debug!(written, discarded, "output closed");
    out.into_inner()
}

async fn write_line<W>(out: &mut BufWriter<W>, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await
}

fn report_write_error(e: &io::Error) {
    // A closed pipe just means the reader went away
    if e.kind() == io::ErrorKind::BrokenPipe {
        tracing::debug!("output closed by reader, discarding remaining lines");
    } else {
        tracing::warn!(error = %e, "failed to write output, discarding remaining lines");
    }
}
