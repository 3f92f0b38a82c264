use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::time::Instant;

use ssort_types::{Emission, Priority, QUEUE_CAPACITY, RunConfig};

use crate::buffer::PriorityBuffer;
use crate::error::SetupError;
use crate::matcher::Matcher;
use crate::normalize::Normalizer;
use crate::scheduler::FlushScheduler;
use crate::sink::OutputSink;
use crate::source::LineSource;

/// Run one configuration end to end, writing results to `writer`.
///
/// Filters are compiled before the input is opened, so every setup error is
/// reported before a single line is read.
pub async fn run<W>(config: &RunConfig, writer: W) -> Result<W, SetupError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (output_tx, output_rx) = mpsc::channel(QUEUE_CAPACITY);
    let pipeline = Pipeline::new(config, output_tx)?;
    let source = LineSource::open(&config.source)?;
    let sink = OutputSink::spawn(output_rx, writer, config.output_budget());

    pipeline.run(source).await;
    Ok(sink.finish().await)
}

/// The event loop: classifies lines, buffers them and decides when to flush.
///
/// All buffer and counter state lives here and is only touched by the task
/// running [`Pipeline::run`].
pub struct Pipeline {
    normalizer: Normalizer,
    matcher: Matcher,
    buffer: PriorityBuffer,
    scheduler: FlushScheduler,

    /// Prioritized matches since the last flush
    prioritized: usize,

    limit: usize,
    only_matching: bool,
    keep_unmatched: bool,

    output: mpsc::Sender<Emission>,
}

impl Pipeline {
    pub fn new(config: &RunConfig, output: mpsc::Sender<Emission>) -> Result<Self, SetupError> {
        let normalizer = Normalizer::from_config(config);
        let matcher = Matcher::new(&config.filters, &normalizer, config.word_boundary)?;
        let scheduler = FlushScheduler::new(config.timeout)?;

        tracing::debug!(
            filters = matcher.len(),
            limit = config.limit,
            timeout = ?config.timeout,
            "pipeline configured"
        );

        Ok(Self {
            normalizer,
            matcher,
            buffer: PriorityBuffer::with_capacity(QUEUE_CAPACITY),
            scheduler,
            prioritized: 0,
            limit: config.limit,
            only_matching: config.only_matching,
            keep_unmatched: config.keep_unmatched,
            output,
        })
    }

    /// Consume `source` until it closes, then flush one last time.
    ///
    /// Dropping the pipeline at the end closes the output queue.
    pub async fn run(mut self, mut source: LineSource) {
        self.scheduler.rearm();

        loop {
            tokio::select! {
                line = source.next() => match line {
                    Some(line) => self.handle_line(line).await,
                    None => break,
                },
                _ = self.scheduler.fired() => {
                    self.flush().await;
                }
            }
        }

        self.flush().await;
        self.scheduler.disarm();
        tracing::debug!("input exhausted, pipeline finished");
    }

    /// Classify one line and route it
    pub async fn handle_line(&mut self, raw: String) {
        let clean = self.normalizer.normalize(&raw);

        match Priority::from(self.matcher.classify(&clean)) {
            Priority::Rank(0) => {
                // Original text, arrival order, no buffering
                self.emit(Emission::Ranked(raw)).await;
                self.prioritized += 1;
            }
            Priority::Unmatched => {
                if self.only_matching {
                    return;
                }
                if self.keep_unmatched {
                    self.emit(Emission::Passthrough(raw)).await;
                } else {
                    self.buffer.push(raw, clean, Priority::Unmatched);
                }
            }
            rank => {
                self.buffer.push(raw, clean, rank);
                self.prioritized += 1;

                if self.limit > 0 && self.prioritized >= self.limit {
                    self.flush().await;
                }
            }
        }
    }

    /// Drain the buffer in priority order, returning how many lines went out.
    ///
    /// An empty buffer leaves the counter and timer untouched.
    pub async fn flush(&mut self) -> usize {
        if self.buffer.is_empty() {
            return 0;
        }

        tracing::trace!(
            lines = self.buffer.len(),
            unmatched = self.buffer.unmatched_count(),
            prioritized = self.prioritized,
            "flushing buffer"
        );

        let lines = self.buffer.flush();
        let count = lines.len();

        for line in lines {
            self.emit(Emission::Ranked(line)).await;
        }
        self.prioritized = 0;
        self.scheduler.rearm();

        count
    }

    /// Lines waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// When the timer will next fire, if running
    pub fn next_flush(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    async fn emit(&self, emission: Emission) {
        // Only fails if the sink task died; nothing useful to do then
        let _ = self.output.send(emission).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    const TIMEOUT: Duration = Duration::from_millis(500);

    struct Harness {
        input: DuplexStream,
        output: mpsc::Receiver<Emission>,
        started: Instant,
        task: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start(config: RunConfig) -> Self {
            let (input, reader) = tokio::io::duplex(4096);
            let (tx, output) = mpsc::channel(QUEUE_CAPACITY);
            let pipeline = Pipeline::new(&config, tx).unwrap();
            let started = Instant::now();
            let task = tokio::spawn(pipeline.run(LineSource::from_reader(reader)));
            Self {
                input,
                output,
                started,
                task,
            }
        }

        async fn send(&mut self, lines: &[&str]) {
            for line in lines {
                self.input.write_all(line.as_bytes()).await.unwrap();
                self.input.write_all(b"\n").await.unwrap();
            }
        }

        async fn recv(&mut self) -> (String, Duration) {
            let emission = self.output.recv().await.expect("output closed early");
            (emission.line().to_string(), self.started.elapsed())
        }

        async fn finish(self) -> Vec<Emission> {
            let Self {
                input,
                mut output,
                task,
                ..
            } = self;
            drop(input);
            let mut rest = Vec::new();
            while let Some(emission) = output.recv().await {
                rest.push(emission);
            }
            task.await.unwrap();
            rest
        }
    }

    fn config(filters: &[&str]) -> RunConfig {
        RunConfig {
            timeout: TIMEOUT,
            ..RunConfig::with_filters(filters.iter().copied())
        }
    }

    fn lines(emissions: &[Emission]) -> Vec<&str> {
        emissions.iter().map(Emission::line).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rank_zero_bypasses_buffer() {
        let mut h = Harness::start(config(&["ERROR", "WARN"]));
        h.send(&["WARN: memory high", "ERROR: first", "ERROR: second"]).await;

        let (line, at) = h.recv().await;
        assert_eq!(line, "ERROR: first");
        assert!(at < TIMEOUT);
        let (line, at) = h.recv().await;
        assert_eq!(line, "ERROR: second");
        assert!(at < TIMEOUT);

        // Buffered rank 1 waits for the timer
        let (line, at) = h.recv().await;
        assert_eq!(line, "WARN: memory high");
        assert!(at >= TIMEOUT);

        assert!(h.finish().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flush_is_sorted() {
        let mut h = Harness::start(config(&["ERROR", "DEBUG", "WARN"]));
        h.send(&[
            "WARN: memory high",
            "unrelated b",
            "DEBUG: payload received",
            "unrelated a",
            "DEBUG: connection established",
            "WARN: INFO_PAD not found",
        ])
        .await;

        let mut flushed = Vec::new();
        for _ in 0..6 {
            let (line, at) = h.recv().await;
            assert!(at >= TIMEOUT);
            flushed.push(line);
        }
        assert_eq!(
            flushed,
            vec![
                "DEBUG: connection established",
                "DEBUG: payload received",
                "WARN: INFO_PAD not found",
                "WARN: memory high",
                "unrelated a",
                "unrelated b",
            ]
        );
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_triggered_flush() {
        let mut cfg = config(&["ERROR", "WARN"]);
        cfg.limit = 1;
        let mut h = Harness::start(cfg);
        h.send(&["WARN: memory high"]).await;

        let (line, at) = h.recv().await;
        assert_eq!(line, "WARN: memory high");
        assert!(at < TIMEOUT);
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rank_zero_counts_toward_limit() {
        let mut cfg = config(&["ERROR", "WARN"]);
        cfg.limit = 2;
        let mut h = Harness::start(cfg);
        h.send(&["ERROR: boom", "WARN: memory high"]).await;

        assert_eq!(h.recv().await.0, "ERROR: boom");
        let (line, at) = h.recv().await;
        assert_eq!(line, "WARN: memory high");
        assert!(at < TIMEOUT);
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_flush_on_close() {
        let mut h = Harness::start(config(&["ERROR", "WARN"]));
        h.send(&["zebra", "WARN: b", "apple", "WARN: a"]).await;

        let rest = h.finish().await;
        assert_eq!(lines(&rest), vec!["WARN: a", "WARN: b", "apple", "zebra"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_matching_drops_unmatched() {
        let mut cfg = config(&["ERROR", "WARN"]);
        cfg.only_matching = true;
        let mut h = Harness::start(cfg);
        h.send(&["noise", "WARN: a", "more noise"]).await;

        assert_eq!(lines(&h.finish().await), vec!["WARN: a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_unmatched_passes_through() {
        let mut cfg = config(&["ERROR", "WARN"]);
        cfg.keep_unmatched = true;
        let mut h = Harness::start(cfg);
        h.send(&["WARN: a", "second noise", "first noise"]).await;

        let (line, at) = h.recv().await;
        assert_eq!(line, "second noise");
        assert!(at < TIMEOUT);
        assert_eq!(h.recv().await.0, "first noise");

        let rest = h.finish().await;
        assert_eq!(rest, vec![Emission::Ranked("WARN: a".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_codes_preserved_in_output() {
        let mut cfg = config(&["ERROR", "WARN"]);
        cfg.color = true;
        let mut h = Harness::start(cfg);
        h.send(&["\x1b[33mWARN\x1b[0m: z", "WARN: a"]).await;

        let rest = h.finish().await;
        assert_eq!(lines(&rest), vec!["WARN: a", "\x1b[33mWARN\x1b[0m: z"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_flush_keeps_timer_phase() {
        let (tx, _rx) = mpsc::channel(QUEUE_CAPACITY);
        let mut pipeline = Pipeline::new(&config(&["ERROR"]), tx).unwrap();
        pipeline.scheduler.rearm();
        let deadline = pipeline.next_flush();

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(pipeline.flush().await, 0);
        assert_eq!(pipeline.flush().await, 0);
        assert_eq!(pipeline.next_flush(), deadline);

        pipeline.handle_line("anything".into()).await;
        assert_eq!(pipeline.buffered(), 1);
        assert_eq!(pipeline.flush().await, 1);
        assert!(pipeline.next_flush() > deadline);
    }

    #[tokio::test]
    async fn test_invalid_timeout_is_setup_error() {
        let (tx, _rx) = mpsc::channel(1);
        let mut cfg = config(&["ERROR"]);
        cfg.timeout = Duration::ZERO;
        assert!(matches!(Pipeline::new(&cfg, tx), Err(SetupError::ZeroTimeout)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_command_source() {
        let cfg = RunConfig {
            filters: vec!["ERROR".into(), "WARN".into()],
            source: ssort_types::InputSource::Command(vec![
                "printf".into(),
                "b\\nWARN: x\\nERROR: y\\na\\n".into(),
            ]),
            ..RunConfig::default()
        };
        let out = run(&cfg, Vec::new()).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ERROR: y\nWARN: x\na\nb\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_applies_output_budget() {
        let cfg = RunConfig {
            filters: vec!["WARN".into()],
            limit: 1,
            source: ssort_types::InputSource::Command(vec![
                "printf".into(),
                "DEBUG: a\\nWARN: first\\nWARN: second\\nINFO: b\\n".into(),
            ]),
            ..RunConfig::default()
        };
        let out = run(&cfg, Vec::new()).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "WARN: first\n");
    }
}
