//! The tail → decode → persist loop.
//!
//! Single-threaded and strictly sequential: each line is decoded and its
//! insert awaited before the next line is read, so a slow database throttles
//! consumption directly. The only suspension point while idle is the poll
//! sleep. Delivery is at-most-once: lines that fail to decode or insert are
//! logged and dropped.

use logship_core::config::TailConfig;
use logship_core::{DecodeError, Decoded, Decoder};
use logship_observability::{IngestMetrics, Outcome};
use logship_store::RecordSink;
use logship_tail::{LineSource, ReadOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, trace, warn};

/// Result of one [`Ingestor::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Inserted,
    /// Blank line.
    Skipped,
    DecodeFailed,
    InsertFailed,
    /// No complete line available.
    Idle,
    /// The source could not be read; treated like `Idle`.
    ReadFailed,
}

impl Step {
    /// Whether the loop should sleep for the poll interval before the next step.
    pub fn should_wait(&self) -> bool {
        matches!(self, Step::Idle | Step::ReadFailed)
    }

    fn outcome(&self) -> Option<Outcome> {
        match self {
            Step::Inserted => Some(Outcome::Inserted),
            Step::Skipped => Some(Outcome::Skipped),
            Step::DecodeFailed => Some(Outcome::DecodeFailed),
            Step::InsertFailed => Some(Outcome::InsertFailed),
            Step::Idle | Step::ReadFailed => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub poll_interval: Duration,
    /// `None` disables truncation.
    pub truncate_interval: Option<Duration>,
}

impl From<&TailConfig> for IngestSettings {
    fn from(cfg: &TailConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            truncate_interval: cfg.truncate_interval(),
        }
    }
}

/// Running totals since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub decode_failures: u64,
    pub insert_failures: u64,
    pub truncations: u64,
    pub truncation_failures: u64,
}

pub struct Ingestor<S, K> {
    source: S,
    sink: K,
    decoder: Decoder,
    settings: IngestSettings,
    metrics: Arc<IngestMetrics>,
    next_truncate: Option<Instant>,
    stats: IngestStats,
}

impl<S: LineSource, K: RecordSink> Ingestor<S, K> {
    /// The truncation clock starts now.
    pub fn new(
        source: S,
        sink: K,
        decoder: Decoder,
        settings: IngestSettings,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        let next_truncate = settings.truncate_interval.map(|i| Instant::now() + i);
        Self {
            source,
            sink,
            decoder,
            settings,
            metrics,
            next_truncate,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Read at most one line and carry it through decode and insert, then
    /// truncate the source if the interval has elapsed.
    pub async fn step(&mut self) -> Step {
        let step = match self.source.next_line() {
            Ok(ReadOutcome::Line(line)) => {
                let decoded = self.decoder.decode(&line);
                self.process(decoded).await
            }
            Ok(ReadOutcome::Invalid(raw)) => {
                let decoded = self.decoder.decode_bytes(&raw);
                self.process(decoded).await
            }
            Ok(ReadOutcome::Pending) => Step::Idle,
            Err(e) => {
                error!(error = %e, "Failed to read log file");
                Step::ReadFailed
            }
        };

        if let Some(outcome) = step.outcome() {
            self.stats.lines += 1;
            self.metrics.record_line(outcome);
        }
        self.maybe_truncate(step.should_wait());
        self.metrics.set_cursor(self.source.cursor());
        step
    }

    async fn process(&mut self, decoded: Result<Decoded, DecodeError>) -> Step {
        let record = match decoded {
            Ok(Decoded::Record(record)) => record,
            Ok(Decoded::Skip) => {
                trace!("Skipping blank line");
                self.stats.skipped += 1;
                return Step::Skipped;
            }
            Err(e) => {
                warn!(reason = %e.kind, line = %e.line, "Dropping undecodable line");
                self.stats.decode_failures += 1;
                return Step::DecodeFailed;
            }
        };

        match self.sink.insert(&record).await {
            Ok(()) => {
                self.stats.inserted += 1;
                Step::Inserted
            }
            Err(e) => {
                warn!(error = %e, "Dropping record after failed insert");
                self.stats.insert_failures += 1;
                Step::InsertFailed
            }
        }
    }

    /// Truncate once the deadline has passed and the reader has caught up
    /// with the writer. If the reader never catches up, truncate anyway one
    /// full interval after the deadline so the file stays bounded.
    fn maybe_truncate(&mut self, caught_up: bool) {
        let (Some(deadline), Some(interval)) = (self.next_truncate, self.settings.truncate_interval)
        else {
            return;
        };
        let now = Instant::now();
        if now < deadline || !(caught_up || now >= deadline + interval) {
            return;
        }

        match self.source.truncate() {
            Ok(()) => {
                self.stats.truncations += 1;
                self.metrics.record_truncation(true);
                info!(truncations = self.stats.truncations, "Truncated log file");
            }
            Err(e) => {
                self.stats.truncation_failures += 1;
                self.metrics.record_truncation(false);
                error!(
                    error = %e,
                    retry_in_secs = interval.as_secs(),
                    "Failed to truncate log file, deferring to next interval"
                );
            }
        }
        self.next_truncate = Some(now + interval);
    }

    /// Step until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Shutdown is only observed between steps and while sleeping, never in
    /// the middle of an insert.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> IngestStats {
        info!(
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            truncate_interval_secs = self.settings.truncate_interval.map(|d| d.as_secs()),
            strict = self.decoder.is_strict(),
            "Ingestion loop started"
        );

        while !*shutdown.borrow() {
            let step = self.step().await;
            if !step.should_wait() {
                continue;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
                _ = sleep(self.settings.poll_interval) => {}
            }
        }

        info!(
            lines = self.stats.lines,
            inserted = self.stats.inserted,
            decode_failures = self.stats.decode_failures,
            insert_failures = self.stats.insert_failures,
            truncations = self.stats.truncations,
            "Ingestion loop stopped"
        );
        self.stats
    }
}
