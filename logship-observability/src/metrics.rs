use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// What happened to one line read from the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Skipped,
    DecodeFailed,
    InsertFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Inserted => "inserted",
            Outcome::Skipped => "skipped",
            Outcome::DecodeFailed => "decode_failed",
            Outcome::InsertFailed => "insert_failed",
        }
    }
}

/// Pipeline counters, all gated behind `enabled`.
///
/// When disabled no registry exists and every `record_*` call returns
/// immediately.
pub struct IngestMetrics {
    registry: Option<Registry>,
    lines_total: Option<IntCounter>,
    lines_by_outcome: Option<IntCounterVec>,
    truncations_total: Option<IntCounterVec>,
    cursor_bytes: Option<IntGauge>,
}

impl IngestMetrics {
    /// Create a new collector. When `enabled = false`, everything is None.
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let registry = Registry::new();

        let lines_total = IntCounter::with_opts(
            Opts::new("lines_read_total", "Complete lines read from the log file")
                .namespace("logship"),
        )?;
        let lines_by_outcome = IntCounterVec::new(
            Opts::new("lines_processed_total", "Lines by pipeline outcome").namespace("logship"),
            &["outcome"],
        )?;
        let truncations_total = IntCounterVec::new(
            Opts::new("truncations_total", "Log file truncation attempts").namespace("logship"),
            &["result"],
        )?;
        let cursor_bytes = IntGauge::with_opts(
            Opts::new("cursor_bytes", "Current read offset in the log file").namespace("logship"),
        )?;

        registry.register(Box::new(lines_total.clone()))?;
        registry.register(Box::new(lines_by_outcome.clone()))?;
        registry.register(Box::new(truncations_total.clone()))?;
        registry.register(Box::new(cursor_bytes.clone()))?;

        Ok(Self {
            registry: Some(registry),
            lines_total: Some(lines_total),
            lines_by_outcome: Some(lines_by_outcome),
            truncations_total: Some(truncations_total),
            cursor_bytes: Some(cursor_bytes),
        })
    }

    /// No-op collector.
    pub fn disabled() -> Self {
        Self {
            registry: None,
            lines_total: None,
            lines_by_outcome: None,
            truncations_total: None,
            cursor_bytes: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_some()
    }

    #[inline]
    pub fn record_line(&self, outcome: Outcome) {
        if let Some(ref c) = self.lines_total {
            c.inc();
        }
        if let Some(ref c) = self.lines_by_outcome {
            c.with_label_values(&[outcome.as_str()]).inc();
        }
    }

    #[inline]
    pub fn record_truncation(&self, ok: bool) {
        if let Some(ref c) = self.truncations_total {
            c.with_label_values(&[if ok { "ok" } else { "failed" }]).inc();
        }
    }

    #[inline]
    pub fn set_cursor(&self, offset: u64) {
        if let Some(ref g) = self.cursor_bytes {
            g.set(i64::try_from(offset).unwrap_or(i64::MAX));
        }
    }

    /// Render prometheus text exposition format (empty when disabled).
    pub fn render(&self) -> String {
        self.registry
            .as_ref()
            .map(crate::prometheus_exporter::render_metrics)
            .unwrap_or_default()
    }
}
