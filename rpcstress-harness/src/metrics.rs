use rpcstress_common::{ErrorKind, RpcError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// One timed result of a single call attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Time from just before the call to just after it returned. Only meaningful without an error.
    pub duration: Duration,
    pub error: Option<RpcError>,
}

impl Outcome {
    pub fn success(duration: Duration) -> Self {
        Self { duration, error: None }
    }

    pub fn failure(duration: Duration, error: RpcError) -> Self {
        Self { duration, error: Some(error) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate state of a run.
///
/// `requests_total == errors + durations.len()` holds after every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub requests_total: u64,
    pub errors: u64,
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
    /// One entry per successful call, in arrival order (unsorted).
    pub durations: Vec<Duration>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl Metrics {
    /// Duration at rank `floor(p * n)` of the sorted successful durations.
    /// `p` is clamped into `[0, 1]`; returns zero when there are no samples.
    pub fn percentile(&self, p: f64) -> Duration {
        percentile(&self.durations, p)
    }

    pub fn p50(&self) -> Duration {
        self.percentile(0.50)
    }

    pub fn p90(&self) -> Duration {
        self.percentile(0.90)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(0.99)
    }

    /// Mean of the successful durations, zero when there are none.
    pub fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let total: u128 = self.durations.iter().map(Duration::as_nanos).sum();
        let mean = total / self.durations.len() as u128;
        Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    pub fn min(&self) -> Duration {
        self.durations.iter().min().copied().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.durations.iter().max().copied().unwrap_or_default()
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn error_rate(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        self.errors as f64 / self.requests_total as f64
    }

    /// Wall-clock span of the run, never shorter than 1ns once both ends are known.
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).max(Duration::from_nanos(1)),
            _ => Duration::ZERO,
        }
    }

    pub fn throughput_rps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.requests_total as f64 / secs
    }
}

/// Sort a copy of `data` ascending and return the element at index `floor(p * n)`.
/// Returns zero for an empty slice.
fn percentile(data: &[Duration], p: f64) -> Duration {
    if data.is_empty() {
        return Duration::ZERO;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Mutable aggregate of outcomes.
///
/// Recording takes `&mut self`; the runner hands the collector to a single
/// aggregation task, which is the only writer.
#[derive(Debug, Default)]
pub struct Collector {
    metrics: Metrics,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.metrics.requests_total += 1;
        match outcome.error {
            Some(error) => {
                self.metrics.errors += 1;
                *self.metrics.errors_by_kind.entry(error.kind()).or_insert(0) += 1;
            }
            None => self.metrics.durations.push(outcome.duration),
        }
    }

    /// Stamp the run window used for throughput.
    pub fn mark_window(&mut self, started_at: Instant, finished_at: Instant) {
        self.metrics.started_at = Some(started_at);
        self.metrics.finished_at = Some(finished_at);
    }

    /// Copy of the current aggregate; later records do not show up in it.
    pub fn snapshot(&self) -> Metrics {
        self.metrics.clone()
    }

    pub fn into_metrics(self) -> Metrics {
        self.metrics
    }

    pub fn percentile(&self, p: f64) -> Duration {
        self.metrics.percentile(p)
    }

    pub fn average(&self) -> Duration {
        self.metrics.average()
    }
}
