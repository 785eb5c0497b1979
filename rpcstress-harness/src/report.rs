use rpcstress_common::ErrorKind;
use std::fmt;
use std::time::Duration;

use crate::metrics::Metrics;

/// Latency statistics over successful calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

/// Final statistics derived from a settled [`Metrics`]. Building one never mutates the metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub elapsed: Duration,
    pub requests_total: u64,
    pub errors: u64,
    pub error_rate: f64,
    pub errors_by_kind: Vec<(ErrorKind, u64)>,
    pub requests_per_second: f64,
    pub requests_per_minute: f64,
    /// `None` when every call failed.
    pub latency: Option<LatencySummary>,
}

impl Report {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let latency = (!metrics.durations.is_empty()).then(|| LatencySummary {
            average: metrics.average(),
            min: metrics.min(),
            max: metrics.max(),
            p50: metrics.p50(),
            p90: metrics.p90(),
            p99: metrics.p99(),
        });
        let requests_per_second = metrics.throughput_rps();

        Self {
            elapsed: metrics.elapsed(),
            requests_total: metrics.requests_total,
            errors: metrics.errors,
            error_rate: metrics.error_rate(),
            errors_by_kind: metrics.errors_by_kind.iter().map(|(kind, count)| (*kind, *count)).collect(),
            requests_per_second,
            requests_per_minute: requests_per_second * 60.0,
            latency,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RPC Stress Test Results")?;
        writeln!(f, "=======================")?;
        writeln!(f, "Total run time:        {}", format_duration(round_to(self.elapsed, Duration::from_millis(1))))?;
        writeln!(f, "Requests:              {}", self.requests_total)?;
        writeln!(f, "Failed requests:       {} ({:.2}%)", self.errors, self.error_rate * 100.0)?;
        for (kind, count) in &self.errors_by_kind {
            writeln!(f, "  {:<20} {}", format!("{kind}:"), count)?;
        }
        writeln!(f)?;
        writeln!(f, "Throughput:")?;
        writeln!(f, "Requests per second:   {:.2}", self.requests_per_second)?;
        writeln!(f, "Requests per minute:   {:.2}", self.requests_per_minute)?;
        writeln!(f)?;

        let Some(latency) = &self.latency else {
            return writeln!(f, "No latency metrics (all requests failed)");
        };
        let micros = Duration::from_micros(1);
        writeln!(f, "Latency:")?;
        writeln!(f, "Average:               {}", format_duration(round_to(latency.average, micros)))?;
        writeln!(f, "Min:                   {}", format_duration(round_to(latency.min, micros)))?;
        writeln!(f, "Max:                   {}", format_duration(round_to(latency.max, micros)))?;
        writeln!(f, "P50 (median):          {}", format_duration(round_to(latency.p50, micros)))?;
        writeln!(f, "P90:                   {}", format_duration(round_to(latency.p90, micros)))?;
        writeln!(f, "P99:                   {}", format_duration(round_to(latency.p99, micros)))
    }
}

fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    humantime::format_duration(d).to_string()
}

/// Round `d` to the nearest multiple of `unit`.
fn round_to(d: Duration, unit: Duration) -> Duration {
    let unit_ns = unit.as_nanos().max(1);
    let rounded = (d.as_nanos() + unit_ns / 2) / unit_ns * unit_ns;
    Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}
