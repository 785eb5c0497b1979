use rpcstress_common::ErrorKind;
use rpcstress_harness::metrics::Metrics;
use rpcstress_harness::report::Report;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn metrics(durations: Vec<Duration>, errors_by_kind: &[(ErrorKind, u64)], elapsed: Duration) -> Metrics {
    let errors: u64 = errors_by_kind.iter().map(|(_, n)| n).sum();
    let start = Instant::now();
    Metrics {
        requests_total: errors + durations.len() as u64,
        errors,
        errors_by_kind: errors_by_kind.iter().copied().collect::<BTreeMap<_, _>>(),
        durations,
        started_at: Some(start),
        finished_at: Some(start + elapsed),
    }
}

#[test]
fn test_report_derives_statistics() {
    let m = metrics(
        (1..=10).map(ms).collect(),
        &[(ErrorKind::Timeout, 2), (ErrorKind::Network, 1)],
        Duration::from_secs(2),
    );
    let before = m.clone();

    let report = Report::from_metrics(&m);

    assert_eq!(m, before, "building a report must not touch the metrics");
    assert_eq!(report.requests_total, 13);
    assert_eq!(report.errors, 3);
    assert!((report.error_rate - 3.0 / 13.0).abs() < 1e-9);
    assert_eq!(report.requests_per_second, 6.5);
    assert_eq!(report.requests_per_minute, 390.0);
    assert_eq!(report.errors_by_kind, vec![(ErrorKind::Timeout, 2), (ErrorKind::Network, 1)]);

    let latency = report.latency.unwrap();
    assert_eq!(latency.min, ms(1));
    assert_eq!(latency.max, ms(10));
    assert_eq!(latency.p50, ms(6));
    assert_eq!(latency.p99, ms(10));
    assert_eq!(latency.average, Duration::from_micros(5500));
}

#[test]
fn test_report_without_successes_has_no_latency() {
    let report = Report::from_metrics(&metrics(vec![], &[(ErrorKind::Connection, 4)], ms(100)));

    assert!(report.latency.is_none());
    assert_eq!(report.error_rate, 1.0);
    assert!(report.to_string().contains("No latency metrics (all requests failed)"));
}

#[test]
fn test_report_rendering() {
    let report = Report::from_metrics(&metrics(
        vec![ms(2), ms(4)],
        &[(ErrorKind::Application, 2)],
        Duration::from_secs(1),
    ));
    let text = report.to_string();

    assert!(text.contains("Requests:              4"), "{text}");
    assert!(text.contains("Failed requests:       2 (50.00%)"), "{text}");
    assert!(text.contains("application:"), "{text}");
    assert!(text.contains("Requests per second:   4.00"), "{text}");
    assert!(text.contains("Requests per minute:   240.00"), "{text}");
    assert!(text.contains("Average:               3ms"), "{text}");
    assert!(text.contains("Total run time:        1s"), "{text}");
}
