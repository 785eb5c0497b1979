use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::{Config, MAX_CONCURRENCY};
use crate::metrics::{Collector, Metrics, Outcome};
use crate::payload::Payload;
use crate::worker::{ClientConnector, Connector, Worker};

/// Split `total` requests across `workers` so that counts differ by at most one.
/// The first `total % workers` workers carry the extra request.
pub fn distribute(total: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }
    let n = workers as u64;
    let base = total / n;
    let remainder = total % n;
    (0..n).map(|i| base + u64::from(i < remainder)).collect()
}

/// Drives a full stress run: workers produce outcomes, one aggregation task consumes them.
pub struct StressRunner<C: Connector = ClientConnector> {
    config: Config,
    connector: Arc<C>,
    method: Arc<str>,
    payload: Arc<Payload>,
}

impl StressRunner<ClientConnector> {
    /// Runner that connects real RPC clients to `config.server_address`.
    pub fn new(config: Config, payload: Payload) -> Self {
        let connector = ClientConnector::new(config.client_config());
        Self::with_connector(config, payload, connector)
    }
}

impl<C: Connector> StressRunner<C> {
    pub fn with_connector(config: Config, payload: Payload, connector: C) -> Self {
        let method = Arc::from(config.method.as_str());
        Self { config, connector: Arc::new(connector), method, payload: Arc::new(payload) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run to completion and return the settled metrics.
    ///
    /// Failed calls only degrade their own outcome; a run is never aborted.
    pub async fn run(&self) -> Metrics {
        match self.config.duration {
            Some(duration) => self.run_for(duration).await,
            None => self.run_requests().await,
        }
    }

    /// Fixed-volume mode: one long-lived worker per slot of the work distribution.
    async fn run_requests(&self) -> Metrics {
        let distribution = distribute(self.config.total_requests, self.config.concurrency);
        info!(
            requests = self.config.total_requests,
            workers = distribution.len(),
            "starting run"
        );

        let (results, aggregator) = self.spawn_aggregator();

        let started_at = Instant::now();
        let mut workers = JoinSet::new();
        for (id, requests) in distribution.into_iter().enumerate() {
            workers.spawn(self.worker(id, requests).run(results.clone()));
        }

        self.finish(workers, results, aggregator, started_at).await
    }

    /// Timed mode: spawn a single-call worker every `1s / concurrency` until `duration` has elapsed.
    async fn run_for(&self, duration: Duration) -> Metrics {
        info!(?duration, rate = self.config.concurrency, "starting timed run");

        let (results, aggregator) = self.spawn_aggregator();

        let rate = u32::try_from(self.config.concurrency).unwrap_or(u32::MAX).max(1);
        let period = (Duration::from_secs(1) / rate).max(Duration::from_nanos(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let started_at = Instant::now();
        let mut workers = JoinSet::new();
        let mut id = 0;
        while started_at.elapsed() < duration {
            ticker.tick().await;
            workers.spawn(self.worker(id, 1).run(results.clone()));
            id += 1;
        }

        self.finish(workers, results, aggregator, started_at).await
    }

    fn worker(&self, id: usize, requests: u64) -> Worker<C> {
        Worker {
            id,
            requests,
            connector: Arc::clone(&self.connector),
            method: Arc::clone(&self.method),
            payload: Arc::clone(&self.payload),
        }
    }

    /// Start the single task allowed to write to the [`Collector`].
    fn spawn_aggregator(&self) -> (mpsc::Sender<Outcome>, JoinHandle<Collector>) {
        let capacity = self.config.concurrency.clamp(1, MAX_CONCURRENCY) * 2;
        let (tx, mut rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(async move {
            let mut collector = Collector::new();
            while let Some(outcome) = rx.recv().await {
                collector.record(outcome);
            }
            collector
        });
        (tx, handle)
    }

    /// Wait for every worker, close the channel, wait for the aggregator to drain.
    async fn finish(
        &self,
        mut workers: JoinSet<u64>,
        results: mpsc::Sender<Outcome>,
        aggregator: JoinHandle<Collector>,
        started_at: Instant,
    ) -> Metrics {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }
        drop(results);

        let mut collector = match aggregator.await {
            Ok(collector) => collector,
            Err(e) => {
                error!(error = %e, "aggregation task failed");
                Collector::new()
            }
        };
        let finished_at = Instant::now();
        collector.mark_window(started_at, finished_at);

        let metrics = collector.into_metrics();
        info!(
            requests = metrics.requests_total,
            errors = metrics.errors,
            elapsed = ?metrics.elapsed(),
            "run complete"
        );
        metrics
    }
}
