//! Scheduled Collector
//!
//! Polls current conditions for a fixed list of cities and appends one
//! reading per city to the log.
//!
//! ```text
//! Idle -> Collecting(city_0) -> ... -> Collecting(city_n) -> Idle -> Waiting(interval) -> Idle
//! ```
//!
//! A warm pass runs as soon as the collector starts, then one pass per
//! interval tick. Each pass is its own task, so a slow pass never holds back
//! the next tick; passes may overlap since log appends are serialised.

use std::sync::Arc;
use std::time::Duration;

use air_quality_client::UpstreamClient;
use chrono::Utc;
use reading_log::ReadingLog;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{CityTarget, CollectorConfig};
use crate::readings;
use crate::reporter::{ErrorKind, ErrorReporter};

/// Outcome of one collection pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub collected: usize,
    pub skipped: usize,
}

pub struct Collector {
    client: Arc<UpstreamClient>,
    log: Arc<ReadingLog>,
    reporter: Arc<dyn ErrorReporter>,
    targets: Vec<CityTarget>,
    interval: Duration,
    city_delay: Duration,
}

impl Collector {
    pub fn new(
        client: Arc<UpstreamClient>,
        log: Arc<ReadingLog>,
        reporter: Arc<dyn ErrorReporter>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            client,
            log,
            reporter,
            targets: config.targets,
            interval: config.interval,
            city_delay: config.city_delay,
        }
    }

    /// Collect every target once, in declaration order. Per-city failures are
    /// reported and skipped.
    pub async fn run_pass(&self) -> PassSummary {
        tracing::info!("Collection pass started ({} cities)", self.targets.len());
        let mut summary = PassSummary::default();

        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 && !self.city_delay.is_zero() {
                tokio::time::sleep(self.city_delay).await;
            }

            if self.collect_one(target).await {
                summary.collected += 1;
            } else {
                summary.skipped += 1;
            }
        }

        tracing::info!(
            "Collection pass finished: {} collected, {} skipped",
            summary.collected,
            summary.skipped
        );
        summary
    }

    async fn collect_one(&self, target: &CityTarget) -> bool {
        let current = match self
            .client
            .fetch_current(&target.city, &target.state, &target.country)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                self.reporter.report(
                    ErrorKind::from_upstream(&e),
                    &format!("collector: {}: {}", target, e),
                );
                return false;
            }
        };

        let reading = readings::from_current(target, &current, Utc::now());
        let (aqi, temperature) = (reading.aqi, reading.temperature);

        match readings::append(Arc::clone(&self.log), reading).await {
            Ok(()) => {
                tracing::info!(
                    city = %target.city,
                    aqi = ?aqi,
                    temperature = ?temperature,
                    "reading stored"
                );
                true
            }
            Err(e) => {
                self.reporter
                    .report(ErrorKind::Storage, &format!("collector: {}: {}", target, e));
                false
            }
        }
    }

    /// Start the schedule. Cancelling `shutdown` stops the timer and aborts
    /// in-flight passes; an append already on the blocking pool still
    /// completes, so no partial row is left behind.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(
            "Collector started: {} cities every {:?}",
            self.targets.len(),
            self.interval
        );

        let mut passes = JoinSet::new();
        self.start_pass(&mut passes);

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.start_pass(&mut passes),
                Some(done) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(e) = done {
                        if e.is_panic() {
                            self.reporter.report(ErrorKind::Internal, &format!("collector pass panicked: {}", e));
                        }
                    }
                }
            }
        }

        passes.shutdown().await;
        tracing::info!("Collector stopped");
    }

    fn start_pass(self: &Arc<Self>, passes: &mut JoinSet<PassSummary>) {
        if !passes.is_empty() {
            tracing::warn!("Previous collection pass still running; starting another alongside it");
        }
        let collector = Arc::clone(self);
        passes.spawn(async move { collector.run_pass().await });
    }
}
