//! Collector loop - polls the upstream and feeds the snapshot store
//!
//! ## Message Flow
//!
//! ```text
//! Sleep → Fetch snapshot → is new? → Append to log → Recompute daily stats
//!   ↑                                                        │
//!   └────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is strictly sequential: a cycle, including the statistics
//! recomputation, always finishes before the next sleep begins. Nothing that
//! happens inside a cycle stops the loop.
//!
//! - Fetch failures are retried after the normal interval.
//! - Any other error (storage, migration) is retried after the shorter error
//!   backoff. Writes that failed are retried on the next cycle even when the
//!   upstream has nothing new.
//! - Only the shutdown future passed to [`Collector::run`] ends the loop, and it
//!   is only observed while sleeping.

pub mod sleeper;
pub mod state;

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, instrument, trace};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::error::CollectorResult;
use crate::fetcher::{HttpFetcher, SnapshotSource};
use crate::storage::SnapshotStore;

pub use sleeper::{Sleeper, TokioSleeper};
pub use state::{CollectorReport, CollectorState, CycleOutcome};

pub struct Collector<S, Z> {
    source: S,
    store: SnapshotStore,
    sleeper: Z,

    /// Delay after a completed cycle (including failed fetches)
    interval: Duration,

    /// Delay after a cycle that hit any other error
    error_backoff: Duration,

    state: CollectorState,
    report: CollectorReport,
}

impl Collector<HttpFetcher, TokioSleeper> {
    /// Build the production collector: HTTP fetcher, file store, tokio timer
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let offset = config.utc_offset()?;
        let fetcher = HttpFetcher::new(&config.source_url, config.request_timeout())
            .context("failed to create fetcher")?;
        info!("polling {}", fetcher.url());
        let aggregator = Aggregator::new(&config.stats_file, offset);
        let store = SnapshotStore::open(&config.data_file, aggregator);

        Ok(Self::new(
            fetcher,
            store,
            TokioSleeper,
            config.interval(),
            config.error_backoff(),
        ))
    }
}

impl<S, Z> Collector<S, Z>
where
    S: SnapshotSource,
    Z: Sleeper,
{
    pub fn new(
        source: S,
        store: SnapshotStore,
        sleeper: Z,
        interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            source,
            store,
            sleeper,
            interval,
            error_backoff,
            state: CollectorState::Idle,
            report: CollectorReport::default(),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn report(&self) -> &CollectorReport {
        &self.report
    }

    fn transition(&mut self, next: CollectorState) {
        trace!("{} -> {}", self.state, next);
        self.state = next;
    }

    /// Fetch once and store the result if it is new
    ///
    /// Fetch failures are logged and reported as [`CycleOutcome::FetchFailed`].
    /// Errors from the store are returned.
    pub async fn run_cycle(&mut self) -> CollectorResult<CycleOutcome> {
        self.transition(CollectorState::Fetching);

        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_fetch_failure() => {
                error!("failed to fetch snapshot: {e}");
                return Ok(CycleOutcome::FetchFailed);
            }
            Err(e) => return Err(e),
        };

        self.transition(CollectorState::Deciding);
        let observed_at = snapshot.observed_at;

        if !self.store.is_new(&snapshot) {
            if self.store.has_pending_writes() {
                self.transition(CollectorState::Appending);
                self.store.flush_pending()?;
                info!(observed_at, "previously unsaved data written");
            } else {
                info!(observed_at, "no new data to save");
            }
            return Ok(CycleOutcome::Unchanged { observed_at });
        }

        self.transition(CollectorState::Appending);
        self.store.append(snapshot)?;
        info!(observed_at, "new data collected and saved");

        Ok(CycleOutcome::Appended { observed_at })
    }

    /// Run one cycle, record its outcome and return how long to sleep
    async fn step(&mut self) -> Duration {
        let delay = match self.run_cycle().await {
            Ok(outcome) => {
                debug!(?outcome, "cycle finished");
                self.report.record(outcome);
                self.interval
            }
            Err(e) => {
                error!("unexpected error in collector cycle: {e}");
                self.report.record_error();
                self.error_backoff
            }
        };

        self.transition(CollectorState::Sleeping);
        delay
    }

    /// Run a single cycle and return the resulting report
    pub async fn run_once(mut self) -> CollectorReport {
        self.step().await;
        self.transition(CollectorState::Idle);
        self.report
    }

    /// Poll forever until `shutdown` resolves
    #[instrument(skip_all)]
    pub async fn run<F>(mut self, shutdown: F) -> CollectorReport
    where
        F: Future<Output = ()>,
    {
        info!(
            "starting data collection into {} with {}s interval ({}s error backoff)",
            self.store.path().display(),
            self.interval.as_secs(),
            self.error_backoff.as_secs()
        );

        tokio::pin!(shutdown);

        loop {
            let delay = self.step().await;
            trace!("sleeping for {}s", delay.as_secs());

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }

                _ = self.sleeper.sleep(delay) => {}
            }

            self.transition(CollectorState::Idle);
        }

        info!("collector stopped after {}", self.report);
        self.report
    }
}
