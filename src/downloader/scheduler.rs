//! Bounded-concurrency unit scheduling
//!
//! Fans the planned units out over a bounded stream: at most N units are in
//! flight, and as one finishes the next queued unit starts. Units are
//! isolated from each other; one unit's failure is recorded and its siblings
//! keep running. The final accounting is deterministic for a given plan and
//! source behavior even though completion order is not.

use crate::aggregate::{aggregate_trades, GapPolicy};
use crate::fetcher::{PageFetcher, PageSource, UnitRecords};
use crate::planner::FetchUnit;
use crate::shutdown::Shutdown;
use crate::store::{PartitionRecords, PartitionStore};
use crate::{CandleInterval, DataKind};
use futures_util::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Deterministic accounting for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Units fetched and persisted this run
    pub completed: usize,
    /// Units whose output already existed
    pub skipped: usize,
    /// Identities of units that exhausted retries or hit fatal errors,
    /// sorted for stable reporting
    pub failed: Vec<String>,
    /// Whether the run was cut short by a shutdown request
    pub cancelled: bool,
}

impl RunSummary {
    /// Whether every dispatched unit ended in success or skip.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

enum UnitOutcome {
    Completed,
    Skipped,
    Failed(String),
    Cancelled,
}

/// Dispatches fetch units with bounded concurrency.
pub struct Scheduler<S: PageSource> {
    fetcher: PageFetcher<S>,
    store: Arc<dyn PartitionStore>,
    overwrite: bool,
    candle_interval: CandleInterval,
    gap_policy: GapPolicy,
    shutdown: Option<Arc<Shutdown>>,
    progress: Option<ProgressBar>,
    finished_units: AtomicUsize,
}

impl<S: PageSource> Scheduler<S> {
    /// Create a scheduler over a fetcher and a store.
    pub fn new(fetcher: PageFetcher<S>, store: Arc<dyn PartitionStore>) -> Self {
        Self {
            fetcher,
            store,
            overwrite: false,
            candle_interval: CandleInterval::OneMinute,
            gap_policy: GapPolicy::default(),
            shutdown: None,
            progress: None,
            finished_units: AtomicUsize::new(0),
        }
    }

    /// Re-fetch partitions that already exist on disk.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Candle settings used for kline units.
    pub fn with_candles(mut self, interval: CandleInterval, gap_policy: GapPolicy) -> Self {
        self.candle_interval = interval;
        self.gap_policy = gap_policy;
        self
    }

    /// Observe a shutdown handle: dispatching stops once it triggers.
    pub fn with_shutdown(mut self, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Drive a progress bar from unit completions.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Units that reached a terminal state so far. Monotonically increasing
    /// while a run executes.
    pub fn finished_units(&self) -> usize {
        self.finished_units.load(Ordering::SeqCst)
    }

    /// Run every unit to completion and return the accounting.
    pub async fn run(&self, units: Vec<FetchUnit>, concurrency: usize) -> RunSummary {
        let total = units.len();
        if let Some(bar) = &self.progress {
            bar.set_length(total as u64);
        }
        info!(units = total, concurrency, "dispatching fetch units");

        let outcomes = stream::iter(units)
            .map(|unit| self.run_unit(unit))
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Completed => summary.completed += 1,
                UnitOutcome::Skipped => summary.skipped += 1,
                UnitOutcome::Failed(id) => summary.failed.push(id),
                UnitOutcome::Cancelled => summary.cancelled = true,
            }
        }
        summary.failed.sort();

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }
        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            cancelled = summary.cancelled,
            "run finished"
        );
        summary
    }

    async fn run_unit(&self, unit: FetchUnit) -> UnitOutcome {
        if let Some(shutdown) = &self.shutdown {
            if shutdown.is_triggered() {
                debug!(unit = %unit, "shutdown requested, not dispatching");
                return UnitOutcome::Cancelled;
            }
        }

        if !self.overwrite && self.store.exists(&unit) {
            debug!(unit = %unit, "partition exists, skipping");
            return self.finish(UnitOutcome::Skipped);
        }

        let outcome = match self.fetcher.fetch_unit(&unit).await {
            Ok(records) => {
                let partition = self.to_partition(&unit, records);
                match self.store.write(&unit, &partition) {
                    Ok(_) => UnitOutcome::Completed,
                    Err(e) => {
                        error!(unit = %unit, error = %e, "failed to persist partition");
                        UnitOutcome::Failed(unit.id())
                    }
                }
            }
            Err(e) => {
                error!(unit = %unit, error = %e, "unit fetch failed");
                UnitOutcome::Failed(unit.id())
            }
        };

        self.finish(outcome)
    }

    fn finish(&self, outcome: UnitOutcome) -> UnitOutcome {
        self.finished_units.fetch_add(1, Ordering::SeqCst);
        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
        outcome
    }

    fn to_partition(&self, unit: &FetchUnit, records: UnitRecords) -> PartitionRecords {
        match (unit.kind, records) {
            (DataKind::Klines, UnitRecords::Trades(trades)) => {
                PartitionRecords::Candles(aggregate_trades(
                    &trades,
                    &unit.window(),
                    self.candle_interval,
                    self.gap_policy,
                ))
            }
            (_, UnitRecords::Trades(trades)) => PartitionRecords::Trades(trades),
            (_, UnitRecords::Funding(rates)) => PartitionRecords::Funding(rates),
        }
    }
}
