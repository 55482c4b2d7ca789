//! Collector loop states and outcomes
//!
//! ```text
//! Idle → Fetching ─┬─ fetch failed ───────────────────────────┐
//!                  └→ Deciding ─┬─ unchanged ─────────────────┤
//!                               └→ Appending (store + stats) ─┴→ Sleeping → Idle
//! ```

use std::fmt;

/// Where the collector loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Fetching,
    Deciding,
    Appending,
    Sleeping,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectorState::Idle => "idle",
            CollectorState::Fetching => "fetching",
            CollectorState::Deciding => "deciding",
            CollectorState::Appending => "appending",
            CollectorState::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// Result of one completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new snapshot was stored and the statistics recomputed
    Appended { observed_at: i64 },

    /// The fetched snapshot matched the last stored one
    Unchanged { observed_at: i64 },

    /// The upstream could not be reached or answered garbage
    FetchFailed,
}

/// Running totals over the lifetime of a collector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorReport {
    pub cycles: u64,
    pub appended: u64,
    pub unchanged: u64,
    pub fetch_failures: u64,

    /// Cycles aborted by a storage or migration error
    pub cycle_errors: u64,
}

impl CollectorReport {
    pub(crate) fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Appended { .. } => self.appended += 1,
            CycleOutcome::Unchanged { .. } => self.unchanged += 1,
            CycleOutcome::FetchFailed => self.fetch_failures += 1,
        }
    }

    pub(crate) fn record_error(&mut self) {
        self.cycles += 1;
        self.cycle_errors += 1;
    }
}

impl fmt::Display for CollectorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles: {} appended, {} unchanged, {} fetch failures, {} errors",
            self.cycles, self.appended, self.unchanged, self.fetch_failures, self.cycle_errors
        )
    }
}
