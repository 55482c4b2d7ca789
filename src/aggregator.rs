//! Daily hourly-rate statistics
//!
//! Statistics are never updated incrementally. Every time a snapshot is added,
//! the full log is regrouped by calendar day and the stats document is
//! rewritten from scratch.
//!
//! For each day the rate of a pool is
//!
//! ```text
//! (points at last snapshot - points at first snapshot) / hours between them
//! ```
//!
//! Snapshots in between only count towards `data_points`. Days with a single
//! snapshot, or whose snapshots all share one timestamp, produce no entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::CollectorResult;
use crate::storage::file;
use crate::storage::schema::{self, DailyStatsDocument};
use crate::{Pool, Snapshot};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Hourly accrual rates of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistic {
    pub general_hourly_average: f64,
    pub fgp_hourly_average: f64,
    pub time_span_hours: f64,
    pub data_points: usize,
    pub first_update: DateTime<FixedOffset>,
    pub last_update: DateTime<FixedOffset>,
}

/// Group snapshots by calendar day in `offset` and compute each day's rates
pub fn daily_statistics(
    snapshots: &[Snapshot],
    offset: FixedOffset,
) -> BTreeMap<NaiveDate, DailyStatistic> {
    let mut days: BTreeMap<NaiveDate, Vec<&Snapshot>> = BTreeMap::new();

    for snapshot in snapshots {
        let Some(observed) = DateTime::<Utc>::from_timestamp(snapshot.observed_at, 0) else {
            warn!(
                observed_at = snapshot.observed_at,
                "skipping snapshot with out-of-range timestamp"
            );
            continue;
        };
        let day = observed.with_timezone(&offset).date_naive();
        days.entry(day).or_default().push(snapshot);
    }

    days.into_iter()
        .filter_map(|(day, points)| day_statistic(&points, offset).map(|stat| (day, stat)))
        .collect()
}

fn day_statistic(points: &[&Snapshot], offset: FixedOffset) -> Option<DailyStatistic> {
    if points.len() < 2 {
        return None;
    }

    let first = points.iter().min_by_key(|s| s.observed_at)?;
    let last = points.iter().max_by_key(|s| s.observed_at)?;

    let span_hours = (last.observed_at - first.observed_at) as f64 / SECONDS_PER_HOUR;
    if span_hours <= 0.0 {
        return None;
    }

    let rate = |pool: Pool| (last.points(pool) - first.points(pool)) / span_hours;
    let local = |epoch: i64| {
        DateTime::<Utc>::from_timestamp(epoch, 0).map(|ts| ts.with_timezone(&offset))
    };

    Some(DailyStatistic {
        general_hourly_average: rate(Pool::General),
        fgp_hourly_average: rate(Pool::Fgp),
        time_span_hours: span_hours,
        data_points: points.len(),
        first_update: local(first.observed_at)?,
        last_update: local(last.observed_at)?,
    })
}

/// Owns the daily statistics file
#[derive(Debug, Clone)]
pub struct Aggregator {
    path: PathBuf,
    offset: FixedOffset,
}

impl Aggregator {
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stats document back, localizing offset-less day boundaries
    pub fn load(&self) -> CollectorResult<DailyStatsDocument> {
        let value = file::read_json_value(&self.path)?;
        schema::decode_daily_stats(value, self.offset, &self.path)
    }

    /// Make sure a readable stats document exists so readers always find one
    ///
    /// A document that decodes is left alone; anything else is replaced by an
    /// empty one.
    pub fn initialize(&self) {
        if self.path.exists() {
            match self.load() {
                Ok(_) => {
                    debug!("stats file {} present", self.path.display());
                    return;
                }
                Err(e) => warn!("existing stats file unreadable, replacing it: {e}"),
            }
        }

        let result = file::ensure_parent_dir(&self.path)
            .and_then(|_| file::write_json_atomic(&self.path, &DailyStatsDocument::empty()));

        match result {
            Ok(()) => info!("created new stats file {}", self.path.display()),
            Err(e) => error!("failed to initialize stats file: {e}"),
        }
    }

    /// Rebuild the statistics from `snapshots` and overwrite the stats file
    pub fn recompute(&self, snapshots: &[Snapshot]) -> CollectorResult<DailyStatsDocument> {
        let document = DailyStatsDocument {
            updated_at: Utc::now(),
            daily_stats: daily_statistics(snapshots, self.offset),
        };

        file::write_json_atomic(&self.path, &document)?;

        info!(
            days = document.daily_stats.len(),
            snapshots = snapshots.len(),
            "daily statistics updated"
        );

        Ok(document)
    }
}
