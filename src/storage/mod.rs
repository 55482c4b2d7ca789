//! File-backed persistence for snapshots and daily statistics
//!
//! ## Design
//!
//! - **Whole-document JSON**: each file holds one document that is rewritten in
//!   full on every change
//! - **Atomic replacement**: documents are written to a temporary file and
//!   renamed into place, so concurrent readers never see a partial write
//! - **Single writer**: only the collector loop writes; everyone else goes
//!   through the read-only accessors below
//!
//! ## Usage
//!
//! ```no_run
//! use chrono::FixedOffset;
//! use points_collector::storage::{read_daily_stats, read_snapshot_log};
//!
//! let kst = FixedOffset::east_opt(9 * 3600).unwrap();
//! let log = read_snapshot_log("./kaia_pool_data.json".as_ref())?;
//! let stats = read_daily_stats("./kaia_daily_stats.json".as_ref(), kst)?;
//! println!("{} snapshots, {} days", log.data_points.len(), stats.daily_stats.len());
//! # Ok::<(), points_collector::error::CollectorError>(())
//! ```

pub mod file;
pub mod schema;
pub mod snapshots;

use std::path::Path;

use chrono::FixedOffset;

pub use schema::{DailyStatsDocument, SnapshotLog};
pub use snapshots::{SnapshotStore, StoreOrigin};

use crate::error::CollectorResult;

/// Load the snapshot log at `path` without touching the file
///
/// Legacy single-snapshot files are converted in memory only.
pub fn read_snapshot_log(path: &Path) -> CollectorResult<SnapshotLog> {
    let value = file::read_json_value(path)?;
    schema::decode_snapshot_log(value, path).map(schema::DecodedLog::into_log)
}

/// Load the daily statistics document at `path`
///
/// Day boundaries stored without an offset are read as local times in
/// `offset`, which should match the collector's `utc_offset_hours`.
pub fn read_daily_stats(path: &Path, offset: FixedOffset) -> CollectorResult<DailyStatsDocument> {
    let value = file::read_json_value(path)?;
    schema::decode_daily_stats(value, offset, path)
}
