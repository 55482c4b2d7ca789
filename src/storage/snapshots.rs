//! Append-only, deduplicated snapshot log
//!
//! The store keeps the whole log in memory and rewrites the backing file after
//! every append. It is the only writer of that file; readers open it on their
//! own through [`read_snapshot_log`](super::read_snapshot_log).
//!
//! Deduplication only compares against the most recent entry: a candidate is
//! new when its `updatedAt` differs from the last stored one.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::file;
use super::schema::{DecodedLog, SnapshotLog, decode_snapshot_log};
use crate::Snapshot;
use crate::aggregator::Aggregator;
use crate::error::CollectorResult;

/// How the store came up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    /// No backing file existed, a new empty log was written
    Created,

    /// An existing log was loaded
    Loaded,

    /// A legacy single-snapshot file was converted and rewritten
    Migrated,

    /// The backing file could not be loaded and was replaced by an empty log
    Recreated,
}

pub struct SnapshotStore {
    path: PathBuf,
    log: SnapshotLog,
    aggregator: Aggregator,
    origin: StoreOrigin,
    pending: bool,
}

impl SnapshotStore {
    /// Open the store at `path`, creating, migrating or recreating the backing
    /// file as needed. This never fails: load errors are logged and the store
    /// starts over from an empty log.
    ///
    /// The stats file is rebuilt from a non-empty log so it always reflects
    /// what is stored, whatever state an earlier run left it in.
    pub fn open(path: impl Into<PathBuf>, aggregator: Aggregator) -> Self {
        let path = path.into();
        aggregator.initialize();

        let (log, origin, persisted) = Self::initialize(&path);
        info!(
            "snapshot store ready at {} ({origin:?}, {} snapshots)",
            path.display(),
            log.data_points.len()
        );

        let mut store = Self {
            path,
            log,
            aggregator,
            origin,
            pending: !persisted,
        };

        if !store.pending && !store.is_empty() {
            if let Err(e) = store.aggregator.recompute(store.snapshots()) {
                error!("failed to rebuild daily statistics: {e}");
                store.pending = true;
            }
        }

        store
    }

    fn initialize(path: &Path) -> (SnapshotLog, StoreOrigin, bool) {
        if let Err(e) = file::ensure_parent_dir(path) {
            error!("failed to create data directory: {e}");
        }

        if !path.exists() {
            let (log, persisted) = Self::create_empty(path);
            return (log, StoreOrigin::Created, persisted);
        }

        let loaded = file::read_json_value(path).and_then(|value| decode_snapshot_log(value, path));

        match loaded {
            Ok(DecodedLog::Current(log)) => (log, StoreOrigin::Loaded, true),
            Ok(DecodedLog::Migrated(log)) => {
                info!("migrated legacy single-snapshot file {}", path.display());
                let persisted = match file::write_json_atomic(path, &log) {
                    Ok(()) => true,
                    Err(e) => {
                        error!("failed to persist migrated log: {e}");
                        false
                    }
                };
                (log, StoreOrigin::Migrated, persisted)
            }
            Err(e) => {
                warn!("failed to load existing snapshot log, starting over: {e}");
                let (log, persisted) = Self::create_empty(path);
                (log, StoreOrigin::Recreated, persisted)
            }
        }
    }

    fn create_empty(path: &Path) -> (SnapshotLog, bool) {
        let log = SnapshotLog::empty();
        match file::write_json_atomic(path, &log) {
            Ok(()) => {
                info!("created new data file {}", path.display());
                (log, true)
            }
            Err(e) => {
                error!("failed to create data file: {e}");
                (log, false)
            }
        }
    }

    pub fn origin(&self) -> StoreOrigin {
        self.origin
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self) -> &SnapshotLog {
        &self.log
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.log.data_points
    }

    pub fn len(&self) -> usize {
        self.log.data_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.data_points.is_empty()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.log.data_points.last()
    }

    /// Whether `candidate` differs from the most recently stored snapshot
    pub fn is_new(&self, candidate: &Snapshot) -> bool {
        self.last()
            .is_none_or(|last| last.observed_at != candidate.observed_at)
    }

    /// Whether the files on disk lag behind the in-memory log
    pub fn has_pending_writes(&self) -> bool {
        self.pending
    }

    /// Append `snapshot`, rewrite the log file and recompute the statistics
    ///
    /// The snapshot stays in the in-memory log even when persisting fails;
    /// the write is retried by [`flush_pending`](Self::flush_pending).
    /// Statistics are only recomputed once the log itself has been written.
    pub fn append(&mut self, snapshot: Snapshot) -> CollectorResult<()> {
        debug!(observed_at = snapshot.observed_at, "appending snapshot");
        self.log.data_points.push(snapshot);
        self.pending = true;

        self.flush()?;
        info!("data point saved ({} total)", self.len());
        Ok(())
    }

    /// Retry writes that failed earlier. Returns whether anything was written.
    pub fn flush_pending(&mut self) -> CollectorResult<bool> {
        if !self.pending {
            return Ok(false);
        }

        self.flush()?;
        info!("pending writes flushed ({} snapshots)", self.len());
        Ok(true)
    }

    fn flush(&mut self) -> CollectorResult<()> {
        file::write_json_atomic(&self.path, &self.log)?;
        self.aggregator.recompute(self.snapshots())?;
        self.pending = false;
        Ok(())
    }
}
