//! Helper functions for integration tests

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;
use points_collector::aggregator::Aggregator;
use points_collector::collector::{Collector, CollectorReport, Sleeper};
use points_collector::fetcher::HttpFetcher;
use points_collector::storage::SnapshotStore;
use tokio::sync::oneshot;
use wiremock::MockServer;

pub const INTERVAL: Duration = Duration::from_secs(3600);
pub const BACKOFF: Duration = Duration::from_secs(60);
pub const API_PATH: &str = "/api/v1/mission/total";

pub struct TestFiles {
    pub dir: tempfile::TempDir,
    pub data: PathBuf,
    pub stats: PathBuf,
}

pub fn test_files() -> TestFiles {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("kaia_pool_data.json");
    let stats = dir.path().join("kaia_daily_stats.json");
    TestFiles { dir, data, stats }
}

pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

pub fn open_store(files: &TestFiles) -> SnapshotStore {
    SnapshotStore::open(&files.data, Aggregator::new(&files.stats, kst()))
}

pub fn create_mock_pool_json(updated_at: i64, general: f64, fgp: f64) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "generalPoint": general,
            "generalPointPerHour": 12.5,
            "fgpPoint": fgp,
            "fgpPointPerHour": 3.25,
            "updatedAt": updated_at,
            "totalPoint": general + fgp,
            "defiTvl": 1234567.89
        }
    })
}

pub fn fetcher_for(server: &MockServer) -> HttpFetcher {
    HttpFetcher::new(format!("{}{}", server.uri(), API_PATH), Duration::from_secs(2)).unwrap()
}

/// Records requested sleeps and fires shutdown on the `stop_after`th one
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
    stop_after: usize,
    shutdown: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&mut self, duration: Duration) {
        let count = {
            let mut slept = self.slept.lock().unwrap();
            slept.push(duration);
            slept.len()
        };

        if count >= self.stop_after {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
            std::future::pending::<()>().await;
        }
    }
}

/// Run the collector loop for exactly `cycles` cycles against `server`
pub async fn run_cycles(
    server: &MockServer,
    store: SnapshotStore,
    cycles: usize,
) -> (CollectorReport, Vec<Duration>) {
    let slept = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = oneshot::channel();
    let sleeper = RecordingSleeper {
        slept: slept.clone(),
        stop_after: cycles,
        shutdown: Some(tx),
    };

    let collector = Collector::new(fetcher_for(server), store, sleeper, INTERVAL, BACKOFF);
    let report = collector
        .run(async {
            let _ = rx.await;
        })
        .await;

    let slept = slept.lock().unwrap().clone();
    (report, slept)
}
