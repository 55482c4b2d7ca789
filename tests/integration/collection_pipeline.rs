//! End-to-end tests: upstream → fetcher → store → daily statistics

use chrono::NaiveDate;
use points_collector::storage::{read_daily_stats, read_snapshot_log};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn mount_once(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_snapshots_produce_hourly_rates() {
    let mock_server = MockServer::start().await;
    mount_once(&mock_server, create_mock_pool_json(1700000000, 100.0, 50.0)).await;
    mount_once(&mock_server, create_mock_pool_json(1700007200, 300.0, 90.0)).await;

    let files = test_files();
    let (report, slept) = run_cycles(&mock_server, open_store(&files), 2).await;

    assert_eq!(report.appended, 2);
    assert_eq!(slept, vec![INTERVAL, INTERVAL]);

    let stats = read_daily_stats(&files.stats, kst()).unwrap();
    let day = &stats.daily_stats[&NaiveDate::from_ymd_opt(2023, 11, 15).unwrap()];
    assert_eq!(day.general_hourly_average, 100.0);
    assert_eq!(day.fgp_hourly_average, 20.0);
    assert_eq!(day.data_points, 2);
    assert_eq!(day.time_span_hours, 2.0);
}

#[tokio::test]
async fn test_unchanged_snapshot_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_once(&mock_server, create_mock_pool_json(1700000000, 100.0, 50.0)).await;
    mount_once(&mock_server, create_mock_pool_json(1700000000, 100.0, 50.0)).await;
    mount_once(&mock_server, create_mock_pool_json(1700003600, 200.0, 70.0)).await;

    let files = test_files();
    let (report, _) = run_cycles(&mock_server, open_store(&files), 3).await;

    assert_eq!(report.appended, 2);
    assert_eq!(report.unchanged, 1);

    let log = read_snapshot_log(&files.data).unwrap();
    let timestamps: Vec<i64> = log.data_points.iter().map(|s| s.observed_at).collect();
    assert_eq!(timestamps, vec![1700000000, 1700003600]);
}

#[tokio::test]
async fn test_passthrough_fields_are_stored_verbatim() {
    let mock_server = MockServer::start().await;
    mount_once(&mock_server, create_mock_pool_json(1700000000, 100.0, 50.0)).await;

    let files = test_files();
    run_cycles(&mock_server, open_store(&files), 1).await;

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files.data).unwrap()).unwrap();
    let stored = &raw["data_points"][0];
    assert_eq!(stored, &create_mock_pool_json(1700000000, 100.0, 50.0)["data"]);
}

#[tokio::test]
async fn test_stats_file_written_before_any_data() {
    let files = test_files();

    let store = open_store(&files);

    assert!(store.is_empty());
    let stats = read_daily_stats(&files.stats, kst()).unwrap();
    assert!(stats.daily_stats.is_empty());
}
