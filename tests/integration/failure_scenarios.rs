//! Failure tests for the collector loop
//!
//! These tests verify that the loop degrades to "no new data this cycle":
//! - Upstream errors and timeouts
//! - Malformed bodies
//! - Storage that disappears underneath the collector

use points_collector::storage::read_snapshot_log;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_three_failed_fetches_change_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let files = test_files();
    let store = open_store(&files);
    let stats_before = std::fs::read_to_string(&files.stats).unwrap();
    let data_before = std::fs::read_to_string(&files.data).unwrap();

    let (report, slept) = run_cycles(&mock_server, store, 3).await;

    assert_eq!(report.fetch_failures, 3);
    assert_eq!(report.appended, 0);
    assert_eq!(report.cycle_errors, 0);
    assert_eq!(slept, vec![INTERVAL; 3]);
    assert_eq!(std::fs::read_to_string(&files.stats).unwrap(), stats_before);
    assert_eq!(std::fs::read_to_string(&files.data).unwrap(), data_before);
}

#[tokio::test]
async fn test_malformed_body_is_a_fetch_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{invalid json"))
        .mount(&mock_server)
        .await;

    let files = test_files();
    let (report, slept) = run_cycles(&mock_server, open_store(&files), 1).await;

    assert_eq!(report.fetch_failures, 1);
    assert_eq!(slept, vec![INTERVAL]);
}

#[tokio::test]
async fn test_recovers_after_upstream_outage() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(create_mock_pool_json(1700000000, 1.0, 2.0)),
        )
        .mount(&mock_server)
        .await;

    let files = test_files();
    let (report, _) = run_cycles(&mock_server, open_store(&files), 3).await;

    assert_eq!(report.fetch_failures, 2);
    assert_eq!(report.appended, 1);
    assert_eq!(read_snapshot_log(&files.data).unwrap().data_points.len(), 1);
}

#[tokio::test]
async fn test_lost_data_directory_triggers_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(create_mock_pool_json(1700000000, 1.0, 2.0)),
        )
        .mount(&mock_server)
        .await;

    let files = test_files();
    let nested = files.dir.path().join("nested");
    let store = points_collector::storage::SnapshotStore::open(
        nested.join("data.json"),
        points_collector::aggregator::Aggregator::new(nested.join("stats.json"), kst()),
    );
    std::fs::remove_dir_all(&nested).unwrap();

    let (report, slept) = run_cycles(&mock_server, store, 2).await;

    // the first cycle fails to persist, the second retries that write and fails too
    assert_eq!(report.cycle_errors, 2);
    assert_eq!(report.unchanged, 0);
    assert_eq!(slept, vec![BACKOFF, BACKOFF]);
}
