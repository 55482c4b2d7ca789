//! On-disk document formats
//!
//! ## Snapshot log
//!
//! ```json
//! { "initialized_at": "2024-11-20T10:00:00Z", "data_points": [ { "updatedAt": ..., ... } ] }
//! ```
//!
//! Older deployments stored only the last observation as
//! `{ "initialized_at": ..., "data": { ... } }`. Such files are migrated into a
//! one-element log when loaded.
//!
//! ## Daily statistics
//!
//! ```json
//! { "updated_at": "...", "daily_stats": { "2024-11-20": { "general_hourly_average": ..., ... } } }
//! ```
//!
//! Older deployments wrote `first_update` / `last_update` as local times
//! without an offset. Those are read back in the configured offset.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Snapshot;
use crate::aggregator::DailyStatistic;
use crate::error::{CollectorError, CollectorResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLog {
    #[serde(deserialize_with = "lenient_timestamp")]
    pub initialized_at: DateTime<Utc>,

    pub data_points: Vec<Snapshot>,
}

impl SnapshotLog {
    pub fn empty() -> Self {
        Self {
            initialized_at: Utc::now(),
            data_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatsDocument {
    #[serde(alias = "initialized_at", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,

    pub daily_stats: BTreeMap<NaiveDate, DailyStatistic>,
}

impl DailyStatsDocument {
    pub fn empty() -> Self {
        Self {
            updated_at: Utc::now(),
            daily_stats: BTreeMap::new(),
        }
    }
}

/// A snapshot log as decoded from disk
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLog {
    /// Already in the current format
    Current(SnapshotLog),

    /// Converted from the legacy single-snapshot format
    Migrated(SnapshotLog),
}

impl DecodedLog {
    pub fn into_log(self) -> SnapshotLog {
        match self {
            DecodedLog::Current(log) | DecodedLog::Migrated(log) => log,
        }
    }
}

/// Interpret a stored JSON document as a snapshot log, migrating the legacy
/// single-snapshot layout if necessary.
pub fn decode_snapshot_log(value: Value, path: &Path) -> CollectorResult<DecodedLog> {
    let Value::Object(mut doc) = value else {
        return Err(CollectorError::schema(path, "expected a JSON object"));
    };

    if doc.contains_key("data_points") {
        let log = serde_json::from_value(Value::Object(doc))
            .map_err(|e| CollectorError::schema(path, e.to_string()))?;
        return Ok(DecodedLog::Current(log));
    }

    let Some(data) = doc.remove("data") else {
        return Err(CollectorError::schema(
            path,
            "neither `data_points` nor legacy `data` present",
        ));
    };

    let snapshot: Snapshot = serde_json::from_value(data)
        .map_err(|e| CollectorError::schema(path, format!("legacy snapshot: {e}")))?;

    let initialized_at = match doc.get("initialized_at").and_then(Value::as_str) {
        Some(raw) => parse_timestamp(raw)
            .map_err(|e| CollectorError::schema(path, format!("initialized_at: {e}")))?,
        None => Utc::now(),
    };

    Ok(DecodedLog::Migrated(SnapshotLog {
        initialized_at,
        data_points: vec![snapshot],
    }))
}

/// Interpret a stored stats document, localizing offset-less day boundaries
/// written by older deployments into `offset`.
pub fn decode_daily_stats(
    mut value: Value,
    offset: FixedOffset,
    path: &Path,
) -> CollectorResult<DailyStatsDocument> {
    if let Some(days) = value.get_mut("daily_stats").and_then(Value::as_object_mut) {
        for (date, day) in days.iter_mut() {
            for key in ["first_update", "last_update"] {
                if let Some(Value::String(raw)) = day.get_mut(key) {
                    let local = parse_local_timestamp(raw, offset).ok_or_else(|| {
                        CollectorError::schema(path, format!("{date}.{key}: unrecognized timestamp {raw:?}"))
                    })?;
                    *raw = local.to_rfc3339();
                }
            }
        }
    }

    serde_json::from_value(value).map_err(|e| CollectorError::schema(path, e.to_string()))
}

/// Parse an RFC 3339 timestamp, falling back to an offset-less ISO 8601 one
/// which is taken to be a local time in `offset`.
pub fn parse_local_timestamp(raw: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts),
        Err(_) => raw
            .parse::<NaiveDateTime>()
            .ok()
            .and_then(|naive| offset.from_local_datetime(&naive).single()),
    }
}

/// Parse an RFC 3339 timestamp, falling back to an offset-less ISO 8601 one
/// which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()),
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
