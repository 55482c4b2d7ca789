pub mod aggregator;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod storage;

use serde::{Deserialize, Serialize};

/// One observation of both point pools as reported by the upstream endpoint.
///
/// Field names follow the upstream JSON so snapshots are stored exactly as they
/// were received. Any field the collector does not interpret (total points, TVL,
/// ...) is kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Epoch seconds at which the upstream last refreshed its counters
    #[serde(rename = "updatedAt")]
    pub observed_at: i64,

    #[serde(rename = "generalPoint")]
    pub general_points: f64,

    #[serde(rename = "generalPointPerHour")]
    pub general_points_per_hour: f64,

    #[serde(rename = "fgpPoint")]
    pub fgp_points: f64,

    #[serde(rename = "fgpPointPerHour")]
    pub fgp_points_per_hour: f64,

    /// Pass-through fields stored but not interpreted
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Snapshot {
    pub fn new(observed_at: i64, general_points: f64, fgp_points: f64) -> Self {
        Self {
            observed_at,
            general_points,
            general_points_per_hour: 0.0,
            fgp_points,
            fgp_points_per_hour: 0.0,
            extra: serde_json::Map::new(),
        }
    }

    pub fn points(&self, pool: Pool) -> f64 {
        match pool {
            Pool::General => self.general_points,
            Pool::Fgp => self.fgp_points,
        }
    }
}

/// The two independently accruing point competitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    General,
    Fgp,
}
