//! Point-in-time views of detector state for debugging and dumps.

use crate::stats::{DetectorStats, TrackerStats};
use serde::Serialize;
use slicewatch_common::DimensionKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RingSnapshot {
    pub head_bucket_index: u64,
    /// Window counts, oldest bucket first.
    pub counts: Vec<i64>,
    /// Sliding sum as of the tracker's current bucket.
    pub sliding_sum: i64,
}

/// One slice of a tracker. `ring` is `None` for a slice that was evicted
/// but still has a refractory deadline in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceSnapshot {
    pub key: DimensionKey,
    pub ring: Option<RingSnapshot>,
    pub refractory_end_sec: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub alert_id: u64,
    pub metric_id: u64,
    pub num_buckets: u32,
    pub threshold: i64,
    pub current_bucket: Option<u64>,
    /// Sorted by slice key.
    pub slices: Vec<SliceSnapshot>,
    pub stats: TrackerStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub metric_id: u64,
    pub what: u64,
    pub trackers: Vec<TrackerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectorSnapshot {
    pub start_time_ns: u64,
    pub metrics: Vec<MetricSnapshot>,
    pub stats: DetectorStats,
}

impl DetectorSnapshot {
    pub fn tracker(&self, alert_id: u64) -> Option<&TrackerSnapshot> {
        self.metrics
            .iter()
            .flat_map(|m| m.trackers.iter())
            .find(|t| t.alert_id == alert_id)
    }

    /// Pretty-printed JSON dump.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
