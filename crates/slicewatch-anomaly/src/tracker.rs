use crate::counter::{BucketGeometry, SlicedCounter};
use crate::error::DropReason;
use crate::snapshot::{RingSnapshot, SliceSnapshot, TrackerSnapshot};
use crate::stats::{bump, TrackerStats};
use serde::Serialize;
use slicewatch_common::{AlertFired, DimensionKey, NS_PER_SEC};
use slicewatch_notify::AlertSink;
use std::collections::{BTreeSet, HashMap};

/// Validated alert parameters attached to a count metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSpec {
    pub id: u64,
    pub metric_id: u64,
    /// Window length in buckets, including the bucket being filled.
    pub num_buckets: u32,
    /// The alert fires when the sliding sum is strictly greater than this.
    pub threshold: i64,
    pub refractory_period_sec: u32,
}

/// Outcome of the detection step for one slice update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    BelowThreshold { sliding_sum: i64 },
    Suppressed { sliding_sum: i64, refractory_end_sec: u32 },
    Fired(AlertFired),
}

impl Detection {
    pub fn fired(&self) -> Option<&AlertFired> {
        match self {
            Detection::Fired(alert) => Some(alert),
            _ => None,
        }
    }
}

/// Second at which a slice that fired during `now_sec` may fire again.
///
/// The deadline is `now_sec + refractory_period_sec + 1`: an event in the
/// same second as the fire never re-fires, and the period includes the
/// second it starts in. Reported values saturate at `u32::MAX`.
pub fn refractory_deadline(now_sec: u64, refractory_period_sec: u32) -> u32 {
    saturate_sec(deadline_sec(now_sec, refractory_period_sec))
}

fn deadline_sec(now_sec: u64, refractory_period_sec: u32) -> u64 {
    now_sec
        .saturating_add(u64::from(refractory_period_sec))
        .saturating_add(1)
}

fn saturate_sec(sec: u64) -> u32 {
    u32::try_from(sec).unwrap_or(u32::MAX)
}

/// Sliding-sum threshold detector for one metric/alert pair.
///
/// Owns the bucketed counts of every live slice and the per-slice
/// refractory deadlines. Deadlines are kept as full seconds and only
/// saturated when reported. Not thread-safe; callers serialize events.
#[derive(Debug, Clone)]
pub struct AnomalyTracker {
    spec: AlertSpec,
    counter: SlicedCounter,
    refractory_ends: HashMap<DimensionKey, u64>,
    stats: TrackerStats,
}

impl AnomalyTracker {
    pub fn new(spec: AlertSpec, geometry: BucketGeometry) -> Self {
        let counter = SlicedCounter::new(geometry, spec.num_buckets as usize);
        Self {
            spec,
            counter,
            refractory_ends: HashMap::new(),
            stats: TrackerStats::default(),
        }
    }

    pub fn spec(&self) -> &AlertSpec {
        &self.spec
    }

    pub fn counter(&self) -> &SlicedCounter {
        &self.counter
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Counts `delta` for `key`, then runs the detection step against the
    /// slice's sliding sum. When the event advanced the bucket head, stale
    /// slices are evicted afterwards.
    pub fn observe(
        &mut self,
        key: &DimensionKey,
        delta: i64,
        event_time_ns: u64,
        sink: &dyn AlertSink,
    ) -> Result<Detection, DropReason> {
        let observation = self.counter.observe(key, delta, event_time_ns)?;
        if observation.late {
            bump(&mut self.stats.late_events);
            tracing::debug!(
                alert_id = self.spec.id,
                slice = %key,
                event_time_ns,
                bucket = observation.bucket_index,
                "Late event counted into slice head bucket"
            );
        }

        let detection = self.detect(key, observation.sliding_sum, event_time_ns, sink);

        if observation.advanced {
            self.evict_stale();
        }
        Ok(detection)
    }

    fn detect(
        &mut self,
        key: &DimensionKey,
        sliding_sum: i64,
        event_time_ns: u64,
        sink: &dyn AlertSink,
    ) -> Detection {
        if sliding_sum <= self.spec.threshold {
            return Detection::BelowThreshold { sliding_sum };
        }

        let now_sec = event_time_ns / NS_PER_SEC;
        let end_sec = self.refractory_ends.get(key).copied().unwrap_or(0);
        if now_sec < end_sec {
            let refractory_end_sec = saturate_sec(end_sec);
            bump(&mut self.stats.alerts_suppressed);
            tracing::debug!(
                alert_id = self.spec.id,
                slice = %key,
                sliding_sum,
                refractory_end_sec,
                "Alert suppressed (refractory period)"
            );
            return Detection::Suppressed {
                sliding_sum,
                refractory_end_sec,
            };
        }

        let next_end_sec = deadline_sec(now_sec, self.spec.refractory_period_sec);
        let deadline = saturate_sec(next_end_sec);
        let alert = AlertFired {
            alert_id: self.spec.id,
            metric_id: self.spec.metric_id,
            slice_key: key.clone(),
            event_time_ns,
            sliding_sum,
            threshold: self.spec.threshold,
            refractory_end_sec: deadline,
        };

        if let Err(e) = sink.on_alert(&alert) {
            bump(&mut self.stats.sink_errors);
            tracing::warn!(
                alert_id = self.spec.id,
                sink = sink.sink_name(),
                error = %e,
                "Alert sink failed; refractory period armed anyway"
            );
        }

        self.refractory_ends.insert(key.clone(), next_end_sec);
        bump(&mut self.stats.alerts_fired);
        tracing::info!(
            alert_id = self.spec.id,
            metric_id = self.spec.metric_id,
            slice = %key,
            sliding_sum,
            threshold = self.spec.threshold,
            refractory_end_sec = deadline,
            "Anomaly alert fired"
        );

        Detection::Fired(alert)
    }

    /// Drops slices whose buckets are out of reach even for late events.
    /// A dropped slice's refractory deadline goes with it once no event at
    /// or after the late horizon could still be suppressed by it; other
    /// deadlines are kept so the slice cannot re-fire early when it comes
    /// back.
    fn evict_stale(&mut self) {
        let evicted = self.counter.evict_stale();
        let Some(horizon) = self.counter.late_horizon_bucket() else {
            return;
        };
        let horizon_sec = self.counter.geometry().bucket_start_ns(horizon) / NS_PER_SEC;
        let counter = &self.counter;
        self.refractory_ends
            .retain(|key, end| counter.contains(key) || *end > horizon_sec);

        if !evicted.is_empty() {
            self.stats.slices_evicted = self
                .stats
                .slices_evicted
                .saturating_add(evicted.len() as u64);
            tracing::debug!(
                alert_id = self.spec.id,
                evicted = evicted.len(),
                live = self.counter.len(),
                "Evicted stale slices"
            );
        }
    }

    /// Refractory deadline recorded for `key`, or 0 if none.
    pub fn refractory_end_sec(&self, key: &DimensionKey) -> u32 {
        self.refractory_ends.get(key).copied().map_or(0, saturate_sec)
    }

    pub fn sliding_sum(&self, key: &DimensionKey) -> i64 {
        self.counter.sliding_sum(key)
    }

    /// Clears all counts and refractory state; statistics are kept.
    pub fn reset(&mut self) {
        self.counter.clear();
        self.refractory_ends.clear();
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let keys: BTreeSet<&DimensionKey> = self
            .counter
            .slices()
            .map(|(key, _)| key)
            .chain(self.refractory_ends.keys())
            .collect();

        let slices = keys
            .into_iter()
            .map(|key| SliceSnapshot {
                key: key.clone(),
                ring: self.counter.ring(key).map(|ring| RingSnapshot {
                    head_bucket_index: ring.head_bucket_index(),
                    counts: ring.counts_oldest_first(),
                    sliding_sum: self.counter.sliding_sum(key),
                }),
                refractory_end_sec: self.refractory_end_sec(key),
            })
            .collect();

        TrackerSnapshot {
            alert_id: self.spec.id,
            metric_id: self.spec.metric_id,
            num_buckets: self.spec.num_buckets,
            threshold: self.spec.threshold,
            current_bucket: self.counter.current_bucket(),
            slices,
            stats: self.stats,
        }
    }
}
