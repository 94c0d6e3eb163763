use crate::error::DropReason;
use crate::window::BucketRing;
use serde::Serialize;
use slicewatch_common::DimensionKey;
use std::collections::HashMap;

/// Fixed-width time buckets anchored at a start time.
///
/// Bucket `k` covers `[start + k * size, start + (k + 1) * size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketGeometry {
    start_time_ns: u64,
    bucket_size_ns: u64,
}

impl BucketGeometry {
    /// A zero bucket size is treated as one nanosecond; configuration
    /// validation rejects it before it gets here.
    pub fn new(start_time_ns: u64, bucket_size_ns: u64) -> Self {
        Self {
            start_time_ns,
            bucket_size_ns: bucket_size_ns.max(1),
        }
    }

    pub fn start_time_ns(&self) -> u64 {
        self.start_time_ns
    }

    pub fn bucket_size_ns(&self) -> u64 {
        self.bucket_size_ns
    }

    /// Index of the bucket containing `time_ns`, or `None` before the start.
    pub fn bucket_index(&self, time_ns: u64) -> Option<u64> {
        time_ns
            .checked_sub(self.start_time_ns)
            .map(|elapsed| elapsed / self.bucket_size_ns)
    }

    pub fn bucket_start_ns(&self, bucket_index: u64) -> u64 {
        self.start_time_ns
            .saturating_add(bucket_index.saturating_mul(self.bucket_size_ns))
    }
}

/// Result of counting one event into a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Bucket the event was counted into: the slice's head after the event.
    pub bucket_index: u64,
    /// Slice sliding sum after the increment.
    pub sliding_sum: i64,
    /// The event belonged to a bucket older than its slice's head.
    pub late: bool,
    /// The event moved the counter's newest bucket forward.
    pub advanced: bool,
}

/// Bucketed counts for every live slice of one metric/alert pair.
///
/// Each slice's ring keeps its own head. The newest bucket seen across
/// all slices only drives eviction.
#[derive(Debug, Clone)]
pub struct SlicedCounter {
    geometry: BucketGeometry,
    num_buckets: usize,
    rings: HashMap<DimensionKey, BucketRing>,
    current_bucket: Option<u64>,
}

impl SlicedCounter {
    pub fn new(geometry: BucketGeometry, num_buckets: usize) -> Self {
        Self {
            geometry,
            num_buckets: num_buckets.max(1),
            rings: HashMap::new(),
            current_bucket: None,
        }
    }

    pub fn geometry(&self) -> BucketGeometry {
        self.geometry
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Newest bucket observed by this counter, if any event was counted.
    pub fn current_bucket(&self) -> Option<u64> {
        self.current_bucket
    }

    /// Oldest bucket a late event may fall into without losing its slice
    /// to eviction: `N` buckets behind the newest bucket.
    pub fn late_horizon_bucket(&self) -> Option<u64> {
        self.current_bucket
            .map(|current| current.saturating_sub(self.num_buckets as u64))
    }

    /// Counts `delta` for `key` at `event_time_ns`.
    ///
    /// The slice's ring advances to the event's bucket. Events older than
    /// the ring's head are counted into the head bucket. A slice seen for
    /// the first time gets a fresh ring whose head is the event's bucket.
    pub fn observe(
        &mut self,
        key: &DimensionKey,
        delta: i64,
        event_time_ns: u64,
    ) -> Result<Observation, DropReason> {
        let target = self
            .geometry
            .bucket_index(event_time_ns)
            .ok_or(DropReason::BeforeStartTime)?;

        let advanced = self.current_bucket.is_some_and(|current| target > current);
        if advanced || self.current_bucket.is_none() {
            self.current_bucket = Some(target);
        }

        let num_buckets = self.num_buckets;
        let ring = self
            .rings
            .entry(key.clone())
            .or_insert_with(|| BucketRing::new(num_buckets, target));
        let late = target < ring.head_bucket_index();
        ring.advance_to(target);
        ring.increment_current(delta);

        Ok(Observation {
            bucket_index: ring.head_bucket_index(),
            sliding_sum: ring.sliding_sum(),
            late,
            advanced,
        })
    }

    /// Removes every slice whose window ends before the late horizon, and
    /// returns their keys. Any event such a slice can still receive would
    /// clear its whole ring anyway.
    pub fn evict_stale(&mut self) -> Vec<DimensionKey> {
        let Some(horizon) = self.late_horizon_bucket() else {
            return Vec::new();
        };
        let stale: Vec<DimensionKey> = self
            .rings
            .iter()
            .filter(|(_, ring)| ring.is_stale(horizon))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.rings.remove(key);
        }
        stale
    }

    pub fn ring(&self, key: &DimensionKey) -> Option<&BucketRing> {
        self.rings.get(key)
    }

    pub fn contains(&self, key: &DimensionKey) -> bool {
        self.rings.contains_key(key)
    }

    /// Sliding sum of `key` as of the counter's newest bucket; zero for
    /// unknown slices.
    pub fn sliding_sum(&self, key: &DimensionKey) -> i64 {
        match (self.rings.get(key), self.current_bucket) {
            (Some(ring), Some(current)) => ring.sliding_sum_at(current),
            _ => 0,
        }
    }

    pub fn slices(&self) -> impl Iterator<Item = (&DimensionKey, &BucketRing)> {
        self.rings.iter()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn clear(&mut self) {
        self.rings.clear();
        self.current_bucket = None;
    }
}
