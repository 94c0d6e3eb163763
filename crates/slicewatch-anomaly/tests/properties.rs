//! Property tests for the sliding-window detector.
//!
//! Streams of events over a handful of slices are fed straight into an
//! [`AnomalyTracker`] and checked against a simple model of the window and
//! of the refractory rule.

use proptest::prelude::*;
use slicewatch_anomaly::counter::BucketGeometry;
use slicewatch_anomaly::tracker::refractory_deadline;
use slicewatch_anomaly::{AlertSpec, AnomalyTracker, Detection};
use slicewatch_common::{DimensionKey, FieldPath, Value, NS_PER_SEC};
use slicewatch_notify::MemorySink;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const UID: FieldPath = FieldPath(0x0201_0101);

fn key(uid: i32) -> DimensionKey {
    DimensionKey::new([(UID, Value::Int(uid))])
}

fn tracker(
    num_buckets: u32,
    threshold: i64,
    refractory_period_sec: u32,
    bucket_size_ns: u64,
) -> AnomalyTracker {
    AnomalyTracker::new(
        AlertSpec {
            id: 1,
            metric_id: 1,
            num_buckets,
            threshold,
            refractory_period_sec,
        },
        BucketGeometry::new(0, bucket_size_ns),
    )
}

/// Events over slices 0..3 with non-decreasing timestamps.
fn sorted_events(max_gap_ns: u64) -> impl Strategy<Value = Vec<(i32, u64)>> {
    prop::collection::vec((0i32..3, 0u64..max_gap_ns), 1..80).prop_map(|steps| {
        let mut now = 0u64;
        steps
            .into_iter()
            .map(|(uid, gap)| {
                now += gap;
                (uid, now)
            })
            .collect()
    })
}

/// Events over slices 0..3 arriving up to `max_lag_buckets` buckets behind
/// the newest bucket seen so far.
fn lagging_events(
    bucket_size_ns: u64,
    max_lag_buckets: u64,
) -> impl Strategy<Value = Vec<(i32, u64)>> {
    let max_lag_ns = max_lag_buckets * bucket_size_ns;
    prop::collection::vec((0i32..3, 0u64..bucket_size_ns, 0u64..=max_lag_ns), 1..80).prop_map(
        |steps| {
            let mut now = 0u64;
            steps
                .into_iter()
                .map(|(uid, gap, lag)| {
                    now += gap;
                    (uid, now.saturating_sub(lag))
                })
                .collect()
        },
    )
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// The sliding sum equals the number of events of the slice counted in
    /// the last `N` buckets of that slice, late events counting in the
    /// slice's newest bucket. Slices whose window ends `N` or more buckets
    /// behind the late horizon start over.
    #[test]
    fn sliding_sum_matches_window_model(
        num_buckets in 1u32..5,
        events in prop::collection::vec((0i32..3, 0u64..2_000), 1..80),
    ) {
        let bucket_size_ns = 100;
        let n = u64::from(num_buckets);
        let sink = MemorySink::new();
        let mut t = tracker(num_buckets, i64::MAX, 0, bucket_size_ns);
        let mut newest: Option<u64> = None;
        let mut heads: HashMap<i32, u64> = HashMap::new();
        let mut counted: Vec<(i32, u64)> = Vec::new();

        for (uid, time_ns) in events {
            let bucket = time_ns / bucket_size_ns;
            let head = heads.get(&uid).map_or(bucket, |h| (*h).max(bucket));
            heads.insert(uid, head);
            counted.push((uid, head));

            let expected = counted
                .iter()
                .filter(|(u, at)| *u == uid && head - at < n)
                .count() as i64;
            let detection = t.observe(&key(uid), 1, time_ns, &sink).unwrap();
            prop_assert_eq!(detection, Detection::BelowThreshold { sliding_sum: expected });

            if newest.is_some_and(|b| bucket > b) {
                let horizon = bucket.saturating_sub(n);
                heads.retain(|_, h| horizon.saturating_sub(*h) < n);
                counted.retain(|(u, _)| heads.contains_key(u));
            }
            newest = Some(newest.map_or(bucket, |b| b.max(bucket)));
        }
        prop_assert!(sink.is_empty());
    }

    /// No slice fires again before `fire_sec + R + 1`, refractory deadlines
    /// strictly increase across fires, and suppression only happens inside
    /// a running refractory period.
    #[test]
    fn fires_respect_refractory_period(
        num_buckets in 1u32..4,
        threshold in 0i64..3,
        refractory in 0u32..8,
        events in sorted_events(1_500_000_000),
    ) {
        let sink = MemorySink::new();
        let mut t = tracker(num_buckets, threshold, refractory, 3 * NS_PER_SEC);
        let mut last_fire: HashMap<DimensionKey, (u64, u32)> = HashMap::new();
        let mut fires = 0usize;

        for (uid, time_ns) in events {
            let k = key(uid);
            let now_sec = time_ns / NS_PER_SEC;
            let previous = last_fire.get(&k).copied();

            match t.observe(&k, 1, time_ns, &sink).unwrap() {
                Detection::Fired(alert) => {
                    if let Some((prev_sec, prev_end)) = previous {
                        prop_assert!(now_sec >= prev_sec + u64::from(refractory) + 1);
                        prop_assert!(alert.refractory_end_sec > prev_end);
                    }
                    prop_assert!(alert.sliding_sum > threshold);
                    prop_assert_eq!(
                        alert.refractory_end_sec,
                        refractory_deadline(now_sec, refractory)
                    );
                    last_fire.insert(k, (now_sec, alert.refractory_end_sec));
                    fires += 1;
                }
                Detection::Suppressed { sliding_sum, refractory_end_sec } => {
                    prop_assert!(sliding_sum > threshold);
                    prop_assert!(previous.is_some());
                    let (prev_sec, prev_end) = previous.unwrap_or_default();
                    prop_assert!(now_sec < prev_sec + u64::from(refractory) + 1);
                    prop_assert_eq!(refractory_end_sec, prev_end);
                }
                Detection::BelowThreshold { sliding_sum } => {
                    prop_assert!(sliding_sum <= threshold);
                }
            }
        }
        prop_assert_eq!(sink.len(), fires);
    }

    /// Interleaving other slices changes nothing about a slice's detections,
    /// including when events arrive out of order by up to `N` buckets.
    #[test]
    fn slices_do_not_interact(
        (num_buckets, events) in (1u32..4).prop_flat_map(|n| {
            (Just(n), lagging_events(3 * NS_PER_SEC, u64::from(n)))
        }),
        threshold in 0i64..4,
        refractory in 0u32..5,
    ) {
        let bucket_size_ns = 3 * NS_PER_SEC;
        let sink = MemorySink::new();
        let mut mixed = tracker(num_buckets, threshold, refractory, bucket_size_ns);
        let mut alone = tracker(num_buckets, threshold, refractory, bucket_size_ns);

        for (uid, time_ns) in &events {
            let detection = mixed.observe(&key(*uid), 1, *time_ns, &sink).unwrap();
            if *uid == 0 {
                let solo = alone.observe(&key(0), 1, *time_ns, &sink).unwrap();
                prop_assert_eq!(detection, solo);
            }
        }
    }

    /// After at least `N` idle buckets every slice starts from an empty
    /// window.
    #[test]
    fn idle_window_resets_counts(
        num_buckets in 1u32..5,
        warmup in sorted_events(150),
        extra_buckets in 0u64..4,
        uid in 0i32..4,
    ) {
        let bucket_size_ns = 100;
        let sink = MemorySink::new();
        let mut t = tracker(num_buckets, i64::MAX, 0, bucket_size_ns);

        let mut last = 0;
        for (u, time_ns) in warmup {
            t.observe(&key(u), 1, time_ns, &sink).unwrap();
            last = time_ns;
        }

        let later = last + (u64::from(num_buckets) + extra_buckets) * bucket_size_ns;
        let detection = t.observe(&key(uid), 1, later, &sink).unwrap();
        prop_assert_eq!(detection, Detection::BelowThreshold { sliding_sum: 1 });
        for other in 0..4 {
            if other != uid {
                prop_assert_eq!(t.sliding_sum(&key(other)), 0);
            }
        }
    }
}
