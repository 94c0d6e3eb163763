//! Sliced count-metric anomaly detection.
//!
//! Decoded events are routed by the [`engine::Dispatcher`] to every count
//! metric whose matcher accepts them. Each metric projects the event onto
//! a slice key and counts it into a per-slice ring of time buckets. Every
//! alert attached to the metric sums the last `N` buckets of the slice and
//! fires when the sum exceeds its threshold, unless the slice is still in
//! its refractory period.
//!
//! Processing is single-threaded: callers must serialize `on_event` calls.
//! No internal locking is performed.

pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod producer;
pub mod projection;
pub mod snapshot;
pub mod stats;
pub mod tracker;
pub mod window;


pub use config::DetectorConfig;
pub use engine::Dispatcher;
pub use error::{AnomalyError, DropReason};
pub use matcher::{AtomMatcher, MatcherId, PredicateMatcher, ValueRule};
pub use producer::{CountMetricProducer, MetricProducer};
pub use tracker::{AlertSpec, AnomalyTracker, Detection};

use slicewatch_common::DecodedEvent;

/// A predicate selecting the events a metric consumes.
///
/// Matchers are registered in the [`engine::Dispatcher`] and evaluated at
/// most once per event, however many metrics reference them.
pub trait EventMatcher: Send {
    /// Identifier metrics use to reference this matcher.
    fn id(&self) -> MatcherId;

    /// Returns true if the event should be counted by metrics using this
    /// matcher.
    fn matches(&self, event: &DecodedEvent) -> bool;
}
