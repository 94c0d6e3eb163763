use crate::error::DropReason;
use serde::Serialize;

pub(crate) fn bump(counter: &mut u64) {
    *counter = counter.saturating_add(1);
}

/// Counters kept by a single anomaly tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub alerts_fired: u64,
    pub alerts_suppressed: u64,
    pub sink_errors: u64,
    pub late_events: u64,
    pub slices_evicted: u64,
}

/// Detector-wide counters.
///
/// Drops are counted per (event, metric) pair: an event routed to two
/// metrics that both lack its dimensions counts twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    pub events_received: u64,
    pub events_matched: u64,
    pub dropped_no_dimension: u64,
    pub dropped_before_start: u64,
    pub alerts_fired: u64,
    pub alerts_suppressed: u64,
    pub sink_errors: u64,
    pub late_events: u64,
    pub slices_evicted: u64,
}

impl DetectorStats {
    pub fn note_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::NoDimension => bump(&mut self.dropped_no_dimension),
            DropReason::BeforeStartTime => bump(&mut self.dropped_before_start),
        }
    }

    /// Adds a tracker's counters into the detector totals.
    pub fn absorb(&mut self, tracker: &TrackerStats) {
        self.alerts_fired = self.alerts_fired.saturating_add(tracker.alerts_fired);
        self.alerts_suppressed = self
            .alerts_suppressed
            .saturating_add(tracker.alerts_suppressed);
        self.sink_errors = self.sink_errors.saturating_add(tracker.sink_errors);
        self.late_events = self.late_events.saturating_add(tracker.late_events);
        self.slices_evicted = self.slices_evicted.saturating_add(tracker.slices_evicted);
    }
}
