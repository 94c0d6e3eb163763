use crate::counter::BucketGeometry;
use crate::error::DropReason;
use crate::matcher::MatcherId;
use crate::projection::DimensionSpec;
use crate::snapshot::MetricSnapshot;
use crate::tracker::{AlertSpec, AnomalyTracker, Detection};
use slicewatch_common::DecodedEvent;
use slicewatch_notify::AlertSink;

/// Counts matched events per slice and feeds every attached alert.
#[derive(Debug, Clone)]
pub struct CountMetricProducer {
    metric_id: u64,
    what: MatcherId,
    dimensions: DimensionSpec,
    geometry: BucketGeometry,
    trackers: Vec<AnomalyTracker>,
}

impl CountMetricProducer {
    pub fn new(
        metric_id: u64,
        what: MatcherId,
        dimensions: DimensionSpec,
        geometry: BucketGeometry,
    ) -> Self {
        Self {
            metric_id,
            what,
            dimensions,
            geometry,
            trackers: Vec::new(),
        }
    }

    /// Attaches an alert. Each alert keeps its own counts, so alerts with
    /// different window lengths on the same metric do not interfere.
    pub fn add_alert(&mut self, spec: AlertSpec) {
        self.trackers.push(AnomalyTracker::new(spec, self.geometry));
    }

    pub fn with_alert(mut self, spec: AlertSpec) -> Self {
        self.add_alert(spec);
        self
    }

    pub fn dimensions(&self) -> &DimensionSpec {
        &self.dimensions
    }

    pub fn geometry(&self) -> BucketGeometry {
        self.geometry
    }

    /// Counts one occurrence of `event` for its slice in every tracker.
    pub fn on_event(
        &mut self,
        event: &DecodedEvent,
        sink: &dyn AlertSink,
    ) -> Result<Vec<Detection>, DropReason> {
        if self.geometry.bucket_index(event.time_ns).is_none() {
            return Err(DropReason::BeforeStartTime);
        }
        let key = self
            .dimensions
            .project(event)
            .ok_or(DropReason::NoDimension)?;

        self.trackers
            .iter_mut()
            .map(|tracker| tracker.observe(&key, 1, event.time_ns, sink))
            .collect()
    }
}

/// A metric installed in the dispatcher.
#[derive(Debug, Clone)]
pub enum MetricProducer {
    Count(CountMetricProducer),
}

impl MetricProducer {
    pub fn metric_id(&self) -> u64 {
        match self {
            Self::Count(p) => p.metric_id,
        }
    }

    /// Matcher whose events this metric consumes.
    pub fn what(&self) -> MatcherId {
        match self {
            Self::Count(p) => p.what,
        }
    }

    pub fn on_event(
        &mut self,
        event: &DecodedEvent,
        sink: &dyn AlertSink,
    ) -> Result<Vec<Detection>, DropReason> {
        match self {
            Self::Count(p) => p.on_event(event, sink),
        }
    }

    pub fn trackers(&self) -> &[AnomalyTracker] {
        match self {
            Self::Count(p) => &p.trackers,
        }
    }

    pub fn tracker(&self, alert_id: u64) -> Option<&AnomalyTracker> {
        self.trackers().iter().find(|t| t.spec().id == alert_id)
    }

    pub fn reset(&mut self) {
        match self {
            Self::Count(p) => p.trackers.iter_mut().for_each(AnomalyTracker::reset),
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            metric_id: self.metric_id(),
            what: self.what().0,
            trackers: self.trackers().iter().map(AnomalyTracker::snapshot).collect(),
        }
    }
}

impl From<CountMetricProducer> for MetricProducer {
    fn from(p: CountMetricProducer) -> Self {
        Self::Count(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_common::{FieldPath, NS_PER_SEC};
    use slicewatch_notify::MemorySink;

    const UID: u32 = 0x0201_0101;

    fn producer(alerts: &[(u64, u32, i64)]) -> MetricProducer {
        let mut p = CountMetricProducer::new(
            1,
            MatcherId(10),
            DimensionSpec::new([FieldPath(UID)]),
            BucketGeometry::new(NS_PER_SEC, 60 * NS_PER_SEC),
        );
        for (id, num_buckets, threshold) in alerts {
            p.add_alert(AlertSpec {
                id: *id,
                metric_id: 1,
                num_buckets: *num_buckets,
                threshold: *threshold,
                refractory_period_sec: 0,
            });
        }
        p.into()
    }

    fn event(uid: i32, sec: u64) -> DecodedEvent {
        DecodedEvent::new(10, sec * NS_PER_SEC).with_field(UID, uid)
    }

    #[test]
    fn drops_events_before_start() {
        let mut p = producer(&[(7, 1, 0)]);
        let sink = MemorySink::new();
        let err = p.on_event(&DecodedEvent::new(10, 10), &sink).unwrap_err();
        assert_eq!(err, DropReason::BeforeStartTime);
    }

    #[test]
    fn drops_events_without_dimension_fields() {
        let mut p = producer(&[(7, 1, 0)]);
        let sink = MemorySink::new();
        let err = p
            .on_event(&DecodedEvent::new(10, 2 * NS_PER_SEC), &sink)
            .unwrap_err();
        assert_eq!(err, DropReason::NoDimension);
        assert!(p.tracker(7).unwrap().counter().is_empty());
    }

    #[test]
    fn every_alert_sees_every_event() {
        let mut p = producer(&[(7, 1, 1), (8, 3, 0)]);
        let sink = MemorySink::new();
        let detections = p.on_event(&event(111, 2), &sink).unwrap();
        assert_eq!(detections.len(), 2);
        assert!(detections[0].fired().is_none());
        assert_eq!(detections[1].fired().unwrap().alert_id, 8);

        p.on_event(&event(111, 3), &sink).unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(p.metric_id(), 1);
        assert_eq!(p.what(), MatcherId(10));
    }

    #[test]
    fn reset_clears_every_tracker() {
        let mut p = producer(&[(7, 1, 5), (8, 2, 5)]);
        let sink = MemorySink::new();
        p.on_event(&event(111, 2), &sink).unwrap();
        p.reset();
        assert!(p.trackers().iter().all(|t| t.counter().is_empty()));
    }
}
