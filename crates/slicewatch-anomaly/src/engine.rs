use crate::config::{CountMetricConfig, DetectorConfig};
use crate::error::{AnomalyError, Result};
use crate::matcher::MatcherId;
use crate::producer::MetricProducer;
use crate::snapshot::DetectorSnapshot;
use crate::stats::{bump, DetectorStats};
use crate::tracker::{AnomalyTracker, Detection};
use crate::EventMatcher;
use slicewatch_common::{AlertFired, DecodedEvent, DimensionKey};
use slicewatch_notify::{AlertSink, LogSink};

/// Routes decoded events to the metrics whose matchers accept them.
pub struct Dispatcher {
    start_time_ns: u64,
    matchers: Vec<Box<dyn EventMatcher>>,
    producers: Vec<MetricProducer>,
    sink: Box<dyn AlertSink>,
    stats: DetectorStats,
}

impl Dispatcher {
    pub fn new(start_time_ns: u64, sink: impl AlertSink + 'static) -> Self {
        Self {
            start_time_ns,
            matchers: Vec::new(),
            producers: Vec::new(),
            sink: Box::new(sink),
            stats: DetectorStats::default(),
        }
    }

    /// Builds a dispatcher from a validated configuration.
    pub fn from_config(config: &DetectorConfig, sink: impl AlertSink + 'static) -> Result<Self> {
        let mut dispatcher = Self::new(config.start_time_ns, sink);
        dispatcher.install(config)?;
        Ok(dispatcher)
    }

    fn install(&mut self, config: &DetectorConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Detector config rejected");
            return Err(e);
        }
        self.start_time_ns = config.start_time_ns;
        self.matchers = config
            .matchers
            .iter()
            .map(|m| Box::new(m.build()) as Box<dyn EventMatcher>)
            .collect();
        self.producers.clear();
        for metric in &config.count_metrics {
            self.add_count_metric(metric)?;
        }
        Ok(())
    }

    pub fn start_time_ns(&self) -> u64 {
        self.start_time_ns
    }

    pub fn set_sink(&mut self, sink: impl AlertSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Registers a matcher, replacing any matcher with the same id.
    pub fn add_matcher(&mut self, matcher: impl EventMatcher + 'static) {
        let id = matcher.id();
        self.matchers.retain(|m| m.id() != id);
        self.matchers.push(Box::new(matcher));
    }

    pub fn matcher(&self, id: MatcherId) -> Option<&dyn EventMatcher> {
        self.matchers
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.as_ref())
    }

    /// Validates and installs one count metric. A rejected metric is not
    /// installed; metrics already installed are unaffected.
    pub fn add_count_metric(&mut self, config: &CountMetricConfig) -> Result<()> {
        let producer = config.build(self.start_time_ns).map_err(|e| {
            tracing::warn!(metric_id = config.id, error = %e, "Count metric rejected");
            e
        })?;
        self.add_producer(producer)
    }

    /// Installs an already built producer after checking that its matcher
    /// is registered and that its metric and alert ids are unused.
    pub fn add_producer(&mut self, producer: impl Into<MetricProducer>) -> Result<()> {
        let producer = producer.into();
        if let Err(e) = self.check_producer(&producer) {
            tracing::warn!(metric_id = producer.metric_id(), error = %e, "Count metric rejected");
            return Err(e);
        }
        tracing::info!(
            metric_id = producer.metric_id(),
            what = %producer.what(),
            alerts = producer.trackers().len(),
            "Count metric installed"
        );
        self.producers.push(producer);
        Ok(())
    }

    fn check_producer(&self, producer: &MetricProducer) -> Result<()> {
        let metric_id = producer.metric_id();
        if self.matcher(producer.what()).is_none() {
            return Err(AnomalyError::rejected(
                "metric",
                metric_id,
                format!("unknown matcher {}", producer.what()),
            ));
        }
        if self.producers.iter().any(|p| p.metric_id() == metric_id) {
            return Err(AnomalyError::rejected(
                "metric",
                metric_id,
                "duplicate metric id",
            ));
        }
        for tracker in producer.trackers() {
            let alert_id = tracker.spec().id;
            if self.tracker(alert_id).is_some() {
                return Err(AnomalyError::rejected(
                    "alert",
                    alert_id,
                    "duplicate alert id",
                ));
            }
        }
        Ok(())
    }

    /// Removes a metric and all its state. Returns true if it was installed.
    pub fn remove_metric(&mut self, metric_id: u64) -> bool {
        let len_before = self.producers.len();
        self.producers.retain(|p| p.metric_id() != metric_id);
        let removed = self.producers.len() < len_before;
        if removed {
            tracing::info!(metric_id, "Count metric removed");
        }
        removed
    }

    /// Replaces every matcher and metric. All counts and refractory state
    /// are discarded. On error the current configuration is kept.
    pub fn replace_config(&mut self, config: &DetectorConfig) -> Result<()> {
        self.install(config)
    }

    /// Feeds one event through every matching metric, in registration
    /// order, and returns the alerts it fired.
    pub fn on_event(&mut self, event: &DecodedEvent) -> Vec<AlertFired> {
        bump(&mut self.stats.events_received);

        let matched: Vec<MatcherId> = self
            .matchers
            .iter()
            .filter(|m| m.matches(event))
            .map(|m| m.id())
            .collect();
        if matched.is_empty() {
            return Vec::new();
        }

        let mut fired = Vec::new();
        let mut routed = false;
        let sink = self.sink.as_ref();
        for producer in self
            .producers
            .iter_mut()
            .filter(|p| matched.contains(&p.what()))
        {
            routed = true;
            match producer.on_event(event, sink) {
                Ok(detections) => fired.extend(detections.into_iter().filter_map(|d| match d {
                    Detection::Fired(alert) => Some(alert),
                    _ => None,
                })),
                Err(reason) => {
                    self.stats.note_drop(reason);
                    tracing::trace!(
                        metric_id = producer.metric_id(),
                        atom_id = event.atom_id,
                        time_ns = event.time_ns,
                        %reason,
                        "Event dropped"
                    );
                }
            }
        }
        if routed {
            bump(&mut self.stats.events_matched);
        }
        fired
    }

    pub fn producers(&self) -> &[MetricProducer] {
        &self.producers
    }

    pub fn tracker(&self, alert_id: u64) -> Option<&AnomalyTracker> {
        self.producers.iter().find_map(|p| p.tracker(alert_id))
    }

    /// Refractory deadline of a slice for an alert; 0 when unknown.
    pub fn refractory_end_sec(&self, alert_id: u64, key: &DimensionKey) -> u32 {
        self.tracker(alert_id)
            .map_or(0, |t| t.refractory_end_sec(key))
    }

    /// Current sliding sum of a slice for an alert; 0 when unknown.
    pub fn sliding_sum(&self, alert_id: u64, key: &DimensionKey) -> i64 {
        self.tracker(alert_id).map_or(0, |t| t.sliding_sum(key))
    }

    /// Dispatcher counters with every tracker's counters folded in.
    pub fn stats(&self) -> DetectorStats {
        let mut stats = self.stats;
        for tracker in self.producers.iter().flat_map(|p| p.trackers()) {
            stats.absorb(&tracker.stats());
        }
        stats
    }

    pub fn snapshot(&self) -> DetectorSnapshot {
        DetectorSnapshot {
            start_time_ns: self.start_time_ns,
            metrics: self.producers.iter().map(MetricProducer::snapshot).collect(),
            stats: self.stats(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(0, LogSink)
    }
}
