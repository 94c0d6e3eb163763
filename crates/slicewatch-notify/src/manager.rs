use crate::AlertSink;
use anyhow::Result;
use slicewatch_common::AlertFired;

/// Delivers each alert to several sinks in registration order.
///
/// Every sink is attempted even if an earlier one fails; failures are
/// logged per sink and the first one is returned to the caller.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn add(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: impl AlertSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.sink_name()).collect()
    }
}

impl AlertSink for FanoutSink {
    fn on_alert(&self, alert: &AlertFired) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.on_alert(alert) {
                tracing::warn!(
                    sink = sink.sink_name(),
                    alert_id = alert.alert_id,
                    error = %e,
                    "Sink failed to accept alert"
                );
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn sink_name(&self) -> &str {
        "fanout"
    }
}
