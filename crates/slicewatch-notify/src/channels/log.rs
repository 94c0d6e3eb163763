use crate::utils::render_json;
use crate::AlertSink;
use anyhow::Result;
use slicewatch_common::AlertFired;

/// Writes every fired alert to the `tracing` log at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn on_alert(&self, alert: &AlertFired) -> Result<()> {
        tracing::warn!(
            alert_id = alert.alert_id,
            metric_id = alert.metric_id,
            slice = %alert.slice_key,
            sum = alert.sliding_sum,
            threshold = alert.threshold,
            payload = %render_json(alert),
            "Anomaly alert fired"
        );
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}
