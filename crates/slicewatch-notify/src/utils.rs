//! Rendering helpers shared by the sinks.

use serde_json::{json, Value};
use slicewatch_common::AlertFired;

/// Renders a fired alert as a JSON object.
///
/// The slice key is rendered in its display form (`"path=value, ..."`) and
/// the event time both as raw nanoseconds and as RFC 3339.
pub fn render_json(alert: &AlertFired) -> Value {
    json!({
        "alert_id": alert.alert_id,
        "metric_id": alert.metric_id,
        "slice": alert.slice_key.to_string(),
        "event_time_ns": alert.event_time_ns,
        "event_time": alert.event_time().to_rfc3339(),
        "sliding_sum": alert.sliding_sum,
        "threshold": alert.threshold,
        "refractory_end_sec": alert.refractory_end_sec,
    })
}
