use crate::error::NotifyError;
use crate::AlertSink;
use anyhow::Result;
use slicewatch_common::AlertFired;
use tokio::sync::mpsc;

/// Forwards fired alerts to an unbounded tokio channel.
///
/// The detector never blocks on the consumer; slow work (network delivery,
/// persistence) runs on whatever task drains the receiver.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::UnboundedSender<AlertFired>,
}

impl QueueSink {
    pub fn new(tx: mpsc::UnboundedSender<AlertFired>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AlertFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl AlertSink for QueueSink {
    fn on_alert(&self, alert: &AlertFired) -> Result<()> {
        self.tx
            .send(alert.clone())
            .map_err(|_| NotifyError::Closed(self.sink_name().to_string()))?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "queue"
    }
}
