use crate::error::NotifyError;
use crate::AlertSink;
use anyhow::Result;
use slicewatch_common::AlertFired;
use std::sync::{Arc, Mutex};

/// Collects fired alerts in delivery order.
///
/// Clones share the same buffer, so a test or debug dumper can keep one
/// handle while the detector owns another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    alerts: Arc<Mutex<Vec<AlertFired>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every alert received so far.
    pub fn alerts(&self) -> Vec<AlertFired> {
        match self.alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.alerts.lock() {
            Ok(alerts) => alerts.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every buffered alert.
    pub fn drain(&self) -> Vec<AlertFired> {
        match self.alerts.lock() {
            Ok(mut alerts) => std::mem::take(&mut *alerts),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl AlertSink for MemorySink {
    fn on_alert(&self, alert: &AlertFired) -> Result<()> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| NotifyError::Poisoned(self.sink_name().to_string()))?;
        alerts.push(alert.clone());
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "memory"
    }
}
