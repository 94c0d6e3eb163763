//! Delivery of fired anomaly alerts.
//!
//! The detector hands every [`AlertFired`] to a single [`AlertSink`]
//! synchronously, on the processing thread. Built-in sinks log the alert,
//! collect it in memory, forward it to an async queue, or fan it out to
//! several other sinks. Any `Fn(&AlertFired) -> anyhow::Result<()>`
//! closure is a sink as well.

pub mod channels;
pub mod error;
pub mod manager;
pub mod utils;


pub use channels::log::LogSink;
pub use channels::memory::MemorySink;
pub use channels::queue::QueueSink;
pub use manager::FanoutSink;

use anyhow::Result;
use slicewatch_common::AlertFired;

/// Receiver of fired alerts.
///
/// Delivery is synchronous: the detector waits for `on_alert` to return
/// before accepting the next event. Sinks with slow work must hand the
/// alert off to their own queue (see [`QueueSink`]).
///
/// A returned error is logged by the caller and otherwise ignored; the
/// fire still counts and the slice's refractory period is still armed.
pub trait AlertSink: Send {
    /// Delivers one fired alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink could not accept the alert.
    fn on_alert(&self, alert: &AlertFired) -> Result<()>;

    /// Short name used in logs (e.g., `"log"`, `"queue"`).
    fn sink_name(&self) -> &str {
        "callback"
    }
}

impl<F> AlertSink for F
where
    F: Fn(&AlertFired) -> Result<()> + Send,
{
    fn on_alert(&self, alert: &AlertFired) -> Result<()> {
        self(alert)
    }
}
