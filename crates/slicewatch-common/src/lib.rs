//! Shared types for the slicewatch anomaly pipeline.
//!
//! Decoded log events, their typed field values, the slice key projected
//! from an event, and the notification emitted when an alert fires.

pub mod dimension;
pub mod types;

pub use dimension::{DimensionKey, DEFAULT_KEY};
pub use types::{nanos_to_datetime, AlertFired, DecodedEvent, FieldPath, Value, NS_PER_SEC};
