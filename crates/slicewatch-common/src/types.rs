use crate::dimension::DimensionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

pub const NS_PER_SEC: u64 = 1_000_000_000;

/// Converts an event timestamp in nanoseconds to a UTC datetime.
///
/// Timestamps beyond `i64::MAX` nanoseconds clamp to the latest
/// representable instant.
pub fn nanos_to_datetime(ns: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::try_from(ns).unwrap_or(i64::MAX))
}

/// Packed position of a field inside an atom (e.g. `0x02010101` for the
/// uid of the first attribution node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(pub u32);

impl From<u32> for FieldPath {
    fn from(path: u32) -> Self {
        Self(path)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed field value decoded from a log event.
///
/// Values are totally ordered and hashable so they can participate in
/// slice keys. Floats compare by [`f64::total_cmp`] and hash by bit
/// pattern, which keeps `Eq` and `Hash` consistent.
///
/// # Examples
///
/// ```
/// use slicewatch_common::Value;
///
/// assert_eq!(Value::from(111), Value::Int(111));
/// assert_ne!(Value::Int(1), Value::Long(1));
/// assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
/// assert_eq!(Value::from("wl1").as_str(), Some("wl1"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Long(_) => 1,
            Value::Float(_) => 2,
            Value::Bytes(_) => 3,
        }
    }

    /// Integer view of `Int` and `Long` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// UTF-8 view of `Bytes` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Bytes(v.into_bytes())
    }
}

/// A log event after decoding: timestamp, atom id and typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Event time, monotonic per stream.
    pub time_ns: u64,
    pub atom_id: u32,
    pub fields: Vec<(FieldPath, Value)>,
}

impl DecodedEvent {
    pub fn new(atom_id: u32, time_ns: u64) -> Self {
        Self {
            time_ns,
            atom_id,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.fields.push((path.into(), value.into()));
        self
    }

    /// Returns the first value recorded under `path`.
    pub fn field(&self, path: FieldPath) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, v)| v)
    }

    pub fn time_sec(&self) -> u64 {
        self.time_ns / NS_PER_SEC
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        nanos_to_datetime(self.time_ns)
    }
}

/// Notification delivered to the sink when an alert fires for a slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFired {
    pub alert_id: u64,
    pub metric_id: u64,
    pub slice_key: DimensionKey,
    /// Time of the event that pushed the sliding sum over the threshold.
    pub event_time_ns: u64,
    /// Sliding sum observed at the fire, including the triggering event.
    pub sliding_sum: i64,
    pub threshold: i64,
    /// Second at which the slice may fire again.
    pub refractory_end_sec: u32,
}

impl AlertFired {
    pub fn event_time(&self) -> DateTime<Utc> {
        nanos_to_datetime(self.event_time_ns)
    }
}
