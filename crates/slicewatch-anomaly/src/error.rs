use serde::Serialize;

/// Errors surfaced while installing or loading detector configuration.
///
/// Event processing never returns these: events that cannot be counted
/// are dropped silently and classified by [`DropReason`].
///
/// # Examples
///
/// ```rust
/// use slicewatch_anomaly::error::AnomalyError;
///
/// let err = AnomalyError::rejected("alert", 77, "num_buckets must be at least 1");
/// assert!(err.to_string().contains("alert 77"));
/// assert!(err.is_config_rejected());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnomalyError {
    /// A metric, alert or matcher definition is invalid. The offending
    /// metric is not installed.
    #[error("Anomaly: {entity} {id} rejected: {reason}")]
    ConfigRejected {
        entity: &'static str,
        id: u64,
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("Anomaly: failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::config::DetectorConfig`].
    #[error("Anomaly: invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AnomalyError {
    pub fn rejected(entity: &'static str, id: u64, reason: impl Into<String>) -> Self {
        Self::ConfigRejected {
            entity,
            id,
            reason: reason.into(),
        }
    }

    pub fn is_config_rejected(&self) -> bool {
        matches!(self, Self::ConfigRejected { .. })
    }
}

/// Convenience `Result` alias for configuration operations.
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Why an event was not counted by a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The event lacks a field the metric's dimensions require.
    NoDimension,
    /// The event predates the configured start time.
    BeforeStartTime,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDimension => write!(f, "no_dimension"),
            Self::BeforeStartTime => write!(f, "before_start_time"),
        }
    }
}
