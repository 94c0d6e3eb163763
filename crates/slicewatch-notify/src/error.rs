/// Errors raised by the built-in alert sinks.
///
/// The [`crate::AlertSink`] seam returns `anyhow::Result` so arbitrary
/// callbacks can be plugged in; built-in sinks raise these typed errors,
/// which convert into `anyhow::Error` at the seam.
///
/// # Examples
///
/// ```rust
/// use slicewatch_notify::error::NotifyError;
///
/// let err = NotifyError::Closed("queue".to_string());
/// assert!(err.to_string().contains("queue"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The receiving end of a queue-backed sink has been dropped.
    #[error("Notify: {0} receiver is closed")]
    Closed(String),

    /// A sink's shared buffer was poisoned by a panicking holder.
    #[error("Notify: {0} buffer lock poisoned")]
    Poisoned(String),

    /// Generic sink error for cases not covered by other variants.
    #[error("Notify: {0}")]
    Other(String),
}

/// Convenience `Result` alias for sink operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
