/// Errors that can occur in the tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("persistence error: {reason}")]
    PersistenceError {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("coordination error: {reason}")]
    CoordinationError {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("malformed record: {reason}")]
    MalformedRecord {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cycle aborted: {reason}")]
    CycleAborted { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[cfg(feature = "sql")]
impl TrackerError {
    pub(crate) fn persistence(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PersistenceError {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }
}
