use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of the process that last wrote a tracked state record.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaderId(pub String);

impl LeaderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the current process: its pid plus a random suffix, so
    /// two hosts that happen to share a pid still write distinct ids.
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", std::process::id(), &suffix[..8]))
    }
}

impl fmt::Display for LeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LeaderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
