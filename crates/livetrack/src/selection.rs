//! Resolves which match the emitter should drive.
//!
//! The store is authoritative. When it cannot be read, the resolver answers
//! from the last selection it saw or was given in this process.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::tracker_storage::{TrackedSelection, TrackerStorage};

/// A selection that names a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub match_id: String,
    pub team: Option<String>,
}

impl ResolvedSelection {
    fn from_selection(selection: TrackedSelection) -> Option<Self> {
        let match_id = selection.match_id.filter(|id| !id.is_empty())?;
        Some(Self {
            match_id,
            team: selection.team,
        })
    }
}

pub struct SelectionResolver {
    storage: Arc<dyn TrackerStorage>,
    last_known: RwLock<Option<TrackedSelection>>,
}

impl SelectionResolver {
    pub fn new(storage: Arc<dyn TrackerStorage>) -> Self {
        Self {
            storage,
            last_known: RwLock::new(None),
        }
    }

    /// The tracked match, or `None` when nothing (or a selection without a
    /// match id) has been designated.
    pub async fn resolve(&self) -> Option<ResolvedSelection> {
        let selection = match self.storage.get_selection().await {
            Ok(Some(selection)) => {
                *self.last_known.write() = Some(selection.clone());
                Some(selection)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read tracked selection, using last known value");
                self.last_known.read().clone()
            }
        };
        selection.and_then(ResolvedSelection::from_selection)
    }

    /// Administrative write. Stores the selection and remembers it locally;
    /// if the store rejects the write the selection still takes effect in
    /// this process through the fallback.
    pub async fn set_selection(&self, match_id: Option<&str>, team: Option<&str>) -> TrackedSelection {
        let match_id = match_id.filter(|id| !id.is_empty());
        let selection = match self.storage.set_selection(match_id, team).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    match_id = ?match_id,
                    error = %e,
                    "failed to persist tracked selection, keeping it in memory"
                );
                TrackedSelection::new(match_id, team)
            }
        };
        *self.last_known.write() = Some(selection.clone());
        selection
    }

    /// Last selection observed or written through this resolver.
    pub fn last_known(&self) -> Option<TrackedSelection> {
        self.last_known.read().clone()
    }
}
