use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::TrackerError;
use crate::tracker_storage::{TrackedSelection, TrackedState, TrackerStorage};

/// In-memory tracker storage for testing.
///
/// `set_available(false)` makes every call fail with a persistence error, which
/// is how tests simulate a database outage.
pub struct MemoryTrackerStorage {
    states: DashMap<String, TrackedState>,
    selection: Mutex<Option<TrackedSelection>>,
    available: AtomicBool,
    writes_failing: AtomicBool,
}

impl MemoryTrackerStorage {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            selection: Mutex::new(None),
            available: AtomicBool::new(true),
            writes_failing: AtomicBool::new(false),
        }
    }

    /// Toggle whether the storage answers at all.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Toggle whether `put_state` fails while reads keep working.
    pub fn set_writes_failing(&self, failing: bool) {
        self.writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Number of state records held.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    fn check_available(&self, op: &str) -> Result<(), TrackerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TrackerError::PersistenceError {
                reason: format!("memory storage unavailable during {op}"),
                source: None,
            })
        }
    }
}

impl Default for MemoryTrackerStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackerStorage for MemoryTrackerStorage {
    async fn get_state(&self, match_id: &str) -> Result<Option<TrackedState>, TrackerError> {
        self.check_available("get_state")?;
        Ok(self.states.get(match_id).map(|entry| entry.value().clone()))
    }

    async fn put_state(&self, state: &TrackedState) -> Result<(), TrackerError> {
        self.check_available("put_state")?;
        if self.writes_failing.load(Ordering::SeqCst) {
            return Err(TrackerError::PersistenceError {
                reason: format!("write rejected for match {}", state.match_id),
                source: None,
            });
        }
        self.states.insert(state.match_id.clone(), state.clone());
        Ok(())
    }

    async fn get_selection(&self) -> Result<Option<TrackedSelection>, TrackerError> {
        self.check_available("get_selection")?;
        Ok(self.selection.lock().clone())
    }

    async fn set_selection(
        &self,
        match_id: Option<&str>,
        team: Option<&str>,
    ) -> Result<TrackedSelection, TrackerError> {
        self.check_available("set_selection")?;
        let selection = TrackedSelection::new(match_id, team);
        *self.selection.lock() = Some(selection.clone());
        Ok(selection)
    }
}
