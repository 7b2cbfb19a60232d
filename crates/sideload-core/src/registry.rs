use crate::lifecycle::WorkflowState;
use sideload_schema::ItemId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub state: WorkflowState,
    /// A run holds this item's lease.
    pub in_flight: bool,
    /// RFC 3339 time of the last state change.
    pub updated_at: String,
}

/// Item id → workflow state for every item the engine has seen.
///
/// Entries are only changed through a `RunLease`, so each item has at most one
/// writer at a time.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    entries: Mutex<BTreeMap<ItemId, RegistryEntry>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<ItemId, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the item's lease, or `None` if a previous run still holds it.
    ///
    /// A run that was dropped mid-flight leaves a non-terminal state behind;
    /// that state is reset to `Idle` so the new run starts from the beginning.
    pub fn try_begin(self: &Arc<Self>, id: &ItemId) -> Option<RunLease> {
        let mut entries = self.entries();
        let entry = entries.entry(id.clone()).or_insert_with(|| RegistryEntry {
            state: WorkflowState::Idle,
            in_flight: false,
            updated_at: chrono::Utc::now().to_rfc3339(),
        });
        if entry.in_flight {
            return None;
        }
        if entry.state != WorkflowState::Idle && !entry.state.is_terminal() {
            debug!("{id}: resetting abandoned state {}", entry.state);
            entry.state = WorkflowState::Idle;
            entry.updated_at = chrono::Utc::now().to_rfc3339();
        }
        entry.in_flight = true;
        debug!("{id}: lease taken");
        Some(RunLease {
            registry: Arc::clone(self),
            id: id.clone(),
        })
    }

    /// Current state; `Idle` for items that never ran.
    pub fn state(&self, id: &str) -> WorkflowState {
        self.entries()
            .get(id)
            .map_or(WorkflowState::Idle, |e| e.state.clone())
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.entries().get(id).is_some_and(|e| e.in_flight)
    }

    pub fn in_flight(&self) -> usize {
        self.entries().values().filter(|e| e.in_flight).count()
    }

    /// All entries in id order.
    pub fn snapshot(&self) -> Vec<(ItemId, RegistryEntry)> {
        self.entries()
            .iter()
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect()
    }

    fn set_state(&self, id: &ItemId, state: WorkflowState) {
        if let Some(entry) = self.entries().get_mut(id) {
            entry.state = state;
            entry.updated_at = chrono::Utc::now().to_rfc3339();
        }
    }

    fn release(&self, id: &ItemId) {
        if let Some(entry) = self.entries().get_mut(id) {
            entry.in_flight = false;
        }
        debug!("{id}: lease released");
    }
}

/// Exclusive right to advance one item's state. Released on drop.
pub struct RunLease {
    registry: Arc<WorkflowRegistry>,
    id: ItemId,
}

impl RunLease {
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn state(&self) -> WorkflowState {
        self.registry.state(&self.id)
    }

    pub(crate) fn set_state(&self, state: WorkflowState) {
        self.registry.set_state(&self.id, state);
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
