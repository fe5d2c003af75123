//! In-process grid store.

use super::{prepare_commit, GridState, GridStore, GridUpdate};
use crate::model::GridDataElement;
use crate::{GridError, GridResult};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Grid store held entirely in memory.
#[derive(Debug)]
pub struct MemoryGridStore {
    state: Mutex<GridState>,
    notifier: watch::Sender<GridState>,
}

impl Default for MemoryGridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGridStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(GridState::default());
        Self {
            state: Mutex::new(GridState::default()),
            notifier,
        }
    }

    /// Creates a store seeded with a layout and grid data.
    pub fn with_grid(
        location_layout: Vec<String>,
        grid_data: Vec<GridDataElement>,
    ) -> GridResult<Self> {
        let store = Self::new();
        store.update(grid_data, Some(location_layout))?;
        Ok(store)
    }

    fn lock(&self) -> GridResult<MutexGuard<'_, GridState>> {
        self.state
            .lock()
            .map_err(|_| GridError::StoreUnavailable("grid state lock poisoned".into()))
    }
}

impl GridStore for MemoryGridStore {
    fn read(&self) -> GridResult<GridState> {
        Ok(self.lock()?.clone())
    }

    fn subscribe(&self) -> watch::Receiver<GridState> {
        self.notifier.subscribe()
    }

    fn commit(&self, change: GridUpdate) -> GridResult<Vec<GridDataElement>> {
        let mut state = self.lock()?;
        let next = prepare_commit(&state, change)?;
        *state = next.clone();
        let committed = next.grid_data.clone();
        self.notifier.send_replace(next);
        tracing::debug!(elements = committed.len(), "committed grid to memory store");
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_whole_grid() {
        let store = MemoryGridStore::with_grid(
            vec!["1".into(), "2".into()],
            vec![GridDataElement::blank("", "1"), GridDataElement::blank("", "2")],
        )
        .unwrap();

        let committed = store
            .update(vec![GridDataElement::blank("", "2")], None)
            .unwrap();
        assert_eq!(committed.len(), 1);

        let state = store.read().unwrap();
        assert_eq!(state.grid_data, committed);
        assert_eq!(state.location_layout, vec!["1", "2"]);
    }

    #[test]
    fn failed_update_leaves_state_unchanged() {
        let store =
            MemoryGridStore::with_grid(vec!["1".into()], vec![GridDataElement::blank("", "1")])
                .unwrap();
        let before = store.read().unwrap();

        let err = store
            .update(vec![], Some(vec!["1".into(), "1".into()]))
            .expect_err("duplicate layout");
        assert!(matches!(err, GridError::DuplicateLocation(_)));
        assert_eq!(store.read().unwrap(), before);
    }

    #[test]
    fn subscribers_observe_commits() {
        let store = MemoryGridStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store
            .update(vec![GridDataElement::blank("", "5")], Some(vec!["5".into()]))
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.location_layout, vec!["5"]);
        assert_eq!(seen.census.total, 1);
    }
}
