//! Grid state stores.
//!
//! A store holds the authoritative location layout and grid data for one census board. All
//! mutations are whole-document replacements committed under the store's lock: there is no
//! per-element merge, and the last writer wins.
//!
//! - [`MemoryGridStore`]: in-process store, used by tests and as the REST server's cache.
//! - [`LocalGridStore`]: local persistence fallback, one JSON document under a fixed key.

pub mod local;
pub mod memory;

pub use local::LocalGridStore;
pub use memory::MemoryGridStore;

use crate::census::Census;
use crate::model::{GridDataElement, GridSettings};
use crate::{GridError, GridResult};
use chrono::{DateTime, Utc};
use grid_uuid::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;
use utoipa::ToSchema;

/// Snapshot of a grid as seen by readers and subscribers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub location_layout: Vec<String>,
    pub grid_data: Vec<GridDataElement>,
    pub census: Census,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GridSettings>,
    /// Time of the last successful commit; `None` for a store that was never written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl GridState {
    pub fn element(&self, location: &str) -> Option<&GridDataElement> {
        self.grid_data.iter().find(|e| e.location == location)
    }
}

/// One whole-document replacement.
#[derive(Clone, Debug, Default)]
pub struct GridUpdate {
    pub grid_data: Vec<GridDataElement>,
    /// Replaces the layout when present; otherwise the current layout is kept.
    pub location_layout: Option<Vec<String>>,
    /// Replaces the settings when present; otherwise the current settings are kept.
    pub settings: Option<GridSettings>,
}

/// The operations every grid store provides.
pub trait GridStore: Send + Sync {
    /// Returns the current snapshot.
    fn read(&self) -> GridResult<GridState>;

    /// Returns a receiver that observes every committed snapshot.
    fn subscribe(&self) -> watch::Receiver<GridState>;

    /// Applies `change` in one transaction and returns the committed grid data.
    ///
    /// Elements with a blank `id` are issued a fresh one; any other id must already be
    /// canonical. Every element must sit at a location in the resulting layout.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DuplicateLocation`] if the layout or the grid data repeats a
    /// location, [`GridError::UnknownLocation`] for an element outside the layout,
    /// [`GridError::InvalidInput`] for a blank layout entry, [`GridError::Uuid`] for a
    /// malformed id, or a storage error if the commit cannot be written. On error the store
    /// is unchanged.
    fn commit(&self, change: GridUpdate) -> GridResult<Vec<GridDataElement>>;

    /// Replaces the grid data, and the layout when given, keeping the current settings.
    fn update(
        &self,
        grid_data: Vec<GridDataElement>,
        location_layout: Option<Vec<String>>,
    ) -> GridResult<Vec<GridDataElement>> {
        self.commit(GridUpdate {
            grid_data,
            location_layout,
            settings: None,
        })
    }
}

/// Builds the next snapshot for a commit, enforcing store invariants.
pub(crate) fn prepare_commit(current: &GridState, change: GridUpdate) -> GridResult<GridState> {
    let GridUpdate {
        mut grid_data,
        location_layout,
        settings,
    } = change;
    let location_layout = location_layout.unwrap_or_else(|| current.location_layout.clone());

    if location_layout.iter().any(|l| l.trim().is_empty()) {
        return Err(GridError::InvalidInput(
            "location layout cannot contain a blank location".into(),
        ));
    }
    ensure_unique(location_layout.iter().map(String::as_str))?;
    ensure_unique(grid_data.iter().map(|e| e.location.as_str()))?;

    let in_layout: HashSet<&str> = location_layout.iter().map(String::as_str).collect();
    if let Some(orphan) = grid_data
        .iter()
        .find(|e| !in_layout.contains(e.location.as_str()))
    {
        return Err(GridError::UnknownLocation(orphan.location.clone()));
    }

    for element in &mut grid_data {
        if element.id.trim().is_empty() {
            element.id = ElementId::new().to_string();
        } else {
            ElementId::parse(&element.id)?;
        }
    }

    let census = Census::compute(&location_layout, &grid_data);
    Ok(GridState {
        location_layout,
        grid_data,
        census,
        settings: settings.or_else(|| current.settings.clone()),
        updated_at: Some(Utc::now()),
    })
}

fn ensure_unique<'a>(locations: impl Iterator<Item = &'a str>) -> GridResult<()> {
    let mut seen = HashSet::new();
    for location in locations {
        if !seen.insert(location) {
            return Err(GridError::DuplicateLocation(location.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEPT_ID: &str = "550e8400e29b41d4a716446655440000";

    fn layout(locations: &[&str]) -> Vec<String> {
        locations.iter().map(|s| s.to_string()).collect()
    }

    fn change(grid_data: Vec<GridDataElement>, locations: &[&str]) -> GridUpdate {
        GridUpdate {
            grid_data,
            location_layout: Some(layout(locations)),
            settings: None,
        }
    }

    #[test]
    fn issues_ids_only_to_blank_elements() {
        let grid = vec![
            GridDataElement::blank("", "1"),
            GridDataElement::blank(KEPT_ID, "2"),
        ];
        let next = prepare_commit(&GridState::default(), change(grid, &["1", "2"])).unwrap();
        assert!(ElementId::is_canonical(&next.grid_data[0].id));
        assert_eq!(next.grid_data[1].id, KEPT_ID);
        assert!(next.updated_at.is_some());
        assert_eq!(next.census.total, 2);
    }

    #[test]
    fn keeps_current_layout_when_none_given() {
        let current = GridState {
            location_layout: layout(&["1"]),
            ..GridState::default()
        };
        let next = prepare_commit(&current, GridUpdate::default()).unwrap();
        assert_eq!(next.location_layout, layout(&["1"]));
    }

    #[test]
    fn rejects_duplicate_locations() {
        let err = prepare_commit(&GridState::default(), change(vec![], &["1", "1"]))
            .expect_err("duplicate layout");
        assert!(matches!(err, GridError::DuplicateLocation(l) if l == "1"));

        let grid = vec![GridDataElement::blank("", "3"), GridDataElement::blank("", "3")];
        let err = prepare_commit(&GridState::default(), change(grid, &["3"]))
            .expect_err("duplicate data");
        assert!(matches!(err, GridError::DuplicateLocation(l) if l == "3"));
    }

    #[test]
    fn rejects_blank_layout_entries() {
        let err = prepare_commit(&GridState::default(), change(vec![], &[" "]))
            .expect_err("blank layout entry");
        assert!(matches!(err, GridError::InvalidInput(_)));
    }

    #[test]
    fn rejects_elements_outside_the_layout() {
        let patient = |location: &str| GridDataElement {
            last_name: "Doe".into(),
            ..GridDataElement::blank("", location)
        };

        for location in ["", "7"] {
            let grid = vec![GridDataElement::blank("", "1"), patient(location)];
            let err = prepare_commit(&GridState::default(), change(grid, &["1"]))
                .expect_err("element outside the layout");
            assert!(matches!(err, GridError::UnknownLocation(l) if l == location));
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        let grid = vec![GridDataElement::blank("not-an-id", "1")];
        let err = prepare_commit(&GridState::default(), change(grid, &["1"]))
            .expect_err("malformed id");
        assert!(matches!(err, GridError::Uuid(_)));
    }

    #[test]
    fn settings_are_kept_unless_replaced() {
        let ward = GridSettings {
            title: "Ward 7".into(),
            export_file_name: "ward7".into(),
        };
        let current = GridState {
            settings: Some(ward.clone()),
            ..GridState::default()
        };
        let next = prepare_commit(&current, GridUpdate::default()).unwrap();
        assert_eq!(next.settings, Some(ward));

        let icu = GridSettings {
            title: "ICU".into(),
            ..GridSettings::default()
        };
        let next = prepare_commit(
            &current,
            GridUpdate {
                settings: Some(icu.clone()),
                ..GridUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(next.settings, Some(icu));
    }
}
