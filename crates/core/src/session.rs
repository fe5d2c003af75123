//! Layout editing for one census board.
//!
//! A [`GridSession`] is the explicit handle a front end holds: a reference to the grid store
//! plus the currently selected location. Every mutation reads the current snapshot, builds the
//! replacement arrays and commits them in one `update` call.
//!
//! Destructive actions (removing, renaming or clearing a location, overwriting a filled slot,
//! wiping local storage) ask a [`Confirm`] implementation first. Declining returns `Ok(false)`
//! and leaves the store and the selection untouched.

use crate::model::GridDataElement;
use crate::stores::{GridState, GridStore, LocalGridStore};
use crate::{GridError, GridResult};
use grid_types::NonEmptyText;
use std::sync::Arc;

/// Answers a yes/no prompt before a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Accepts every prompt. Used where the request itself is the confirmation.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

pub struct GridSession {
    store: Arc<dyn GridStore>,
    selected: Option<String>,
}

impl GridSession {
    pub fn new(store: Arc<dyn GridStore>) -> Self {
        Self {
            store,
            selected: None,
        }
    }

    pub fn store(&self) -> &Arc<dyn GridStore> {
        &self.store
    }

    pub fn state(&self) -> GridResult<GridState> {
        self.store.read()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects a location for editing.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownLocation`] if the location is not in the layout.
    pub fn select(&mut self, location: &str) -> GridResult<()> {
        let state = self.store.read()?;
        if !state.location_layout.iter().any(|l| l == location) {
            return Err(GridError::UnknownLocation(location.to_string()));
        }
        self.selected = Some(location.to_string());
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Appends a location to the layout with a blank element.
    ///
    /// Returns the committed element, carrying its freshly issued id.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Text`] for a blank name or [`GridError::DuplicateLocation`] if the
    /// location already exists.
    pub fn add_location(&mut self, name: &str) -> GridResult<GridDataElement> {
        let location = NonEmptyText::new(name)?.into_string();
        let GridState {
            mut location_layout,
            mut grid_data,
            ..
        } = self.store.read()?;

        if location_layout.contains(&location) {
            return Err(GridError::DuplicateLocation(location));
        }
        location_layout.push(location.clone());
        replace_slot(&mut grid_data, GridDataElement::blank("", location.as_str()));

        let committed = self.commit(grid_data, Some(location_layout))?;
        tracing::info!(%location, "added location");
        committed
            .into_iter()
            .find(|e| e.location == location)
            .ok_or(GridError::UnknownLocation(location))
    }

    /// Removes a location and its element.
    pub fn remove_location(&mut self, name: &str, confirm: &mut dyn Confirm) -> GridResult<bool> {
        let GridState {
            mut location_layout,
            mut grid_data,
            ..
        } = self.store.read()?;
        ensure_in_layout(&location_layout, name)?;

        if !confirm.confirm(&format!(
            "Remove location {name}? Any data it holds will be lost."
        )) {
            return Ok(false);
        }

        location_layout.retain(|l| l != name);
        grid_data.retain(|e| e.location != name);
        self.commit(grid_data, Some(location_layout))?;

        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        tracing::info!(location = name, "removed location");
        Ok(true)
    }

    /// Renames a location in place.
    ///
    /// The row at the old location is replaced by a fresh blank shell at the new one; the old
    /// data is not carried over.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownLocation`] for an unknown `old`, [`GridError::Text`] for a
    /// blank `new`, or [`GridError::DuplicateLocation`] if `new` is already in the layout.
    pub fn rename_location(
        &mut self,
        old: &str,
        new: &str,
        confirm: &mut dyn Confirm,
    ) -> GridResult<bool> {
        let new = NonEmptyText::new(new)?.into_string();
        let GridState {
            mut location_layout,
            mut grid_data,
            ..
        } = self.store.read()?;
        let index = ensure_in_layout(&location_layout, old)?;

        if new == old {
            return Ok(true);
        }
        if location_layout.contains(&new) {
            return Err(GridError::DuplicateLocation(new));
        }

        if !confirm.confirm(&format!(
            "Change location {old} to {new}? The data held at {old} will be cleared."
        )) {
            return Ok(false);
        }

        location_layout[index] = new.clone();
        let shell = GridDataElement::blank("", new.as_str());
        match grid_data.iter().position(|e| e.location == old) {
            Some(row) => grid_data[row] = shell,
            None => grid_data.push(shell),
        }
        self.commit(grid_data, Some(location_layout))?;

        if self.selected.as_deref() == Some(old) {
            self.selected = Some(new.clone());
        }
        tracing::info!(from = old, to = %new, "renamed location");
        Ok(true)
    }

    /// Resets a location's element to its blank shell, keeping its id.
    pub fn clear_location(&mut self, name: &str, confirm: &mut dyn Confirm) -> GridResult<bool> {
        let GridState {
            location_layout,
            mut grid_data,
            ..
        } = self.store.read()?;
        ensure_in_layout(&location_layout, name)?;

        if !confirm.confirm(&format!("Clear all data held at location {name}?")) {
            return Ok(false);
        }

        let id = grid_data
            .iter()
            .find(|e| e.location == name)
            .map(|e| e.id.clone())
            .unwrap_or_default();
        replace_slot(&mut grid_data, GridDataElement::blank(id, name));
        self.commit(grid_data, None)?;
        tracing::info!(location = name, "cleared location");
        Ok(true)
    }

    /// Replaces the slot for `element.location` with `element`.
    ///
    /// Overwriting a filled slot with different content asks for confirmation. The slot keeps
    /// its existing id when `element` carries none.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownLocation`] if the element's location is not in the layout.
    pub fn save_element(
        &mut self,
        mut element: GridDataElement,
        confirm: &mut dyn Confirm,
    ) -> GridResult<bool> {
        let GridState {
            location_layout,
            mut grid_data,
            ..
        } = self.store.read()?;
        ensure_in_layout(&location_layout, &element.location)?;

        if let Some(existing) = grid_data.iter().find(|e| e.location == element.location) {
            if existing.is_filled()
                && !existing.same_content(&element)
                && !confirm.confirm(&format!(
                    "Location {} already holds data. Overwrite it?",
                    element.location
                ))
            {
                return Ok(false);
            }
            if element.id.trim().is_empty() {
                element.id = existing.id.clone();
            }
        }

        let location = element.location.clone();
        replace_slot(&mut grid_data, element);
        self.commit(grid_data, None)?;
        tracing::debug!(%location, "saved element");
        Ok(true)
    }

    /// Deletes the local persisted grid.
    pub fn clear_local_storage(
        &mut self,
        local: &LocalGridStore,
        confirm: &mut dyn Confirm,
    ) -> GridResult<bool> {
        if !confirm.confirm("Clear all locally stored grid data? This cannot be undone.") {
            return Ok(false);
        }
        local.clear()?;
        self.selected = None;
        Ok(true)
    }

    fn commit(
        &mut self,
        grid_data: Vec<GridDataElement>,
        location_layout: Option<Vec<String>>,
    ) -> GridResult<Vec<GridDataElement>> {
        self.store
            .update(grid_data, location_layout)
            .inspect_err(|e| {
                tracing::error!(error = %e, "grid store update failed; clearing selection");
                self.selected = None;
            })
    }
}

fn ensure_in_layout(location_layout: &[String], location: &str) -> GridResult<usize> {
    location_layout
        .iter()
        .position(|l| l == location)
        .ok_or_else(|| GridError::UnknownLocation(location.to_string()))
}

/// Replaces the element at `element.location`, or appends it if the slot has none.
fn replace_slot(grid_data: &mut Vec<GridDataElement>, element: GridDataElement) {
    match grid_data.iter_mut().find(|e| e.location == element.location) {
        Some(slot) => *slot = element,
        None => grid_data.push(element),
    }
}
