//! Local persistence fallback.
//!
//! When no remote store is reachable the grid is kept as a single JSON document on disk at
//! `<data_dir>/<storage_key>.json`. Writes go to a sibling temp file which is then renamed over
//! the document, so a crash mid-write leaves the previous commit intact.
//!
//! The stored document is our own format and is parsed strictly: unknown keys or wrong types
//! are reported with the path of the failing field.

use super::{prepare_commit, GridState, GridStore, GridUpdate};
use crate::census::Census;
use crate::config::CoreConfig;
use crate::model::{GridDataElement, GridSettings};
use crate::{GridError, GridResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Grid store persisted to a local JSON file.
#[derive(Debug)]
pub struct LocalGridStore {
    path: PathBuf,
    state: Mutex<GridState>,
    notifier: watch::Sender<GridState>,
}

impl LocalGridStore {
    /// Opens the store configured by `cfg`, loading any previously stored document.
    pub fn open(cfg: &CoreConfig) -> GridResult<Self> {
        Self::open_path(cfg.storage_path())
    }

    /// Opens a store backed by `path`. A missing file yields an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::FileRead`] if the file exists but cannot be read, or
    /// [`GridError::StoredDocument`] if its contents do not match the stored schema.
    pub fn open_path(path: PathBuf) -> GridResult<Self> {
        let state = match fs::read_to_string(&path) {
            Ok(text) => parse_stored(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => GridState::default(),
            Err(e) => return Err(GridError::FileRead(e)),
        };

        tracing::info!(
            path = %path.display(),
            locations = state.location_layout.len(),
            "opened local grid store"
        );

        let (notifier, _) = watch::channel(state.clone());
        Ok(Self {
            path,
            state: Mutex::new(state),
            notifier,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the stored document and resets the grid to empty.
    pub fn clear(&self) -> GridResult<()> {
        let mut state = self.lock()?;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(GridError::FileRemove(e)),
        }
        *state = GridState::default();
        self.notifier.send_replace(GridState::default());
        tracing::info!(path = %self.path.display(), "cleared local grid store");
        Ok(())
    }

    fn lock(&self) -> GridResult<MutexGuard<'_, GridState>> {
        self.state
            .lock()
            .map_err(|_| GridError::StoreUnavailable("grid state lock poisoned".into()))
    }
}

impl GridStore for LocalGridStore {
    fn read(&self) -> GridResult<GridState> {
        Ok(self.lock()?.clone())
    }

    fn subscribe(&self) -> watch::Receiver<GridState> {
        self.notifier.subscribe()
    }

    fn commit(&self, change: GridUpdate) -> GridResult<Vec<GridDataElement>> {
        let mut state = self.lock()?;
        let next = prepare_commit(&state, change)?;

        write_atomically(&self.path, &render_stored(&next)?)?;

        *state = next.clone();
        let committed = next.grid_data.clone();
        self.notifier.send_replace(next);
        tracing::debug!(
            path = %self.path.display(),
            elements = committed.len(),
            "committed grid to local store"
        );
        Ok(committed)
    }
}

/// On-disk shape of the local document. The census is derived, so it is not stored.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StoredGridWire {
    location_layout: Vec<String>,
    grid_data: Vec<GridDataElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<GridSettings>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

fn parse_stored(text: &str) -> GridResult<GridState> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let wire: StoredGridWire = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(GridError::StoredDocument(format!(
                "schema mismatch at {path}: {source}"
            )));
        }
    };

    let census = Census::compute(&wire.location_layout, &wire.grid_data);
    Ok(GridState {
        location_layout: wire.location_layout,
        grid_data: wire.grid_data,
        census,
        settings: wire.settings,
        updated_at: wire.updated_at,
    })
}

fn render_stored(state: &GridState) -> GridResult<String> {
    let wire = StoredGridWire {
        location_layout: state.location_layout.clone(),
        grid_data: state.grid_data.clone(),
        settings: state.settings.clone(),
        updated_at: state.updated_at,
    };
    serde_json::to_string_pretty(&wire).map_err(GridError::Serialization)
}

fn write_atomically(path: &Path, content: &str) -> GridResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(GridError::StorageDirCreation)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).map_err(GridError::FileWrite)?;
    fs::rename(&tmp, path).map_err(GridError::FileWrite)
}
