//! Import workflow.
//!
//! An import moves through `Empty → Loading → Pending → Confirmed`. Reading the file is the
//! only asynchronous step, and it is split from the state machine so that a consumer can go
//! away (or cancel) while the read is outstanding:
//!
//! 1. [`Importer::select_files`] moves to `Loading` and hands out an [`ImportTicket`].
//! 2. [`read_import`] reads, parses, validates and stages the file without touching the
//!    importer.
//! 3. [`Importer::complete`] applies the outcome, but only if the ticket is still current.
//!    Cancelling or detaching bumps the generation, so late results are dropped.
//!
//! The error flag is orthogonal to the state. Detailed errors and validation warnings go to the
//! log; users only ever see [`IMPORT_ERROR_MESSAGE`].

use crate::constants::IMPORT_ERROR_MESSAGE;
use crate::model::{GridDataElement, GridDocument};
use crate::stores::{GridStore, GridUpdate};
use crate::validation::validate_str;
use crate::{GridError, GridResult};
use grid_uuid::ElementId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Cleaned data waiting for the user to confirm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedImport {
    pub source: PathBuf,
    pub document: GridDocument,
    pub warnings: Vec<String>,
}

impl StagedImport {
    /// Layout implied by the staged data: non-blank locations in document order.
    pub fn location_layout(&self) -> Vec<String> {
        layout_for(&self.document.grid_data)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportState {
    Empty,
    Loading { source: PathBuf },
    Pending(StagedImport),
    Confirmed,
}

/// Proof that a read was started by a particular `select_files` call.
#[derive(Clone, Debug)]
pub struct ImportTicket {
    generation: u64,
    source: PathBuf,
}

impl ImportTicket {
    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[derive(Debug)]
pub struct Importer {
    state: ImportState,
    error: bool,
    generation: u64,
    attached: bool,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer {
    pub fn new() -> Self {
        Self {
            state: ImportState::Empty,
            error: false,
            generation: 0,
            attached: true,
        }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// The generic message to show when the error flag is set.
    pub fn user_message(&self) -> Option<&'static str> {
        self.error.then_some(IMPORT_ERROR_MESSAGE)
    }

    pub fn staged(&self) -> Option<&StagedImport> {
        match &self.state {
            ImportState::Pending(staged) => Some(staged),
            _ => None,
        }
    }

    /// Starts an import from the first selected file.
    ///
    /// Only one file is imported; any others are logged and ignored. Files without a `.json`
    /// extension are rejected and set the error flag.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NoFileSelected`] for an empty selection, or
    /// [`GridError::UnsupportedFile`] for a non-JSON file.
    pub fn select_files(&mut self, files: &[PathBuf]) -> GridResult<ImportTicket> {
        let Some(first) = files.first() else {
            return Err(GridError::NoFileSelected);
        };
        if files.len() > 1 {
            tracing::warn!(
                ignored = files.len() - 1,
                using = %first.display(),
                "multiple files selected for import; only the first is used"
            );
        }

        let is_json = first
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            tracing::error!(file = %first.display(), "import rejected: not a JSON file");
            self.state = ImportState::Empty;
            self.error = true;
            return Err(GridError::UnsupportedFile(first.display().to_string()));
        }

        self.generation += 1;
        self.state = ImportState::Loading {
            source: first.clone(),
        };
        Ok(ImportTicket {
            generation: self.generation,
            source: first.clone(),
        })
    }

    /// Applies the outcome of [`read_import`] for `ticket`.
    ///
    /// Returns `false` without changing anything if the ticket is stale or the importer has
    /// been detached.
    pub fn complete(&mut self, ticket: &ImportTicket, outcome: GridResult<StagedImport>) -> bool {
        let current = self.attached
            && ticket.generation == self.generation
            && matches!(self.state, ImportState::Loading { .. });
        if !current {
            tracing::debug!(
                file = %ticket.source.display(),
                "discarding stale import result"
            );
            return false;
        }

        match outcome {
            Ok(staged) => {
                self.state = ImportState::Pending(staged);
                self.error = false;
            }
            Err(e) => {
                tracing::error!(file = %ticket.source.display(), error = %e, "import failed");
                self.state = ImportState::Empty;
                self.error = true;
            }
        }
        true
    }

    /// Selects, reads and stages in one step.
    ///
    /// Returns `true` when data is staged and waiting for confirmation.
    pub async fn load(&mut self, files: &[PathBuf]) -> bool {
        let ticket = match self.select_files(files) {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::error!(error = %e, "import could not start");
                self.error = true;
                return false;
            }
        };
        let outcome = read_import(&ticket).await;
        self.complete(&ticket, outcome);
        matches!(self.state, ImportState::Pending(_))
    }

    /// Commits the staged data to `store`, replacing the grid and its layout.
    ///
    /// Settings carried by the document replace the stored ones; a document without settings
    /// keeps whatever the store already has.
    ///
    /// On a store failure the error is logged, the error flag is set and the staged data is
    /// kept so the user can retry or cancel.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NothingStaged`] outside the `Pending` state, or the store's error.
    pub fn confirm(&mut self, store: &dyn GridStore) -> GridResult<Vec<GridDataElement>> {
        let ImportState::Pending(staged) = &self.state else {
            return Err(GridError::NothingStaged);
        };

        let change = GridUpdate {
            grid_data: staged.document.grid_data.clone(),
            location_layout: Some(staged.location_layout()),
            settings: staged.document.settings.clone(),
        };
        match store.commit(change) {
            Ok(committed) => {
                tracing::info!(
                    file = %staged.source.display(),
                    elements = committed.len(),
                    "import committed"
                );
                self.state = ImportState::Confirmed;
                self.error = false;
                Ok(committed)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to commit import");
                self.error = true;
                Err(e)
            }
        }
    }

    /// Discards any staged data and returns to `Empty`. An outstanding read becomes stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = ImportState::Empty;
        self.error = false;
    }

    /// Marks the consumer as gone; every later [`Importer::complete`] is ignored.
    pub fn detach(&mut self) {
        self.attached = false;
        self.generation += 1;
    }
}

/// Reads the ticket's file and stages its cleaned contents.
///
/// # Errors
///
/// Returns [`GridError::FileRead`] if the file cannot be read, [`GridError::JsonParse`] if it
/// is not JSON, or [`GridError::Validation`] for a fatal validation problem.
pub async fn read_import(ticket: &ImportTicket) -> GridResult<StagedImport> {
    let text = tokio::fs::read_to_string(&ticket.source)
        .await
        .map_err(GridError::FileRead)?;
    stage_text(&ticket.source, &text)
}

/// Validates import text and issues fresh ids to every element.
///
/// Warnings are logged here and also returned in the staged import.
pub fn stage_text(source: &Path, text: &str) -> GridResult<StagedImport> {
    let validated = validate_str(text)?;
    for warning in &validated.warnings {
        tracing::warn!(file = %source.display(), "{warning}");
    }

    let mut document = validated.cleaned;
    for element in &mut document.grid_data {
        element.id = ElementId::new().to_string();
    }

    Ok(StagedImport {
        source: source.to_path_buf(),
        document,
        warnings: validated.warnings,
    })
}

/// Locations of `grid_data` in order, first occurrence only. Blank locations are skipped.
pub fn layout_for(grid_data: &[GridDataElement]) -> Vec<String> {
    let mut seen = HashSet::new();
    grid_data
        .iter()
        .map(|e| e.location.clone())
        .filter(|l| !l.trim().is_empty() && seen.insert(l.clone()))
        .collect()
}
