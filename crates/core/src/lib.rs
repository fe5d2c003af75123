//! # Grid Core
//!
//! Core data logic for the census grid maker.
//!
//! This crate contains pure data operations and local persistence:
//! - The grid data model and its import/export envelope
//! - Import validation and cleaning, and canonical export
//! - The import workflow from file selection to confirmed commit
//! - Grid stores (in-memory and a local JSON fallback) with change subscription
//! - Layout editing with confirmation of destructive actions, and draft autosave
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod census;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod export;
pub mod importer;
pub mod model;
pub mod session;
pub mod stores;
pub mod validation;

pub use census::Census;
pub use config::CoreConfig;
pub use error::{GridError, GridResult};
pub use importer::{ImportState, Importer, StagedImport};
pub use model::{ContentType, GridDataElement, GridDocument, GridSettings, Item, Section};
pub use session::{AlwaysConfirm, Confirm, GridSession};
pub use stores::{GridState, GridStore, GridUpdate, LocalGridStore, MemoryGridStore};
pub use validation::{validate, validate_str, Validated, ValidationError};
