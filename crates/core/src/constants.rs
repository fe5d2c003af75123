//! Constants used throughout the grid core crate.

/// Default directory for the local grid document when none is configured.
pub const DEFAULT_DATA_DIR: &str = "grid_data";

/// Default storage key; the local document lives at `<data_dir>/<key>.json`.
pub const DEFAULT_STORAGE_KEY: &str = "gridMakerData";

/// Default export file name stem.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "grid";

/// Top-level key holding the grid data array in import/export documents.
pub const GRID_DATA_KEY: &str = "gridData";

/// Optional top-level key holding grid settings.
pub const SETTINGS_KEY: &str = "settings";

/// Marker written into string fields whose imported value was an object or array.
pub const ERR_MARKER: &str = "ERR";

/// The only import failure text shown to users; details go to the log.
pub const IMPORT_ERROR_MESSAGE: &str =
    "There was a problem with the file or the data is corrupted. Cancel and try a different file.";
