//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup (from environment values or CLI flags)
//! and then passed into services by reference. Nothing in the core reads the environment
//! while handling a request.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_EXPORT_FILE_NAME, DEFAULT_STORAGE_KEY};
use crate::{GridError, GridResult};
use grid_types::ExportFileName;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    storage_key: String,
    export_file_name: ExportFileName,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidInput`] if the storage key is not safe to use as a file stem,
    /// or [`GridError::Text`] if the export file name is blank or contains path separators.
    pub fn new(
        data_dir: PathBuf,
        storage_key: String,
        export_file_name: &str,
    ) -> GridResult<Self> {
        validate_storage_key(&storage_key)?;
        let export_file_name = ExportFileName::new(export_file_name)?;

        Ok(Self {
            data_dir,
            storage_key,
            export_file_name,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Path of the locally persisted grid document.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.storage_key))
    }

    pub fn export_file_name(&self) -> &ExportFileName {
        &self.export_file_name
    }
}

/// Resolve the data directory from an optional environment value, falling back to the default.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse the storage key from an optional environment value, falling back to the default.
pub fn storage_key_from_env_value(value: Option<String>) -> GridResult<String> {
    let key = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
    validate_storage_key(&key)?;
    Ok(key)
}

/// Parse the export file name from an optional environment value, falling back to the default.
pub fn export_file_name_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_string())
}

/// Validates that a storage key is safe to use as a file stem.
///
/// Keys are bounded in length and restricted to ASCII alphanumerics plus `.`, `-` and `_`,
/// and may not start with a dot.
pub fn validate_storage_key(key: &str) -> GridResult<()> {
    const MAX_KEY_LEN: usize = 128;

    if key.trim().is_empty() {
        return Err(GridError::InvalidInput("storage key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(GridError::InvalidInput(format!(
            "storage key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        )));
    }

    if key.starts_with('.') {
        return Err(GridError::InvalidInput(
            "storage key cannot start with '.'".into(),
        ));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(GridError::InvalidInput(
            "storage key contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}
