use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("import validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to parse JSON: {0}")]
    JsonParse(serde_json::Error),
    #[error("failed to serialize grid: {0}")]
    Serialization(serde_json::Error),
    #[error("stored grid document is invalid: {0}")]
    StoredDocument(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read grid file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write grid file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to remove grid file: {0}")]
    FileRemove(std::io::Error),
    #[error("grid store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("duplicate location: {0}")]
    DuplicateLocation(String),
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    #[error("no file selected")]
    NoFileSelected,
    #[error("unsupported import file (expected .json): {0}")]
    UnsupportedFile(String),
    #[error("no import is pending confirmation")]
    NothingStaged,

    #[error("invalid text: {0}")]
    Text(#[from] grid_types::TextError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] grid_uuid::UuidError),
}

pub type GridResult<T> = std::result::Result<T, GridError>;
