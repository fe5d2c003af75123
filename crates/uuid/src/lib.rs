//! Element identifier utilities.
//!
//! Every grid data element carries an opaque identifier issued when the element is first
//! persisted. Identifiers arriving in imported files are never trusted; the store hands out a
//! fresh one instead.
//!
//! To keep identifiers comparable across stores and exports, the grid uses a *canonical*
//! representation: **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! Stores check every non-blank identifier they commit with [`ElementId::parse`].

mod service;

pub use service::ElementId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
