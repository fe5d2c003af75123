//! Validated text types shared across the grid crates.
//!
//! Location keys and export file names arrive from users (CLI flags, REST bodies, form input)
//! and must be checked once at the boundary. After construction the wrapped value can be used
//! without re-checking.

/// Why a piece of user text was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// Nothing but whitespace
    #[error("text cannot be empty")]
    Empty,
    /// A character that cannot appear in this kind of name
    #[error("text contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Trimmed text with at least one visible character.
///
/// Location keys go through this type so a blank location can never enter a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input`, failing with [`TextError::Empty`] if nothing is left.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Request bodies deserialise straight into a checked location.
impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A user-configurable export file name, always ending in `.json`.
///
/// The stem is trimmed and must not contain path separators or control characters, so the
/// value is safe to join onto an output directory. A trailing `.json` on the input is not
/// doubled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFileName(String);

impl ExportFileName {
    pub const EXTENSION: &'static str = ".json";

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        let stem = trimmed.strip_suffix(Self::EXTENSION).unwrap_or(trimmed).trim();
        if stem.is_empty() {
            return Err(TextError::Empty);
        }
        if let Some(bad) = stem
            .chars()
            .find(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
        {
            return Err(TextError::InvalidCharacter(bad));
        }
        Ok(Self(format!("{stem}{}", Self::EXTENSION)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without the `.json` suffix.
    pub fn stem(&self) -> &str {
        &self.0[..self.0.len() - Self::EXTENSION.len()]
    }
}

impl std::fmt::Display for ExportFileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExportFileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
