//! Import data validation and cleaning.
//!
//! Imported grid documents come from files people have edited by hand, exported from older
//! versions, or copied between wards. This module turns an arbitrary decoded JSON value into a
//! [`GridDocument`] whose elements all have the canonical key set and correctly typed values.
//!
//! Two classes of problem are distinguished:
//! - **Fatal** problems with the document root (not an object, empty, duplicate keys, missing
//!   or non-array `gridData`). Every fatal message is collected and returned together in a
//!   [`ValidationError`]; nothing is cleaned.
//! - **Non-fatal** anomalies inside `gridData` (wrong field types, extra keys, malformed nested
//!   sections or items). These are corrected and described in [`Validated::warnings`].
//!
//! Elements are never mutated in place. Each input element is judged once and either copied
//! into the output or dropped, so a removal can never cause a neighbour to be skipped.

use crate::constants::{ERR_MARKER, GRID_DATA_KEY, SETTINGS_KEY};
use crate::model::{ContentType, GridDataElement, GridDocument, GridSettings, Item, Section};
use crate::{GridError, GridResult};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Fatal problems with an import document, reported all at once.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join(" "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

/// A cleaned document plus a description of every correction made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validated {
    pub cleaned: GridDocument,
    pub warnings: Vec<String>,
}

/// Validates and cleans an already-decoded JSON value.
///
/// Duplicate keys cannot be detected here because the decoder has already collapsed them;
/// use [`validate_str`] when starting from text.
///
/// # Errors
///
/// Returns [`ValidationError`] if the root is not an object, is empty, lacks `gridData`, or
/// `gridData` is not an array.
pub fn validate(data: &Value) -> Result<Validated, ValidationError> {
    let root = data
        .as_object()
        .ok_or_else(|| ValidationError::single("Data is not an object."))?;
    validate_root(root, &[])
}

/// Parses JSON text, then validates and cleans it.
///
/// # Errors
///
/// Returns [`GridError::JsonParse`] if the text is not JSON, or [`GridError::Validation`] for
/// any fatal problem including duplicate top-level keys.
pub fn validate_str(text: &str) -> GridResult<Validated> {
    let value: Value = serde_json::from_str(text).map_err(GridError::JsonParse)?;
    let Some(root) = value.as_object() else {
        return Err(ValidationError::single("Data is not an object.").into());
    };

    let keys = serde_json::from_str::<TopLevelKeys>(text).map_err(GridError::JsonParse)?;
    let duplicates = keys.duplicates();

    Ok(validate_root(root, &duplicates)?)
}

fn validate_root(
    root: &Map<String, Value>,
    duplicate_keys: &[String],
) -> Result<Validated, ValidationError> {
    let mut fatal = Vec::new();

    if root.is_empty() {
        fatal.push("Data is an empty object.".to_string());
    }
    if !duplicate_keys.is_empty() {
        fatal.push(format!(
            "Data contains duplicate keys: {}.",
            duplicate_keys.join(", ")
        ));
    }

    let grid_data = match root.get(GRID_DATA_KEY) {
        None => {
            fatal.push("The gridData property is required.".to_string());
            None
        }
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            fatal.push("The gridData property should be an array.".to_string());
            None
        }
    };

    let grid_data = match grid_data {
        Some(items) if fatal.is_empty() => items,
        _ => return Err(ValidationError { messages: fatal }),
    };

    let mut warnings = Vec::new();
    if grid_data.is_empty() {
        warnings.push("gridData is an empty array.".to_string());
    }

    let cleaned_elements = grid_data
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| clean_element(index, raw, &mut warnings))
        .collect();

    let settings = clean_settings(root.get(SETTINGS_KEY), &mut warnings);

    Ok(Validated {
        cleaned: GridDocument {
            grid_data: cleaned_elements,
            settings,
        },
        warnings,
    })
}

/// Cleans one `gridData` entry, or drops it with a warning.
///
/// Any key-set mismatch is reported, with one exception: a missing `id` is not. Exports never
/// carry ids, so re-importing an export stays warning-free. An entry whose `location` is blank
/// is dropped, because no layout slot could ever show it.
fn clean_element(index: usize, raw: &Value, warnings: &mut Vec<String>) -> Option<GridDataElement> {
    let path = format!("gridData[{index}]");

    let Some(obj) = raw.as_object() else {
        warnings.push(format!("{path} is not an object and was removed."));
        return None;
    };
    if obj.is_empty() {
        warnings.push(format!("{path} is an empty object and was removed."));
        return None;
    }

    let unexpected: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !GridDataElement::CANONICAL_KEYS.contains(k))
        .collect();
    let missing: Vec<&str> = GridDataElement::CANONICAL_KEYS
        .iter()
        .copied()
        .filter(|k| *k != "id" && !obj.contains_key(*k))
        .collect();
    if !unexpected.is_empty() || !missing.is_empty() {
        warnings.push(format!(
            "{path} does not have the expected keys (unexpected: [{}], missing: [{}]); \
             unexpected keys were removed and missing keys set to defaults.",
            unexpected.join(", "),
            missing.join(", ")
        ));
    }

    // Identifiers are reissued by the store; any incoming id is discarded.
    let mut element = GridDataElement {
        id: String::new(),
        location: string_field(obj, &path, "location", warnings),
        last_name: string_field(obj, &path, "lastName", warnings),
        first_name: string_field(obj, &path, "firstName", warnings),
        team: string_field(obj, &path, "team", warnings),
        summary: string_field(obj, &path, "summary", warnings),
        simple_content: string_field(obj, &path, "simpleContent", warnings),
        bottom_text: string_field(obj, &path, "bottomText", warnings),
        ..GridDataElement::default()
    };
    if element.location.trim().is_empty() {
        warnings.push(format!("{path} has no location and was removed."));
        return None;
    }

    if obj.contains_key("contentType") {
        let raw_type = string_field(obj, &path, "contentType", warnings);
        element.content_type = ContentType::parse(&raw_type).unwrap_or_else(|| {
            warnings.push(format!(
                "{path}.contentType {raw_type:?} is not \"simple\" or \"nested\"; set to \"simple\"."
            ));
            ContentType::Simple
        });
    }

    element.contingencies = match obj.get("contingencies") {
        None => Vec::new(),
        Some(Value::Array(tags)) => tags
            .iter()
            .enumerate()
            .map(|(i, tag)| match tag {
                Value::String(s) => s.clone(),
                other => {
                    warnings.push(format!(
                        "{path}.contingencies[{i}] should be a string and was converted."
                    ));
                    scalar_to_string(other)
                }
            })
            .collect(),
        Some(_) => {
            warnings.push(format!(
                "{path}.contingencies should be an array; set to an empty array."
            ));
            Vec::new()
        }
    };

    element.nested_content = match obj.get("nestedContent") {
        None => Vec::new(),
        Some(Value::Array(sections)) => sections
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| clean_section(&format!("{path}.nestedContent[{i}]"), raw, warnings))
            .collect(),
        Some(_) => {
            warnings.push(format!(
                "{path}.nestedContent should be an array; set to an empty array."
            ));
            Vec::new()
        }
    };

    Some(element)
}

fn clean_section(path: &str, raw: &Value, warnings: &mut Vec<String>) -> Option<Section> {
    let Some(obj) = raw.as_object() else {
        warnings.push(format!("{path} is not an object and was removed."));
        return None;
    };
    if !has_id(obj) {
        warnings.push(format!("{path} is missing an id and was removed."));
        return None;
    }

    let items = match obj.get("items") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| clean_item(&format!("{path}.items[{i}]"), raw, warnings))
            .collect(),
        Some(_) => {
            warnings.push(format!("{path}.items should be an array; set to an empty array."));
            Vec::new()
        }
    };

    Some(Section {
        id: coerce_string(obj.get("id"), &format!("{path}.id"), warnings),
        title: coerce_string(obj.get("title"), &format!("{path}.title"), warnings),
        top: coerce_string(obj.get("top"), &format!("{path}.top"), warnings),
        items,
    })
}

fn clean_item(path: &str, raw: &Value, warnings: &mut Vec<String>) -> Option<Item> {
    let Some(obj) = raw.as_object() else {
        warnings.push(format!("{path} is not an object and was removed."));
        return None;
    };
    if !has_id(obj) {
        warnings.push(format!("{path} is missing an id and was removed."));
        return None;
    }

    let value = obj.get("value").or_else(|| obj.get("content"));
    Some(Item {
        id: coerce_string(obj.get("id"), &format!("{path}.id"), warnings),
        value: coerce_string(value, &format!("{path}.value"), warnings),
    })
}

fn clean_settings(raw: Option<&Value>, warnings: &mut Vec<String>) -> Option<GridSettings> {
    match raw {
        None | Some(Value::Null) => None,
        Some(value) => match GridSettings::deserialize(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warnings.push(format!("settings could not be read and were ignored: {e}"));
                None
            }
        },
    }
}

fn string_field(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    warnings: &mut Vec<String>,
) -> String {
    coerce_string(obj.get(key), &format!("{path}.{key}"), warnings)
}

/// Absent, null and blank ids all count as missing.
fn has_id(obj: &Map<String, Value>) -> bool {
    match obj.get("id") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn coerce_string(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other @ (Value::Object(_) | Value::Array(_))) => {
            warnings.push(format!("{path} should be a string."));
            warnings.push(format!(
                "{path} is an {} and cannot be converted to a string; set to \"{ERR_MARKER}\".",
                if other.is_array() { "array" } else { "object" }
            ));
            ERR_MARKER.to_string()
        }
        Some(other) => {
            warnings.push(format!("{path} should be a string and was converted."));
            scalar_to_string(other)
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        // `2.0` reads as the integer it denotes.
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::Object(_) | Value::Array(_) => ERR_MARKER.to_string(),
    }
}

/// The top-level keys of a JSON object in document order, duplicates included.
struct TopLevelKeys(Vec<String>);

impl TopLevelKeys {
    fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.0
            .iter()
            .filter(|k| !seen.insert(k.as_str()) && reported.insert(k.as_str()))
            .cloned()
            .collect()
    }
}

impl<'de> Deserialize<'de> for TopLevelKeys {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = TopLevelKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut keys = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    map.next_value::<IgnoredAny>()?;
                    keys.push(key);
                }
                Ok(TopLevelKeys(keys))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}
