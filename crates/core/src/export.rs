//! Grid export.
//!
//! Exported documents are meant to be diffed by people, so output is deterministic: elements
//! are ordered by location with numeric-aware comparison, keys appear in canonical order and
//! JSON is indented with two spaces. Internal identifiers are never written.

use crate::model::{ContentType, GridDataElement, GridSettings, Section};
use crate::{GridError, GridResult};
use grid_types::ExportFileName;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Serialises elements to canonical export JSON (`{"gridData": [...]}`).
pub fn serialize(elements: &[GridDataElement]) -> GridResult<String> {
    serialize_document(elements, None)
}

/// Serialises elements, plus settings when given, to canonical export JSON.
///
/// # Errors
///
/// Returns [`GridError::Serialization`] if serde_json fails to render the document.
pub fn serialize_document(
    elements: &[GridDataElement],
    settings: Option<&GridSettings>,
) -> GridResult<String> {
    let mut sorted: Vec<&GridDataElement> = elements.iter().collect();
    sorted.sort_by(|a, b| natural_cmp(&a.location, &b.location));

    let document = ExportDocument {
        grid_data: sorted.into_iter().map(ExportedElement::from).collect(),
        settings,
    };

    serde_json::to_string_pretty(&document).map_err(GridError::Serialization)
}

/// Picks the elements whose location is in `locations`, keeping their original order.
pub fn select(elements: &[GridDataElement], locations: &[String]) -> Vec<GridDataElement> {
    let wanted: HashSet<&str> = locations.iter().map(String::as_str).collect();
    elements
        .iter()
        .filter(|e| wanted.contains(e.location.as_str()))
        .cloned()
        .collect()
}

/// The export file name configured in settings, falling back to `fallback`.
pub fn export_file_name(settings: Option<&GridSettings>, fallback: &ExportFileName) -> ExportFileName {
    settings
        .and_then(|s| ExportFileName::new(&s.export_file_name).ok())
        .unwrap_or_else(|| fallback.clone())
}

/// Compares two location keys so that embedded numbers sort by value.
///
/// Digit runs compare numerically ("2" < "10"), other runs compare case-insensitively, and
/// digits sort before letters. Remaining ties fall back to a plain string comparison so the
/// ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (a, b);
    loop {
        match (next_chunk(left), next_chunk(right)) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((x, left_rest)), Some((y, right_rest))) => {
                let ord = compare_chunks(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
                left = left_rest;
                right = right_rest;
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn next_chunk(s: &str) -> Option<(Chunk<'_>, &str)> {
    let first = s.chars().next()?;
    let digits = first.is_ascii_digit();
    let end = s
        .find(|c: char| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    let (head, tail) = s.split_at(end);
    let chunk = if digits {
        Chunk::Digits(head)
    } else {
        Chunk::Text(head)
    };
    Some((chunk, tail))
}

fn compare_chunks(x: Chunk<'_>, y: Chunk<'_>) -> Ordering {
    match (x, y) {
        (Chunk::Digits(x), Chunk::Digits(y)) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Chunk::Text(x), Chunk::Text(y)) => x
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(y.chars().flat_map(char::to_lowercase)),
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    grid_data: Vec<ExportedElement<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a GridSettings>,
}

/// Borrowed view of an element without its `id`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedElement<'a> {
    location: &'a str,
    last_name: &'a str,
    first_name: &'a str,
    team: &'a str,
    summary: &'a str,
    content_type: ContentType,
    simple_content: &'a str,
    nested_content: &'a [Section],
    bottom_text: &'a str,
    contingencies: &'a [String],
}

impl<'a> From<&'a GridDataElement> for ExportedElement<'a> {
    fn from(e: &'a GridDataElement) -> Self {
        Self {
            location: &e.location,
            last_name: &e.last_name,
            first_name: &e.first_name,
            team: &e.team,
            summary: &e.summary,
            content_type: e.content_type,
            simple_content: &e.simple_content,
            nested_content: &e.nested_content,
            bottom_text: &e.bottom_text,
            contingencies: &e.contingencies,
        }
    }
}
