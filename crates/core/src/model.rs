//! Grid data model.
//!
//! These are the shapes stored by the grid store and exchanged in import/export documents.
//! Wire names are camelCase; every field has a default so a partially filled element can be
//! deserialised and re-serialised with the full canonical key set.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which of `simpleContent` / `nestedContent` is authoritative for an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Simple,
    Nested,
}

impl ContentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(Self::Simple),
            "nested" => Some(Self::Nested),
            _ => None,
        }
    }
}

/// One location's patient-summary content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GridDataElement {
    /// Opaque identifier issued by the store; blank until persisted.
    pub id: String,
    pub location: String,
    pub last_name: String,
    pub first_name: String,
    pub team: String,
    pub summary: String,
    pub content_type: ContentType,
    pub simple_content: String,
    pub nested_content: Vec<Section>,
    pub bottom_text: String,
    pub contingencies: Vec<String>,
}

impl GridDataElement {
    /// Canonical key set, in wire order.
    pub const CANONICAL_KEYS: [&'static str; 11] = [
        "id",
        "location",
        "lastName",
        "firstName",
        "team",
        "summary",
        "contentType",
        "simpleContent",
        "nestedContent",
        "bottomText",
        "contingencies",
    ];

    /// The empty shell a location holds before anything is entered, or after a clear.
    pub fn blank(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    /// True when the slot holds a patient (a last or first name is present).
    pub fn is_filled(&self) -> bool {
        !self.last_name.trim().is_empty() || !self.first_name.trim().is_empty()
    }

    /// Compares the editable content of two elements, ignoring `id`.
    pub fn same_content(&self, other: &Self) -> bool {
        Self {
            id: String::new(),
            ..self.clone()
        } == Self {
            id: String::new(),
            ..other.clone()
        }
    }
}

/// A titled block of structured content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub top: String,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Item {
    pub id: String,
    #[serde(alias = "content")]
    pub value: String,
}

/// Grid settings that may travel alongside `gridData` in a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GridSettings {
    pub title: String,
    /// Blank means the configured export name is used.
    pub export_file_name: String,
}

/// The import/export envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridDocument {
    pub grid_data: Vec<GridDataElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GridSettings>,
}
