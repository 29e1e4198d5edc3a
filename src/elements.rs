//! Element model for partitioning engine output.
//!
//! The partitioning engine (local or remote) returns a flat list of
//! [`Element`]s: atomic content units tagged with a category, a page number,
//! detected languages, and layout coordinates. The serde model here matches
//! the JSON the Unstructured partition API returns, so remote responses
//! deserialize directly into [`Element`].

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Classification label attached to an element by the partitioning engine.
///
/// The set is open-ended: the engine can introduce new categories, which map
/// to [`ElementCategory::Other`]. On the wire a category is a plain string
/// (the element JSON `"type"` field).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    /// Section or document title.
    Title,
    /// Prose paragraph.
    NarrativeText,
    /// Text the engine could not classify.
    UncategorizedText,
    /// Bulleted or numbered list item.
    ListItem,
    /// Table (detected under hi-res strategies).
    Table,
    /// Image (detected under hi-res strategies).
    Image,
    /// Synthetic zero-content marker inserted between pages.
    PageBreak,
    /// Aggregated content produced by page or single-document grouping.
    CompositeElement,
    /// Any category this crate does not know by name.
    Other(String),
}

impl ElementCategory {
    /// The wire string for this category.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ElementCategory::Title => "Title",
            ElementCategory::NarrativeText => "NarrativeText",
            ElementCategory::UncategorizedText => "UncategorizedText",
            ElementCategory::ListItem => "ListItem",
            ElementCategory::Table => "Table",
            ElementCategory::Image => "Image",
            ElementCategory::PageBreak => "PageBreak",
            ElementCategory::CompositeElement => "CompositeElement",
            ElementCategory::Other(s) => s,
        }
    }
}

impl From<&str> for ElementCategory {
    fn from(s: &str) -> Self {
        match s {
            "Title" => ElementCategory::Title,
            "NarrativeText" => ElementCategory::NarrativeText,
            "UncategorizedText" => ElementCategory::UncategorizedText,
            "ListItem" => ElementCategory::ListItem,
            "Table" => ElementCategory::Table,
            "Image" => ElementCategory::Image,
            "PageBreak" => ElementCategory::PageBreak,
            "CompositeElement" => ElementCategory::CompositeElement,
            other => ElementCategory::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ElementCategory::from(s.as_str()))
    }
}

/// Layout coordinates of an element on its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Polygon vertices as `(x, y)` pairs.
    pub points: Vec<(f64, f64)>,
    /// Coordinate system name (e.g. `PixelSpace`).
    pub system: String,
    /// Page width in the coordinate system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_width: Option<f64>,
    /// Page height in the coordinate system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_height: Option<f64>,
}

/// Metadata the engine attaches to each element.
///
/// Unknown keys are preserved in `extra` and carried through to document
/// metadata unchanged (the engine adds fields over time).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    /// Name of the file the element came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// MIME type of the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Detected languages (ISO 639 codes, e.g. `eng`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    /// Layout coordinates, present when requested and supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Source URL for web sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Id of the parent element (e.g. the title a paragraph falls under).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Any engine metadata this crate does not model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Atomic content unit detected by the partitioning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// The element's category (`"type"` on the wire).
    #[serde(rename = "type")]
    pub category: ElementCategory,
    /// Stable identifier, deterministic for a given text.
    pub element_id: String,
    /// Extracted text; empty for page-break markers.
    #[serde(default)]
    pub text: String,
    /// Engine-attached metadata.
    #[serde(default)]
    pub metadata: ElementMetadata,
}

impl Element {
    /// Create an element with a deterministic id derived from its text and
    /// page number.
    #[must_use]
    pub fn new(category: ElementCategory, text: impl Into<String>, page_number: u32) -> Self {
        let text = text.into();
        Self {
            element_id: element_id(&text, page_number),
            category,
            text,
            metadata: ElementMetadata {
                page_number: Some(page_number),
                ..ElementMetadata::default()
            },
        }
    }
}

/// Deterministic element id: truncated hex SHA-256 of the text and page.
///
/// Identical input text on the same page always hashes to the same id, which
/// keeps repeated loads of the same source byte-identical.
#[must_use]
pub fn element_id(text: &str, page_number: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_number.to_be_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}
