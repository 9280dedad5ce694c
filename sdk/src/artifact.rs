//! Step artifacts and context slots
//!
//! An `Artifact` is whatever a capability returns. Artifacts either land in a
//! named `ContextSlot` for later steps to read, or go back to the caller, or
//! both.

use crate::dataset::{CellValue, Dataset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value produced by a capability invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// A working table
    Dataset(Dataset),

    /// A single scalar answer
    Value(CellValue),

    /// A single row answer, in column order
    Record(Vec<(String, CellValue)>),

    /// An encoded image
    Image { mime_type: String, data_uri: String },

    /// No answer (e.g. a query that produced no row)
    Empty,
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Dataset(_) => ArtifactKind::Dataset,
            Artifact::Value(_) => ArtifactKind::Value,
            Artifact::Record(_) => ArtifactKind::Record,
            Artifact::Image { .. } => ArtifactKind::Image,
            Artifact::Empty => ArtifactKind::Empty,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Artifact::Dataset(ds) => Some(ds),
            _ => None,
        }
    }

    /// Plain JSON rendering returned to callers.
    ///
    /// Scalars map to JSON scalars, records to objects, images to their data
    /// URI, `Empty` to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Artifact::Dataset(ds) => ds.to_json(),
            Artifact::Value(v) => v.to_json(),
            Artifact::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Artifact::Image { data_uri, .. } => serde_json::Value::String(data_uri.clone()),
            Artifact::Empty => serde_json::Value::Null,
        }
    }
}

impl From<Dataset> for Artifact {
    fn from(ds: Dataset) -> Self {
        Artifact::Dataset(ds)
    }
}

impl From<CellValue> for Artifact {
    fn from(value: CellValue) -> Self {
        Artifact::Value(value)
    }
}

/// Discriminant of an `Artifact`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Dataset,
    Value,
    Record,
    Image,
    Empty,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Dataset => write!(f, "dataset"),
            ArtifactKind::Value => write!(f, "value"),
            ArtifactKind::Record => write!(f, "record"),
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::Empty => write!(f, "empty"),
        }
    }
}

/// Named, typed slots of the shared context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSlot {
    /// The current working dataset
    Dataset,

    /// The most recent analysis answer
    Answer,

    /// The most recently rendered chart
    Chart,
}

impl ContextSlot {
    pub const ALL: [ContextSlot; 3] = [ContextSlot::Dataset, ContextSlot::Answer, ContextSlot::Chart];

    /// Whether an artifact of the given kind may be stored in this slot
    pub fn accepts(&self, kind: ArtifactKind) -> bool {
        match self {
            ContextSlot::Dataset => kind == ArtifactKind::Dataset,
            ContextSlot::Answer => matches!(
                kind,
                ArtifactKind::Value | ArtifactKind::Record | ArtifactKind::Empty
            ),
            ContextSlot::Chart => kind == ArtifactKind::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSlot::Dataset => "dataset",
            ContextSlot::Answer => "answer",
            ContextSlot::Chart => "chart",
        }
    }
}

impl fmt::Display for ContextSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
