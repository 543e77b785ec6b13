//! Reconcile signatures
//!
//! The fixed seven-field snapshot of a shape's style state used for
//! before/after/drift comparison. Every field is always serialized, `null`
//! when absent, so structural hashes never depend on which fields happened
//! to be present.

use crate::hash::ContentHash;
use crate::snapshot::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSignature {
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size_pt: Option<f64>,
    #[serde(default)]
    pub font_color: Option<String>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub bullet_indent: Option<f64>,
    #[serde(default)]
    pub bullet_hanging: Option<f64>,
}

impl ReconcileSignature {
    /// All-null signature
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Signature of a live shape: first run plus first paragraph bullets
    #[must_use]
    pub fn of_shape(shape: &Shape) -> Self {
        let run = shape.first_run();
        let paragraph = shape.first_paragraph();
        Self {
            font_family: run.map(|r| r.font_family.clone()),
            font_size_pt: run.map(|r| r.font_size_pt),
            font_color: run.map(|r| r.font_color.clone()),
            bold: run.map(|r| r.bold),
            italic: run.map(|r| r.italic),
            bullet_indent: paragraph.and_then(|p| p.bullet_indent),
            bullet_hanging: paragraph.and_then(|p| p.bullet_hanging),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::empty()
    }

    /// Stable structural hash
    #[must_use]
    pub fn stable_hash(&self) -> ContentHash {
        // Plain struct of options and scalars; conversion cannot fail.
        match serde_json::to_value(self) {
            Ok(value) => ContentHash::of_json(&value),
            Err(_) => ContentHash::default(),
        }
    }
}
