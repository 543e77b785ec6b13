//! Persisted per-document state

use crate::coverage::CoverageSnapshot;
use crate::finding::Finding;
use crate::patch::PatchRecord;
use crate::style::{ExemplarSelection, RatifyStamp, StyleMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATE_SCHEMA_VERSION: u32 = 1;

fn current_schema_version() -> u32 {
    STATE_SCHEMA_VERSION
}

/// Versioned record a caller stores alongside the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    /// Epoch when an older writer left it out
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemplar: Option<ExemplarSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_map: Option<StyleMap>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub patch_log: Vec<PatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratify: Option<RatifyStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSnapshot>,
}

impl DocumentState {
    #[must_use]
    pub fn new(last_updated: DateTime<Utc>) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            last_updated,
            exemplar: None,
            style_map: None,
            findings: Vec::new(),
            patch_log: Vec::new(),
            ratify: None,
            coverage: None,
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}
