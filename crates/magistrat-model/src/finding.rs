//! Findings and their evidence

use crate::role::{NotAnalyzedReason, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSource {
    Exemplar,
    Playbook,
    Continuity,
}

/// Risk tier shared by findings and patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Safe,
    Caution,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Coverage {
    Analyzed,
    NotAnalyzed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceType {
    #[serde(rename = "EXEMPLAR_EVIDENCE")]
    Exemplar,
    #[serde(rename = "PLAYBOOK_EVIDENCE")]
    Playbook,
    #[serde(rename = "TYPOGRAPHIC_EVIDENCE")]
    Typographic,
    #[serde(rename = "STRUCTURAL_EVIDENCE")]
    Structural,
    #[serde(rename = "GEOMETRIC_EVIDENCE")]
    Geometric,
    #[serde(rename = "HYGIENE_EVIDENCE")]
    Hygiene,
    #[serde(rename = "REFERENTIAL_EVIDENCE")]
    Referential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: EvidenceType,
    pub summary: String,
    /// Flat key/value context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Evidence {
    #[must_use]
    pub fn new(kind: EvidenceType, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// An auditable rule outcome for one object (or slide)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub rule_id: String,
    pub source: FindingSource,
    pub slide_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub observed: Value,
    pub expected: Value,
    pub evidence: Vec<Evidence>,
    pub confidence: f64,
    pub risk: Risk,
    pub severity: Severity,
    pub coverage: Coverage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_analyzed_reason: Option<NotAnalyzedReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_patch_id: Option<String>,
}

impl Finding {
    #[inline]
    #[must_use]
    pub fn is_not_analyzed(&self) -> bool {
        self.coverage == Coverage::NotAnalyzed
    }

    /// NOT_ANALYZED findings always carry a reason; evidence is never empty
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let reason_ok = match self.coverage {
            Coverage::NotAnalyzed => self.not_analyzed_reason.is_some(),
            Coverage::Analyzed => self.not_analyzed_reason.is_none(),
        };
        reason_ok && !self.evidence.is_empty()
    }
}
