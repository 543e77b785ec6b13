//! Style map and exemplar selection

use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expected style tokens for one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStyleTokens {
    pub font_family: String,
    pub font_size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    pub font_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_indent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_hanging: Option<f64>,
}

impl RoleStyleTokens {
    /// Either bullet metric is defined
    #[inline]
    #[must_use]
    pub fn defines_bullets(&self) -> bool {
        self.bullet_indent.is_some() || self.bullet_hanging.is_some()
    }
}

/// Role to expected tokens; ordered so serialization and hashing are stable
pub type StyleMap = BTreeMap<Role, RoleStyleTokens>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExemplarMode {
    #[default]
    Original,
    #[serde(alias = "token_normalized")]
    Normalized,
}

impl ExemplarMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Normalized => "normalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemplarSelection {
    pub slide_id: String,
    pub mode: ExemplarMode,
    pub selected_at: DateTime<Utc>,
}

/// "This style is approved" stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatifyStamp {
    pub style_signature_hash: String,
    pub ratified_at: DateTime<Utc>,
}
