//! Patch operations and applied-patch records
//!
//! A [`PatchOp`] is a typed, content-addressed correction aimed at one shape.
//! Its payload is a [`PatchChange`], a tagged union in which each op type
//! declares exactly the fields it accepts. On the wire this is
//! `{"op": "SET_FONT_FAMILY", "fields": {"fontFamily": "Aptos"}}`.
//!
//! # Invariants
//! - `target.precondition_hash` is the structural hash of the observed state
//!   the patch was planned against
//! - Unknown op tags survive a round trip as [`PatchChange::Unrecognized`] and
//!   are never eligible for automatic application

use crate::finding::Risk;
use crate::hash::ContentHash;
use crate::signature::ReconcileSignature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Field changes carried by a patch, one variant per op type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "fields",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum PatchChange {
    SetFontFamily {
        font_family: String,
    },
    SetFontColor {
        font_color: String,
    },
    SetFontStyle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bold: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        italic: Option<bool>,
    },
    SetBulletIndent {
        #[serde(alias = "indent")]
        bullet_indent: f64,
        #[serde(alias = "hanging")]
        bullet_hanging: f64,
    },
    DeleteGhostObject {},
    NormalizeLanguageTags {
        language: String,
    },
    SetFontSize {
        font_size_pt: f64,
    },
    SetLineSpacing {
        line_spacing: f64,
    },
    MoveGeometry {
        left: f64,
        top: f64,
    },
    ResizeGeometry {
        width: f64,
        height: f64,
    },
    DeleteNonGhostObject {},
    DedupeDelete {},
    MasterLayoutChanges {},
    BreakGroup {},
    /// Any op tag this build does not know
    #[serde(untagged)]
    Unrecognized {
        op: String,
        #[serde(default)]
        fields: Value,
    },
}

/// Fieldless view of the known op types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchOpType {
    SetFontFamily,
    SetFontColor,
    SetFontStyle,
    SetBulletIndent,
    DeleteGhostObject,
    NormalizeLanguageTags,
    SetFontSize,
    SetLineSpacing,
    MoveGeometry,
    ResizeGeometry,
    DeleteNonGhostObject,
    DedupeDelete,
    MasterLayoutChanges,
    BreakGroup,
}

impl PatchOpType {
    pub const ALL: [PatchOpType; 14] = [
        PatchOpType::SetFontFamily,
        PatchOpType::SetFontColor,
        PatchOpType::SetFontStyle,
        PatchOpType::SetBulletIndent,
        PatchOpType::DeleteGhostObject,
        PatchOpType::NormalizeLanguageTags,
        PatchOpType::SetFontSize,
        PatchOpType::SetLineSpacing,
        PatchOpType::MoveGeometry,
        PatchOpType::ResizeGeometry,
        PatchOpType::DeleteNonGhostObject,
        PatchOpType::DedupeDelete,
        PatchOpType::MasterLayoutChanges,
        PatchOpType::BreakGroup,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetFontFamily => "SET_FONT_FAMILY",
            Self::SetFontColor => "SET_FONT_COLOR",
            Self::SetFontStyle => "SET_FONT_STYLE",
            Self::SetBulletIndent => "SET_BULLET_INDENT",
            Self::DeleteGhostObject => "DELETE_GHOST_OBJECT",
            Self::NormalizeLanguageTags => "NORMALIZE_LANGUAGE_TAGS",
            Self::SetFontSize => "SET_FONT_SIZE",
            Self::SetLineSpacing => "SET_LINE_SPACING",
            Self::MoveGeometry => "MOVE_GEOMETRY",
            Self::ResizeGeometry => "RESIZE_GEOMETRY",
            Self::DeleteNonGhostObject => "DELETE_NON_GHOST_OBJECT",
            Self::DedupeDelete => "DEDUPE_DELETE",
            Self::MasterLayoutChanges => "MASTER_LAYOUT_CHANGES",
            Self::BreakGroup => "BREAK_GROUP",
        }
    }

    /// Ops that remove the target object
    #[inline]
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteGhostObject | Self::DeleteNonGhostObject | Self::DedupeDelete
        )
    }
}

impl Display for PatchOpType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PatchChange {
    /// Known op type, `None` for [`PatchChange::Unrecognized`]
    #[must_use]
    pub fn op_type(&self) -> Option<PatchOpType> {
        let op = match self {
            Self::SetFontFamily { .. } => PatchOpType::SetFontFamily,
            Self::SetFontColor { .. } => PatchOpType::SetFontColor,
            Self::SetFontStyle { .. } => PatchOpType::SetFontStyle,
            Self::SetBulletIndent { .. } => PatchOpType::SetBulletIndent,
            Self::DeleteGhostObject {} => PatchOpType::DeleteGhostObject,
            Self::NormalizeLanguageTags { .. } => PatchOpType::NormalizeLanguageTags,
            Self::SetFontSize { .. } => PatchOpType::SetFontSize,
            Self::SetLineSpacing { .. } => PatchOpType::SetLineSpacing,
            Self::MoveGeometry { .. } => PatchOpType::MoveGeometry,
            Self::ResizeGeometry { .. } => PatchOpType::ResizeGeometry,
            Self::DeleteNonGhostObject {} => PatchOpType::DeleteNonGhostObject,
            Self::DedupeDelete {} => PatchOpType::DedupeDelete,
            Self::MasterLayoutChanges {} => PatchOpType::MasterLayoutChanges,
            Self::BreakGroup {} => PatchOpType::BreakGroup,
            Self::Unrecognized { .. } => return None,
        };
        Some(op)
    }

    /// Wire tag of this change, including unrecognized tags
    #[must_use]
    pub fn op_name(&self) -> &str {
        match self {
            Self::Unrecognized { op, .. } => op.as_str(),
            known => known.op_type().map_or("UNRECOGNIZED", |op| op.as_str()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.op_type().is_some_and(|op| op.is_deletion())
    }
}

/// Where a patch lands and the state it expects to find there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFingerprint {
    pub slide_id: String,
    pub object_id: String,
    pub precondition_hash: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOp {
    pub id: String,
    pub change: PatchChange,
    pub target: TargetFingerprint,
    pub risk: Risk,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_id: Option<String>,
}

impl PatchOp {
    #[inline]
    #[must_use]
    pub fn op_type(&self) -> Option<PatchOpType> {
        self.change.op_type()
    }
}

/// Last computed reconcile state of an applied patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Applied,
    RevertedExternally,
    Drifted,
    MissingTarget,
}

impl ReconcileState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::RevertedExternally => "reverted_externally",
            Self::Drifted => "drifted",
            Self::MissingTarget => "missing_target",
        }
    }
}

impl Display for ReconcileState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log entry for a patch that went through the apply orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRecord {
    pub id: String,
    pub finding_id: String,
    pub target_fingerprint: TargetFingerprint,
    pub before: ReconcileSignature,
    pub after: ReconcileSignature,
    pub reconcile_state: ReconcileState,
    pub applied_at: DateTime<Utc>,
}

impl PatchRecord {
    #[must_use]
    pub fn with_state(mut self, state: ReconcileState) -> Self {
        self.reconcile_state = state;
        self
    }
}
