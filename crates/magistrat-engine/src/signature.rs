//! Style signature for ratification
//!
//! Hashes the substantive basis of an approved style: exemplar slide, mode,
//! the style map and the distinct rule ids that fired. Timestamps never
//! contribute.

use chrono::{DateTime, Utc};
use magistrat_model::{
    ContentHash, ExemplarMode, ExemplarSelection, Finding, RatifyStamp, StyleMap,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

pub const UNSELECTED_EXEMPLAR: &str = "unselected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasisSummary {
    pub exemplar_slide_id: String,
    pub exemplar_mode: ExemplarMode,
    pub role_count: usize,
    pub token_count: usize,
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSignature {
    pub hash: ContentHash,
    pub basis_summary: BasisSummary,
}

impl StyleSignature {
    /// Stamp recording that this signature was approved at `at`
    #[must_use]
    pub fn ratify(&self, at: DateTime<Utc>) -> RatifyStamp {
        RatifyStamp {
            style_signature_hash: self.hash.to_string(),
            ratified_at: at,
        }
    }

    /// Whether a stored stamp still matches this signature
    #[must_use]
    pub fn is_ratified_by(&self, stamp: &RatifyStamp) -> bool {
        stamp.style_signature_hash == self.hash.to_string()
    }
}

fn count_tokens(style_map: &StyleMap) -> usize {
    const REQUIRED_FIELDS: usize = 5;
    style_map
        .values()
        .map(|t| {
            REQUIRED_FIELDS
                + usize::from(t.line_spacing.is_some())
                + usize::from(t.bullet_indent.is_some())
                + usize::from(t.bullet_hanging.is_some())
        })
        .sum()
}

/// Build the signature; a missing exemplar or style map hashes as
/// `unselected`/`original` and an empty map
#[must_use]
pub fn build_style_signature(
    exemplar: Option<&ExemplarSelection>,
    style_map: Option<&StyleMap>,
    findings: &[Finding],
) -> StyleSignature {
    let empty = StyleMap::new();
    let style_map = style_map.unwrap_or(&empty);
    let rule_ids: Vec<String> = findings
        .iter()
        .map(|f| f.rule_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let basis_summary = BasisSummary {
        exemplar_slide_id: exemplar
            .map_or(UNSELECTED_EXEMPLAR, |e| e.slide_id.as_str())
            .to_string(),
        exemplar_mode: exemplar.map(|e| e.mode).unwrap_or_default(),
        role_count: style_map.len(),
        token_count: count_tokens(style_map),
        rule_ids,
    };

    // Style maps hold only strings, numbers and flags; conversion cannot fail.
    let style_map_digest = ContentHash::compute_serializable(style_map).unwrap_or_default();
    let rule_digest = ContentHash::of_json(&json!(basis_summary.rule_ids));
    let hash = ContentHash::of_json(&json!({
        "exemplarSlideId": basis_summary.exemplar_slide_id,
        "exemplarMode": basis_summary.exemplar_mode.as_str(),
        "styleMapDigest": style_map_digest.to_string(),
        "ruleDigest": rule_digest.to_string(),
    }));

    tracing::debug!(
        hash = %hash.short(),
        roles = basis_summary.role_count,
        rules = basis_summary.rule_ids.len(),
        "style signature built"
    );
    StyleSignature {
        hash,
        basis_summary,
    }
}
