//! Patch planning
//!
//! Fixed op-type allow-lists decide which suggested patches may be applied
//! automatically. This module is the only place that decision is made.

use magistrat_model::{Finding, PatchOp, PatchOpType, Risk};
use std::collections::HashMap;

pub const SAFE_OPS: [PatchOpType; 6] = [
    PatchOpType::SetFontFamily,
    PatchOpType::SetFontColor,
    PatchOpType::SetFontStyle,
    PatchOpType::SetBulletIndent,
    PatchOpType::DeleteGhostObject,
    PatchOpType::NormalizeLanguageTags,
];

pub const CAUTION_OPS: [PatchOpType; 2] = [PatchOpType::SetFontSize, PatchOpType::SetLineSpacing];

/// Risk tier of an op type; anything outside the safe and caution lists,
/// including unrecognized ops, is manual
#[must_use]
pub fn classify_op(op: Option<PatchOpType>) -> Risk {
    match op {
        Some(op) if SAFE_OPS.contains(&op) => Risk::Safe,
        Some(op) if CAUTION_OPS.contains(&op) => Risk::Caution,
        _ => Risk::Manual,
    }
}

#[inline]
#[must_use]
pub fn is_apply_eligible(patch: &PatchOp) -> bool {
    classify_op(patch.op_type()) == Risk::Safe
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchPlan {
    pub safe: Vec<PatchOp>,
    pub caution: Vec<PatchOp>,
    pub manual: Vec<PatchOp>,
}

impl PatchPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.safe.len() + self.caution.len() + self.manual.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sort the patches suggested by analyzed findings into risk tiers
///
/// Findings are visited in order; NOT_ANALYZED findings and findings whose
/// patch is absent are skipped. Each planned patch's `risk` is rewritten to
/// its tier.
#[must_use]
pub fn plan_patches(findings: &[Finding], suggested: &[PatchOp]) -> PatchPlan {
    let by_id: HashMap<&str, &PatchOp> = suggested.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut plan = PatchPlan::default();

    for finding in findings {
        if finding.is_not_analyzed() {
            continue;
        }
        let Some(patch) = finding
            .suggested_patch_id
            .as_deref()
            .and_then(|id| by_id.get(id))
        else {
            continue;
        };
        let risk = classify_op(patch.op_type());
        let planned = PatchOp {
            risk,
            ..(*patch).clone()
        };
        match risk {
            Risk::Safe => plan.safe.push(planned),
            Risk::Caution => plan.caution.push(planned),
            Risk::Manual => plan.manual.push(planned),
        }
    }

    tracing::debug!(
        safe = plan.safe.len(),
        caution = plan.caution.len(),
        manual = plan.manual.len(),
        "patches planned"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use magistrat_model::{
        ContentHash, Coverage, Evidence, EvidenceType, FindingSource, NotAnalyzedReason,
        PatchChange, Severity, TargetFingerprint,
    };
    use serde_json::json;

    fn patch(id: &str, change: PatchChange) -> PatchOp {
        PatchOp {
            id: id.to_string(),
            change,
            target: TargetFingerprint {
                slide_id: "s1".to_string(),
                object_id: "o1".to_string(),
                precondition_hash: ContentHash::compute(id.as_bytes()),
            },
            risk: Risk::Safe,
            validations: Vec::new(),
            finding_id: None,
        }
    }

    fn finding(patch_id: Option<&str>, coverage: Coverage) -> Finding {
        Finding {
            id: format!("finding-{}", patch_id.unwrap_or("none")),
            rule_id: "BP-TEST".to_string(),
            source: FindingSource::Exemplar,
            slide_id: "s1".to_string(),
            object_id: Some("o1".to_string()),
            role: None,
            observed: json!({}),
            expected: json!({}),
            evidence: vec![Evidence::new(EvidenceType::Exemplar, "test")],
            confidence: 1.0,
            risk: Risk::Safe,
            severity: Severity::Warn,
            coverage,
            not_analyzed_reason: (coverage == Coverage::NotAnalyzed)
                .then_some(NotAnalyzedReason::ApiLimitation),
            suggested_patch_id: patch_id.map(str::to_string),
        }
    }

    #[test]
    fn allow_lists_are_exact() {
        let safe: Vec<_> = PatchOpType::ALL
            .into_iter()
            .filter(|op| classify_op(Some(*op)) == Risk::Safe)
            .collect();
        assert_eq!(safe, SAFE_OPS);
        assert_eq!(classify_op(Some(PatchOpType::SetLineSpacing)), Risk::Caution);
        assert_eq!(classify_op(Some(PatchOpType::BreakGroup)), Risk::Manual);
        assert_eq!(classify_op(None), Risk::Manual);
    }

    #[test]
    fn plan_sorts_and_rewrites_risk() {
        let patches = vec![
            patch("p-size", PatchChange::SetFontSize { font_size_pt: 30.0 }),
            patch("p-move", PatchChange::MoveGeometry { left: 1.0, top: 2.0 }),
            patch(
                "p-odd",
                PatchChange::Unrecognized {
                    op: "RECOLOR_CHART".to_string(),
                    fields: json!({}),
                },
            ),
            patch(
                "p-family",
                PatchChange::SetFontFamily {
                    font_family: "Aptos".to_string(),
                },
            ),
        ];
        let findings = vec![
            finding(Some("p-size"), Coverage::Analyzed),
            finding(Some("p-move"), Coverage::Analyzed),
            finding(Some("p-odd"), Coverage::Analyzed),
            finding(Some("p-family"), Coverage::Analyzed),
            finding(None, Coverage::Analyzed),
        ];
        let plan = plan_patches(&findings, &patches);
        assert_eq!(plan.safe.len(), 1);
        assert_eq!(plan.caution.len(), 1);
        assert_eq!(plan.caution[0].risk, Risk::Caution);
        let manual: Vec<&str> = plan.manual.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(manual, ["p-move", "p-odd"]);
        assert!(plan.manual.iter().all(|p| p.risk == Risk::Manual));
    }

    #[test]
    fn not_analyzed_and_dangling_are_skipped() {
        let patches = vec![patch(
            "p-color",
            PatchChange::SetFontColor {
                font_color: "#000000".to_string(),
            },
        )];
        let findings = vec![
            finding(Some("p-color"), Coverage::NotAnalyzed),
            finding(Some("p-missing"), Coverage::Analyzed),
        ];
        assert!(plan_patches(&findings, &patches).is_empty());
    }
}
