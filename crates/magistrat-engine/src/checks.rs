//! Rule checker
//!
//! Every object goes through two independent phases:
//!
//! 1. Object-global hygiene (placeholder text, ghost objects), run regardless
//!    of role or confidence so a misclassified object is still flagged.
//! 2. Role/style checks behind a gate ladder. Each gate that fails emits a
//!    `NOT_ANALYZED` finding with its reason and stops role/style checks for
//!    that object:
//!    unsupported type, unreadable typography, low confidence (manual),
//!    missing style-map role, low confidence (safe), no readable run.
//!
//! Mismatches against the style map produce findings plus a suggested
//! [`PatchOp`] whose precondition hash covers the observed state.

use crate::config::CheckConfig;
use crate::ids::{finding_id, patch_id};
use magistrat_model::{
    ContentHash, Coverage, CoverageSnapshot, DeckSnapshot, Evidence, EvidenceType, Finding,
    FindingSource, NotAnalyzedReason, Paragraph, PatchChange, PatchOp, Risk, Role,
    RoleStyleTokens, Severity, Shape, Slide, StyleMap, TargetFingerprint, TextRun,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

pub const RULE_PLACEHOLDER: &str = "BP-HYGIENE-004";
pub const RULE_GHOST: &str = "BP-HYGIENE-001";
pub const RULE_COVERAGE: &str = "BP-COVERAGE-001";
pub const RULE_FONT_FAMILY: &str = "BP-TYPO-001";
pub const RULE_FONT_STYLE: &str = "BP-TYPO-002";
pub const RULE_FONT_SIZE: &str = "BP-TYPO-003";
pub const RULE_FONT_COLOR: &str = "BP-COLOR-001";
pub const RULE_BULLET: &str = "BP-BULLET-001";

/// Validation tag attached to size changes
pub const VALIDATION_NO_OVERFLOW: &str = "no_overflow_after_change";

/// Output of one checker pass
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRun {
    pub findings: Vec<Finding>,
    pub coverage: CoverageSnapshot,
    pub suggested_patches: Vec<PatchOp>,
}

/// Precondition hash over the observed typography of a run
#[must_use]
pub fn typography_precondition(run: &TextRun) -> ContentHash {
    ContentHash::of_json(&json!({
        "fontFamily": run.font_family,
        "fontColor": run.font_color,
        "fontSizePt": run.font_size_pt,
        "bold": run.bold,
        "italic": run.italic,
    }))
}

/// Precondition hash over the observed bullet metrics of a paragraph
#[must_use]
pub fn bullet_precondition(paragraph: Option<&Paragraph>) -> ContentHash {
    ContentHash::of_json(&json!({
        "bulletIndent": paragraph.and_then(|p| p.bullet_indent),
        "bulletHanging": paragraph.and_then(|p| p.bullet_hanging),
    }))
}

/// Precondition hash over the visibility profile checked for ghost deletion
#[must_use]
pub fn ghost_precondition(shape: &Shape) -> ContentHash {
    ContentHash::of_json(&json!({
        "visible": shape.visible,
        "zIndex": shape.z_index,
        "area": shape.geometry.area(),
    }))
}

/// Stateless evaluator for a classified deck against a style map
#[derive(Debug, Clone, Default)]
pub struct RuleChecker {
    config: CheckConfig,
}

impl RuleChecker {
    #[must_use]
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Run every rule over a deck whose shapes already carry inferred roles
    #[must_use]
    pub fn run(&self, deck: &DeckSnapshot, style_map: &StyleMap) -> CheckRun {
        let mut acc = Accumulator::default();

        for slide in &deck.slides {
            for shape in &slide.shapes {
                for (finding, patch) in self.hygiene(slide, shape) {
                    acc.push(finding, patch);
                }
                self.role_checks(slide, shape, style_map, &mut acc);
            }
        }

        let coverage = acc.coverage(deck);
        tracing::debug!(
            findings = acc.findings.len(),
            patches = acc.patches.len(),
            analyzed = coverage.analyzed_objects,
            not_analyzed = coverage.not_analyzed_objects,
            "checks complete"
        );

        CheckRun {
            findings: acc.findings,
            coverage,
            suggested_patches: acc.patches,
        }
    }

    fn hygiene(&self, slide: &Slide, shape: &Shape) -> Vec<(Finding, Option<PatchOp>)> {
        let mut findings = Vec::new();
        let role = shape.role();
        let confidence = shape
            .inferred_role_score
            .unwrap_or(self.config.thresholds.manual);

        let text = shape.run_text().to_lowercase();
        if self
            .config
            .placeholder_phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str()))
        {
            let finding = Finding {
                id: finding_id(&json!([slide.slide_id, shape.object_id, "placeholder"])),
                rule_id: RULE_PLACEHOLDER.to_string(),
                source: FindingSource::Playbook,
                slide_id: slide.slide_id.clone(),
                object_id: Some(shape.object_id.clone()),
                role: Some(role),
                observed: json!({ "textContent": text }),
                expected: json!({ "pattern": "no_placeholder_text" }),
                evidence: vec![
                    Evidence::new(EvidenceType::Playbook, "Placeholder text pattern matched."),
                    Evidence::new(EvidenceType::Hygiene, "Text contains placeholder token."),
                ],
                confidence,
                risk: Risk::Manual,
                severity: Severity::Error,
                coverage: Coverage::Analyzed,
                not_analyzed_reason: None,
                suggested_patch_id: None,
            };
            findings.push((finding, None));
        }

        if self.is_potential_ghost(shape) {
            let strict = shape.is_strict_ghost(self.config.ghost_min_area);
            let (tag, risk, summary) = if strict {
                (
                    "ghost_safe",
                    Risk::Safe,
                    "Invisible, fully transparent text object occupies layout space.",
                )
            } else {
                (
                    "ghost_manual",
                    Risk::Manual,
                    "Deletion remains manual until the strict ghost profile is met.",
                )
            };
            let id = finding_id(&json!([slide.slide_id, shape.object_id, tag]));
            let patch = strict.then(|| PatchOp {
                id: patch_id(&id, "DELETE_GHOST_OBJECT"),
                change: PatchChange::DeleteGhostObject {},
                target: TargetFingerprint {
                    slide_id: slide.slide_id.clone(),
                    object_id: shape.object_id.clone(),
                    precondition_hash: ghost_precondition(shape),
                },
                risk: Risk::Safe,
                validations: Vec::new(),
                finding_id: Some(id.clone()),
            });
            let finding = Finding {
                id,
                rule_id: RULE_GHOST.to_string(),
                source: FindingSource::Playbook,
                slide_id: slide.slide_id.clone(),
                object_id: Some(shape.object_id.clone()),
                role: Some(role),
                observed: json!({ "visible": shape.visible, "zIndex": shape.z_index }),
                expected: json!({ "noGhostObjects": true }),
                evidence: vec![
                    Evidence::new(EvidenceType::Playbook, "Potential ghost profile matched."),
                    Evidence::new(EvidenceType::Hygiene, summary),
                ],
                confidence,
                risk,
                severity: Severity::Warn,
                coverage: Coverage::Analyzed,
                not_analyzed_reason: None,
                suggested_patch_id: patch.as_ref().map(|p| p.id.clone()),
            };
            findings.push((finding, patch));
        }

        findings
    }

    /// Invisible, above the bottom layer, larger than the minimum area and
    /// with no visible run
    fn is_potential_ghost(&self, shape: &Shape) -> bool {
        !shape.visible
            && shape.geometry.area() > self.config.ghost_min_area
            && shape.z_index > 0
            && shape.text_runs.iter().all(|run| run.font_alpha == 0.0)
    }

    fn role_checks(&self, slide: &Slide, shape: &Shape, style_map: &StyleMap, acc: &mut Accumulator) {
        let thresholds = self.config.thresholds;
        let gate = |reason: NotAnalyzedReason, message: &str| {
            not_analyzed(&slide.slide_id, &shape.object_id, reason, message)
        };

        if !shape.supported_for_analysis {
            acc.unhandled(shape);
            acc.push(
                gate(
                    NotAnalyzedReason::UnsupportedObjectType,
                    "Shape type is not supported by style checks.",
                ),
                None,
            );
            return;
        }
        acc.analyzed(slide, shape);

        if !shape.inspectability.typography {
            acc.push(
                gate(
                    NotAnalyzedReason::ApiLimitation,
                    "Typography tokens were unavailable in the current host runtime.",
                ),
                None,
            );
            return;
        }

        let role = shape.role();
        let score = shape.inferred_role_score.unwrap_or(0.0);
        if role == Role::Unknown || score < thresholds.manual {
            acc.push(
                gate(
                    NotAnalyzedReason::LowRoleConfidence,
                    "Role confidence was below the manual threshold for role-specific checks.",
                ),
                None,
            );
            return;
        }

        let Some(expected) = style_map.get(&role) else {
            acc.push(
                gate(
                    NotAnalyzedReason::MissingStylemapRole,
                    &format!("Style map did not contain role {role}."),
                ),
                None,
            );
            return;
        };

        if score < thresholds.safe {
            acc.push(
                gate(
                    NotAnalyzedReason::LowRoleConfidence,
                    "Role confidence was below safe/caution thresholds for style-map checks.",
                ),
                None,
            );
            return;
        }

        let Some(run) = shape.first_run() else {
            acc.push(
                gate(
                    NotAnalyzedReason::AmbiguousTextRuns,
                    "No readable text runs were available.",
                ),
                None,
            );
            return;
        };

        let wants_bullets = role.expects_bullets() || expected.defines_bullets();
        let bullets_blocked = wants_bullets && !shape.inspectability.bullets;
        if bullets_blocked {
            acc.push(
                gate(
                    NotAnalyzedReason::ApiLimitation,
                    "Bullet indentation metrics were unavailable in the current host runtime.",
                ),
                None,
            );
        }

        let ctx = StyleContext {
            slide_id: &slide.slide_id,
            shape,
            role,
            score,
            expected,
            observed: run,
            precondition: typography_precondition(run),
        };
        self.compare_typography(&ctx, acc);
        if wants_bullets && !bullets_blocked {
            compare_bullets(&ctx, acc);
        }
    }

    fn compare_typography(&self, ctx: &StyleContext<'_>, acc: &mut Accumulator) {
        let observed = ctx.observed;
        let expected = ctx.expected;

        if observed.font_family != expected.font_family {
            ctx.mismatch(
                acc,
                Mismatch {
                    key: "font_family",
                    rule_id: RULE_FONT_FAMILY,
                    observed: json!({ "fontFamily": observed.font_family }),
                    expected: json!({ "fontFamily": expected.font_family }),
                    summary: (
                        "Role style map defines expected font family.",
                        "Dominant run family differs from style map.",
                    ),
                    evidence_kind: EvidenceType::Typographic,
                    risk: Risk::Safe,
                    severity: Severity::Error,
                    change: PatchChange::SetFontFamily {
                        font_family: expected.font_family.clone(),
                    },
                    precondition: ctx.precondition,
                    validations: Vec::new(),
                },
            );
        }

        if observed.font_color != expected.font_color {
            ctx.mismatch(
                acc,
                Mismatch {
                    key: "font_color",
                    rule_id: RULE_FONT_COLOR,
                    observed: json!({ "fontColor": observed.font_color }),
                    expected: json!({ "fontColor": expected.font_color }),
                    summary: (
                        "Role style map defines expected font color.",
                        "Dominant run color differs from style map.",
                    ),
                    evidence_kind: EvidenceType::Typographic,
                    risk: Risk::Safe,
                    severity: Severity::Warn,
                    change: PatchChange::SetFontColor {
                        font_color: expected.font_color.clone(),
                    },
                    precondition: ctx.precondition,
                    validations: Vec::new(),
                },
            );
        }

        if observed.bold != expected.bold || observed.italic != expected.italic {
            ctx.mismatch(
                acc,
                Mismatch {
                    key: "font_style",
                    rule_id: RULE_FONT_STYLE,
                    observed: json!({ "bold": observed.bold, "italic": observed.italic }),
                    expected: json!({ "bold": expected.bold, "italic": expected.italic }),
                    summary: (
                        "Role style map defines expected font style.",
                        "Bold/italic tokens differ from role expectation.",
                    ),
                    evidence_kind: EvidenceType::Typographic,
                    risk: Risk::Safe,
                    severity: Severity::Warn,
                    change: PatchChange::SetFontStyle {
                        bold: Some(expected.bold),
                        italic: Some(expected.italic),
                    },
                    precondition: ctx.precondition,
                    validations: Vec::new(),
                },
            );
        }

        if (observed.font_size_pt - expected.font_size_pt).abs() > self.config.font_size_tolerance_pt {
            if ctx.shape.autofit_enabled {
                acc.push(
                    not_analyzed(
                        ctx.slide_id,
                        &ctx.shape.object_id,
                        NotAnalyzedReason::AutofitPresent,
                        "Autofit was enabled; font size checks were gated out.",
                    ),
                    None,
                );
            } else {
                ctx.mismatch(
                    acc,
                    Mismatch {
                        key: "font_size",
                        rule_id: RULE_FONT_SIZE,
                        observed: json!({ "fontSizePt": observed.font_size_pt }),
                        expected: json!({ "fontSizePt": expected.font_size_pt }),
                        summary: (
                            "Role style map defines expected font size.",
                            "Dominant run size differs beyond role tolerance.",
                        ),
                        evidence_kind: EvidenceType::Typographic,
                        risk: Risk::Caution,
                        severity: Severity::Warn,
                        change: PatchChange::SetFontSize {
                            font_size_pt: expected.font_size_pt,
                        },
                        precondition: ctx.precondition,
                        validations: vec![VALIDATION_NO_OVERFLOW.to_string()],
                    },
                );
            }
        }
    }
}

/// Compared only when the style map defines both metrics
fn compare_bullets(ctx: &StyleContext<'_>, acc: &mut Accumulator) {
    let (Some(indent), Some(hanging)) = (ctx.expected.bullet_indent, ctx.expected.bullet_hanging)
    else {
        return;
    };
    let paragraph = ctx.shape.first_paragraph();
    let observed_indent = paragraph.and_then(|p| p.bullet_indent);
    let observed_hanging = paragraph.and_then(|p| p.bullet_hanging);
    if observed_indent == Some(indent) && observed_hanging == Some(hanging) {
        return;
    }
    ctx.mismatch(
        acc,
        Mismatch {
            key: "bullet_indent",
            rule_id: RULE_BULLET,
            observed: json!({ "bulletIndent": observed_indent, "bulletHanging": observed_hanging }),
            expected: json!({ "bulletIndent": indent, "bulletHanging": hanging }),
            summary: (
                "Style map defines bullet indent and hanging.",
                "Paragraph bullet indentation differs from expected tokens.",
            ),
            evidence_kind: EvidenceType::Structural,
            risk: Risk::Safe,
            severity: Severity::Warn,
            change: PatchChange::SetBulletIndent {
                bullet_indent: indent,
                bullet_hanging: hanging,
            },
            precondition: bullet_precondition(paragraph),
            validations: Vec::new(),
        },
    );
}

fn not_analyzed(slide_id: &str, object_id: &str, reason: NotAnalyzedReason, message: &str) -> Finding {
    Finding {
        id: finding_id(&json!([slide_id, object_id, reason.as_str()])),
        rule_id: RULE_COVERAGE.to_string(),
        source: FindingSource::Playbook,
        slide_id: slide_id.to_string(),
        object_id: Some(object_id.to_string()),
        role: None,
        observed: json!({ "state": "NOT_ANALYZED" }),
        expected: json!({ "state": "ANALYZED" }),
        evidence: vec![
            Evidence::new(
                EvidenceType::Playbook,
                "Coverage contract requires explicit NOT_ANALYZED state.",
            ),
            Evidence::new(EvidenceType::Hygiene, message),
        ],
        confidence: 1.0,
        risk: Risk::Manual,
        severity: Severity::Info,
        coverage: Coverage::NotAnalyzed,
        not_analyzed_reason: Some(reason),
        suggested_patch_id: None,
    }
}

struct StyleContext<'a> {
    slide_id: &'a str,
    shape: &'a Shape,
    role: Role,
    score: f64,
    expected: &'a RoleStyleTokens,
    observed: &'a TextRun,
    precondition: ContentHash,
}

struct Mismatch {
    key: &'static str,
    rule_id: &'static str,
    observed: Value,
    expected: Value,
    summary: (&'static str, &'static str),
    evidence_kind: EvidenceType,
    risk: Risk,
    severity: Severity,
    change: PatchChange,
    precondition: ContentHash,
    validations: Vec<String>,
}

impl StyleContext<'_> {
    fn mismatch(&self, acc: &mut Accumulator, m: Mismatch) {
        let id = finding_id(&json!([
            self.slide_id,
            self.shape.object_id,
            self.role.as_str(),
            m.key
        ]));
        let pid = patch_id(&id, m.change.op_name());
        let patch = PatchOp {
            id: pid.clone(),
            change: m.change,
            target: TargetFingerprint {
                slide_id: self.slide_id.to_string(),
                object_id: self.shape.object_id.clone(),
                precondition_hash: m.precondition,
            },
            risk: m.risk,
            validations: m.validations,
            finding_id: Some(id.clone()),
        };
        let finding = Finding {
            id,
            rule_id: m.rule_id.to_string(),
            source: FindingSource::Exemplar,
            slide_id: self.slide_id.to_string(),
            object_id: Some(self.shape.object_id.clone()),
            role: Some(self.role),
            observed: m.observed,
            expected: m.expected,
            evidence: vec![
                Evidence::new(EvidenceType::Exemplar, m.summary.0),
                Evidence::new(m.evidence_kind, m.summary.1),
            ],
            confidence: self.score,
            risk: m.risk,
            severity: m.severity,
            coverage: Coverage::Analyzed,
            not_analyzed_reason: None,
            suggested_patch_id: Some(pid),
        };
        acc.push(finding, Some(patch));
    }
}

#[derive(Default)]
struct Accumulator {
    findings: Vec<Finding>,
    patches: Vec<PatchOp>,
    analyzed_objects: BTreeSet<(String, String)>,
    analyzed_slides: BTreeSet<String>,
    not_analyzed_objects: BTreeSet<(String, String)>,
    unhandled_types: BTreeMap<&'static str, usize>,
}

impl Accumulator {
    fn push(&mut self, finding: Finding, patch: Option<PatchOp>) {
        if finding.is_not_analyzed() {
            if let Some(object_id) = &finding.object_id {
                self.not_analyzed_objects
                    .insert((finding.slide_id.clone(), object_id.clone()));
            }
        }
        self.findings.push(finding);
        self.patches.extend(patch);
    }

    fn analyzed(&mut self, slide: &Slide, shape: &Shape) {
        self.analyzed_objects
            .insert((slide.slide_id.clone(), shape.object_id.clone()));
        self.analyzed_slides.insert(slide.slide_id.clone());
    }

    fn unhandled(&mut self, shape: &Shape) {
        *self.unhandled_types.entry(shape.shape_type.as_str()).or_insert(0) += 1;
    }

    fn coverage(&self, deck: &DeckSnapshot) -> CoverageSnapshot {
        let mut unhandled: Vec<(&str, usize)> =
            self.unhandled_types.iter().map(|(k, v)| (*k, *v)).collect();
        unhandled.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        CoverageSnapshot {
            analyzed_slides: self.analyzed_slides.len(),
            total_slides: deck.slides.len(),
            analyzed_objects: self.analyzed_objects.len(),
            not_analyzed_objects: self.not_analyzed_objects.len(),
            total_objects: deck.object_count(),
            top_unhandled_object_types: unhandled
                .into_iter()
                .take(3)
                .map(|(name, _)| name.to_string())
                .collect(),
            ..CoverageSnapshot::default()
        }
    }
}
