//! Role classification
//!
//! The policy is a decision table: an ordered list of [`RoleRule`]s, each a
//! named predicate over a [`ShapeFeatures`] view with the role and confidence
//! it assigns. The first matching rule wins. Traversal lives in
//! [`infer_roles`] and never needs to change when the table does.

use magistrat_model::{DeckSnapshot, NotAnalyzedReason, Role, RoleConfidence, Shape};
use std::collections::BTreeMap;

/// Scores below this collapse to `UNKNOWN`
pub const MIN_ROLE_SCORE: f64 = 0.5;

const NO_TEXT_SCORE: f64 = 0.1;
const FALLBACK_SCORE: f64 = 0.4;

/// Precomputed inputs for the rule predicates
#[derive(Debug, Clone)]
pub struct ShapeFeatures<'a> {
    pub shape: &'a Shape,
    /// Run text joined with spaces and trimmed
    pub text: String,
    pub first_size_pt: f64,
    pub first_bold: bool,
    pub top: f64,
}

impl<'a> ShapeFeatures<'a> {
    /// `None` when the shape has no readable text
    #[must_use]
    pub fn extract(shape: &'a Shape) -> Option<Self> {
        let run = shape.first_run()?;
        let text = shape.run_text().trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            shape,
            text,
            first_size_pt: run.font_size_pt,
            first_bold: run.bold,
            top: shape.geometry.top,
        })
    }

    fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    fn has_level(&self, predicate: impl Fn(u8) -> bool) -> bool {
        self.shape.paragraphs.iter().any(|p| predicate(p.level))
    }
}

/// One row of the decision table
#[derive(Clone, Copy)]
pub struct RoleRule {
    pub name: &'static str,
    pub matches: fn(&ShapeFeatures<'_>) -> bool,
    pub role: Role,
    pub confidence: f64,
}

impl std::fmt::Debug for RoleRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRule")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

fn nested_bullet(f: &ShapeFeatures<'_>) -> bool {
    f.has_level(|level| level >= 2)
}

fn first_level_bullet(f: &ShapeFeatures<'_>) -> bool {
    f.has_level(|level| level == 1)
}

fn near_top_large(f: &ShapeFeatures<'_>) -> bool {
    f.top <= 120.0 && f.first_size_pt >= 20.0
}

fn near_top_medium(f: &ShapeFeatures<'_>) -> bool {
    f.top <= 170.0 && f.first_size_pt >= 16.0 && f.first_size_pt < 24.0
}

fn near_bottom_small(f: &ShapeFeatures<'_>) -> bool {
    f.top >= 470.0 && f.first_size_pt <= 14.0
}

fn short_punctuated_bold(f: &ShapeFeatures<'_>) -> bool {
    f.word_count() <= 12 && f.text.ends_with([':', '.', '!', '?']) && f.first_bold
}

fn top_level_paragraph(f: &ShapeFeatures<'_>) -> bool {
    f.shape.first_paragraph().is_some_and(|p| p.level == 0) && f.first_size_pt >= 12.0
}

/// The default classification policy, in evaluation order
pub const DEFAULT_RULES: &[RoleRule] = &[
    RoleRule {
        name: "nested_bullet",
        matches: nested_bullet,
        role: Role::BulletL2,
        confidence: 0.94,
    },
    RoleRule {
        name: "first_level_bullet",
        matches: first_level_bullet,
        role: Role::BulletL1,
        confidence: 0.93,
    },
    RoleRule {
        name: "near_top_large",
        matches: near_top_large,
        role: Role::Title,
        confidence: 0.93,
    },
    RoleRule {
        name: "near_top_medium",
        matches: near_top_medium,
        role: Role::Subtitle,
        confidence: 0.90,
    },
    RoleRule {
        name: "near_bottom_small",
        matches: near_bottom_small,
        role: Role::Footer,
        confidence: 0.88,
    },
    RoleRule {
        name: "short_punctuated_bold",
        matches: short_punctuated_bold,
        role: Role::Callout,
        confidence: 0.76,
    },
    RoleRule {
        name: "top_level_paragraph",
        matches: top_level_paragraph,
        role: Role::Body,
        confidence: 0.74,
    },
];

/// Ordered rule table evaluated once per shape
#[derive(Debug, Clone, Copy)]
pub struct RoleClassifier {
    rules: &'static [RoleRule],
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES)
    }
}

impl RoleClassifier {
    #[must_use]
    pub const fn new(rules: &'static [RoleRule]) -> Self {
        Self { rules }
    }

    #[inline]
    #[must_use]
    pub fn rules(&self) -> &'static [RoleRule] {
        self.rules
    }

    /// Raw score for a shape, before the minimum-score cut
    #[must_use]
    pub fn score(&self, shape: &Shape) -> RoleConfidence {
        let Some(features) = ShapeFeatures::extract(shape) else {
            return RoleConfidence::unknown(NO_TEXT_SCORE);
        };
        self.rules
            .iter()
            .find(|rule| (rule.matches)(&features))
            .map_or_else(
                || RoleConfidence::unknown(FALLBACK_SCORE),
                |rule| RoleConfidence::new(rule.role, rule.confidence),
            )
    }

    /// Final classification of a shape
    #[must_use]
    pub fn classify(&self, shape: &Shape) -> RoleConfidence {
        if !shape.supported_for_analysis {
            return RoleConfidence::unknown(0.0);
        }
        let scored = self.score(shape);
        if scored.score >= MIN_ROLE_SCORE {
            scored
        } else {
            RoleConfidence::unknown(scored.score)
        }
    }
}

/// An object the classifier could not place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleIssue {
    pub slide_id: String,
    pub object_id: String,
    pub reason: NotAnalyzedReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleInference {
    /// Input deck with `inferred_role`/`inferred_role_score` attached
    pub deck: DeckSnapshot,
    pub role_coverage: BTreeMap<Role, usize>,
    pub issues: Vec<RoleIssue>,
}

/// Classify every shape of a deck with the default policy
#[must_use]
pub fn infer_roles(deck: &DeckSnapshot) -> RoleInference {
    infer_roles_with(&RoleClassifier::default(), deck)
}

#[must_use]
pub fn infer_roles_with(classifier: &RoleClassifier, deck: &DeckSnapshot) -> RoleInference {
    let mut classified = deck.clone();
    let mut role_coverage = BTreeMap::new();
    let mut issues = Vec::new();

    for slide in &mut classified.slides {
        for shape in &mut slide.shapes {
            let confidence = classifier.classify(shape);
            if !shape.supported_for_analysis {
                issues.push(RoleIssue {
                    slide_id: slide.slide_id.clone(),
                    object_id: shape.object_id.clone(),
                    reason: NotAnalyzedReason::UnsupportedObjectType,
                });
            } else if confidence.role == Role::Unknown {
                issues.push(RoleIssue {
                    slide_id: slide.slide_id.clone(),
                    object_id: shape.object_id.clone(),
                    reason: NotAnalyzedReason::LowRoleConfidence,
                });
            }
            *role_coverage.entry(confidence.role).or_insert(0) += 1;
            shape.inferred_role = Some(confidence.role);
            shape.inferred_role_score = Some(confidence.score);
        }
    }

    tracing::debug!(
        slides = classified.slides.len(),
        issues = issues.len(),
        "roles inferred"
    );

    RoleInference {
        deck: classified,
        role_coverage,
        issues,
    }
}
