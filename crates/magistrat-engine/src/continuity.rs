//! Cross-slide continuity checks
//!
//! Two referential rules over the canonical deck:
//! - `BP-CONT-001`: every slide resolves to a non-empty effective title
//! - `BP-CONT-002`: items on the first agenda slide match other slides' titles

use crate::ids::finding_id;
use magistrat_model::{
    ContinuityStatus, Coverage, CoverageSnapshot, DeckSnapshot, Evidence, EvidenceType, Finding,
    FindingSource, Risk, Role, Severity, Shape, Slide,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;

pub const RULE_MISSING_TITLE: &str = "BP-CONT-001";
pub const RULE_AGENDA_MISMATCH: &str = "BP-CONT-002";

const AGENDA_KEYWORDS: [&str; 4] = ["agenda", "contents", "table of contents", "toc"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\x{2022}\-*]+").expect("static regex"));
static NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?\d+\)?[.)\]:-]?\s*").expect("static regex"));
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("static regex"));

/// Lowercase, strip list markers and punctuation, collapse whitespace
#[must_use]
pub fn normalize_for_match(input: &str) -> String {
    let lowered = input.to_lowercase();
    let collapsed = WHITESPACE.replace_all(lowered.trim(), " ");
    let unbulleted = BULLET_PREFIX.replace(&collapsed, "");
    let unnumbered = NUMBER_PREFIX.replace(&unbulleted, "");
    let alnum = NON_ALNUM.replace_all(&unnumbered, " ");
    WHITESPACE.replace_all(&alnum, " ").trim().to_string()
}

fn is_agenda_keyword(normalized: &str) -> bool {
    AGENDA_KEYWORDS.contains(&normalized)
}

/// Where an effective title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    None,
    SlideTitle,
    TitleShape,
}

impl TitleSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SlideTitle => "slide.title",
            Self::TitleShape => "title-shape",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveTitle<'a> {
    pub slide: &'a Slide,
    pub title: String,
    pub normalized: String,
    pub source: TitleSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityReport {
    pub findings: Vec<Finding>,
    pub status: ContinuityStatus,
    pub coverage: f64,
}

impl ContinuityReport {
    /// Fold this pass into a checker coverage snapshot
    #[must_use]
    pub fn apply_to(&self, coverage: CoverageSnapshot) -> CoverageSnapshot {
        coverage.with_continuity(self.coverage)
    }
}

/// Slide title, else the best TITLE-role shape's text, else empty
#[must_use]
pub fn resolve_effective_title(slide: &Slide) -> (String, TitleSource) {
    let slide_title = slide.title.trim();
    if !slide_title.is_empty() {
        return (slide_title.to_string(), TitleSource::SlideTitle);
    }

    let mut candidates: Vec<&Shape> = slide
        .shapes
        .iter()
        .filter(|shape| shape.inferred_role == Some(Role::Title))
        .collect();
    candidates.sort_by(|a, b| {
        let score_a = a.inferred_role_score.unwrap_or(0.0);
        let score_b = b.inferred_role_score.unwrap_or(0.0);
        score_b
            .total_cmp(&score_a)
            .then_with(|| a.geometry.top.total_cmp(&b.geometry.top))
            .then_with(|| a.object_id.cmp(&b.object_id))
    });

    candidates
        .into_iter()
        .map(shape_text)
        .find(|text| !text.is_empty())
        .map_or((String::new(), TitleSource::None), |text| {
            (text, TitleSource::TitleShape)
        })
}

/// Paragraph text if any, else run text
fn shape_text(shape: &Shape) -> String {
    let join = |parts: Vec<&str>| {
        parts
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let paragraphs = join(shape.paragraphs.iter().map(|p| p.text.as_str()).collect());
    if !paragraphs.is_empty() {
        return paragraphs;
    }
    join(shape.text_runs.iter().map(|r| r.text.as_str()).collect())
}

fn effective_titles(deck: &DeckSnapshot) -> Vec<EffectiveTitle<'_>> {
    let mut slides: Vec<&Slide> = deck.slides.iter().collect();
    slides.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.slide_id.cmp(&b.slide_id)));
    slides
        .into_iter()
        .map(|slide| {
            let (title, source) = resolve_effective_title(slide);
            let normalized = normalize_for_match(&title);
            EffectiveTitle {
                slide,
                title,
                normalized,
                source,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AgendaItem {
    text: String,
    normalized: String,
}

/// Top two paragraph levels, in (z, id) shape order, deduplicated
fn agenda_items(slide: &Slide) -> Vec<AgendaItem> {
    let mut shapes: Vec<&Shape> = slide.shapes.iter().collect();
    shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.object_id.cmp(&b.object_id)));

    let mut seen = BTreeSet::new();
    let mut items = Vec::new();
    for paragraph in shapes.iter().flat_map(|shape| shape.paragraphs.iter()) {
        if paragraph.level > 1 {
            continue;
        }
        let text = paragraph.text.trim();
        if text.is_empty() {
            continue;
        }
        let normalized = normalize_for_match(text);
        if normalized.is_empty() || is_agenda_keyword(&normalized) || !seen.insert(normalized.clone()) {
            continue;
        }
        items.push(AgendaItem {
            text: text.to_string(),
            normalized,
        });
    }
    items
}

/// Run both continuity rules
#[must_use]
pub fn run_continuity_checks(deck: &DeckSnapshot) -> ContinuityReport {
    let titles = effective_titles(deck);
    let mut findings: Vec<Finding> = titles
        .iter()
        .filter(|t| t.normalized.is_empty())
        .map(|t| missing_title(&t.slide.slide_id, t.source))
        .collect();

    if let Some(agenda) = titles.iter().find(|t| is_agenda_keyword(&t.normalized)) {
        let items = agenda_items(agenda.slide);
        let candidates: BTreeSet<&str> = titles
            .iter()
            .filter(|t| t.slide.slide_id != agenda.slide.slide_id)
            .map(|t| t.normalized.as_str())
            .filter(|n| !n.is_empty() && !is_agenda_keyword(n))
            .collect();

        let (matched, unmatched): (Vec<&AgendaItem>, Vec<&AgendaItem>) = items
            .iter()
            .partition(|item| candidates.contains(item.normalized.as_str()));

        if !unmatched.is_empty() {
            findings.push(agenda_mismatch(
                &agenda.slide.slide_id,
                &unmatched,
                matched.len(),
                items.len(),
                candidates.len(),
            ));
        }
    }

    tracing::debug!(findings = findings.len(), "continuity checks complete");

    ContinuityReport {
        findings,
        status: ContinuityStatus::Ran,
        coverage: 1.0,
    }
}

fn missing_title(slide_id: &str, source: TitleSource) -> Finding {
    Finding {
        id: finding_id(&json!([slide_id, RULE_MISSING_TITLE])),
        rule_id: RULE_MISSING_TITLE.to_string(),
        source: FindingSource::Continuity,
        slide_id: slide_id.to_string(),
        object_id: None,
        role: None,
        observed: json!({
            "effectiveTitle": "",
            "titleSource": source.as_str(),
            "titlelessMarkerSupported": false,
        }),
        expected: json!({ "state": "non_empty_title_or_titleless_marker" }),
        evidence: vec![
            Evidence::new(EvidenceType::Referential, "Slide has no resolvable title text."),
            Evidence::new(
                EvidenceType::Referential,
                "Titleless marker exceptions are not supported.",
            )
            .with_detail(json!({ "titlelessMarkerSupported": false })),
        ],
        confidence: 1.0,
        risk: Risk::Manual,
        severity: Severity::Warn,
        coverage: Coverage::Analyzed,
        not_analyzed_reason: None,
        suggested_patch_id: None,
    }
}

fn agenda_mismatch(
    agenda_slide_id: &str,
    unmatched: &[&AgendaItem],
    matched_count: usize,
    total_items: usize,
    compared_titles: usize,
) -> Finding {
    let texts: Vec<&str> = unmatched.iter().map(|item| item.text.as_str()).collect();
    let normalized: Vec<&str> = unmatched.iter().map(|item| item.normalized.as_str()).collect();
    Finding {
        id: finding_id(&json!([agenda_slide_id, RULE_AGENDA_MISMATCH, normalized])),
        rule_id: RULE_AGENDA_MISMATCH.to_string(),
        source: FindingSource::Continuity,
        slide_id: agenda_slide_id.to_string(),
        object_id: None,
        role: None,
        observed: json!({
            "agendaPresent": true,
            "agendaSlideId": agenda_slide_id,
            "unmatchedAgendaItems": texts,
            "unmatchedAgendaItemsNormalized": normalized,
            "matchedCount": matched_count,
            "totalAgendaItems": total_items,
        }),
        expected: json!({ "state": "all_agenda_items_map_to_slide_titles" }),
        evidence: vec![
            Evidence::new(
                EvidenceType::Referential,
                "Agenda items were compared against normalized slide titles.",
            ),
            Evidence::new(
                EvidenceType::Referential,
                "One or more agenda items had no slide-title match.",
            )
            .with_detail(json!({
                "comparedTitleCount": compared_titles,
                "unmatchedCount": unmatched.len(),
            })),
        ],
        confidence: 1.0,
        risk: Risk::Manual,
        severity: Severity::Warn,
        coverage: Coverage::Analyzed,
        not_analyzed_reason: None,
        suggested_patch_id: None,
    }
}
