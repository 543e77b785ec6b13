//! Exemplar health score
//!
//! A quick 0-100 rating of how trustworthy a slide is as an exemplar,
//! built from four 0-25 buckets.

use crate::config::CheckConfig;
use magistrat_model::{Geometry, Slide};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

const BUCKET_MAX: f64 = 25.0;
const CANVAS_WIDTH: f64 = 1920.0;
const CANVAS_HEIGHT: f64 = 1080.0;

const INVISIBLE_PENALTY: f64 = 5.0;
const PLACEHOLDER_PENALTY: f64 = 8.0;
const OFF_SLIDE_PENALTY: f64 = 4.0;

/// Buckets below this trigger a note
const NOTE_THRESHOLD: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthGrade {
    Block,
    Risky,
    Ok,
    Great,
}

impl HealthGrade {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Great,
            60..=79 => Self::Ok,
            40..=59 => Self::Risky,
            _ => Self::Block,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Ok => "ok",
            Self::Risky => "risky",
            Self::Block => "block",
        }
    }
}

impl Display for HealthGrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBuckets {
    pub role_separability: u8,
    pub token_stability: u8,
    pub geometry_coherence: u8,
    pub hygiene: u8,
}

impl HealthBuckets {
    #[must_use]
    pub fn total(&self) -> u8 {
        self.role_separability + self.token_stability + self.geometry_coherence + self.hygiene
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemplarHealth {
    pub score: u8,
    pub buckets: HealthBuckets,
    pub grade: HealthGrade,
    pub notes: Vec<String>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bucket(value: f64) -> u8 {
    // Clamped to [0, 25] first, so the cast is exact.
    value.round().clamp(0.0, BUCKET_MAX) as u8
}

/// Font-size span between the largest and smallest first runs
fn role_separability(slide: &Slide) -> u8 {
    let sizes: Vec<f64> = slide
        .shapes
        .iter()
        .filter_map(|s| s.first_run().map(|r| r.font_size_pt))
        .filter(|size| *size > 0.0)
        .collect();
    if sizes.len() < 2 {
        return 10;
    }
    let largest = sizes.iter().copied().fold(f64::MIN, f64::max);
    let smallest = sizes.iter().copied().fold(f64::MAX, f64::min);
    bucket(((largest - smallest) * 1.2).min(BUCKET_MAX))
}

/// Share of runs carrying the most common token combination
#[allow(clippy::cast_precision_loss)]
fn token_stability(slide: &Slide) -> u8 {
    let mut counts: HashMap<(&str, u64, bool, bool, &str), usize> = HashMap::new();
    let mut total = 0usize;
    for run in slide.shapes.iter().flat_map(|s| &s.text_runs) {
        let key = (
            run.font_family.as_str(),
            run.font_size_pt.to_bits(),
            run.bold,
            run.italic,
            run.font_color.as_str(),
        );
        *counts.entry(key).or_insert(0) += 1;
        total += 1;
    }
    let Some(dominant) = counts.values().copied().max() else {
        return 0;
    };
    bucket(dominant as f64 / total as f64 * BUCKET_MAX)
}

fn median(sorted: &[f64]) -> Option<f64> {
    sorted.get(sorted.len() / 2).copied()
}

/// Median absolute deviation of shape tops, one point lost per 4pt
fn geometry_coherence(slide: &Slide) -> u8 {
    let mut tops: Vec<f64> = slide.shapes.iter().map(|s| s.geometry.top).collect();
    if tops.len() < 2 {
        return 12;
    }
    tops.sort_by(f64::total_cmp);
    let Some(mid) = median(&tops) else {
        return 12;
    };
    let mut deviations: Vec<f64> = tops.iter().map(|top| (top - mid).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    match median(&deviations) {
        Some(mad) => bucket(BUCKET_MAX - mad / 4.0),
        None => 12,
    }
}

fn is_off_slide(g: &Geometry) -> bool {
    g.left + g.width < 0.0 || g.top + g.height < 0.0 || g.left > CANVAS_WIDTH || g.top > CANVAS_HEIGHT
}

fn hygiene(slide: &Slide, config: &CheckConfig) -> u8 {
    let penalty: f64 = slide
        .shapes
        .iter()
        .map(|shape| {
            let text = shape.run_text().trim().to_lowercase();
            let mut penalty = 0.0;
            if !shape.visible {
                penalty += INVISIBLE_PENALTY;
            }
            if config
                .placeholder_phrases
                .iter()
                .any(|phrase| text.contains(phrase.as_str()))
            {
                penalty += PLACEHOLDER_PENALTY;
            }
            if is_off_slide(&shape.geometry) {
                penalty += OFF_SLIDE_PENALTY;
            }
            penalty
        })
        .sum();
    bucket(BUCKET_MAX - penalty)
}

/// Score a candidate exemplar with the default placeholder phrases
#[must_use]
pub fn score_exemplar_health(slide: &Slide) -> ExemplarHealth {
    score_exemplar_health_with(&CheckConfig::default(), slide)
}

#[must_use]
pub fn score_exemplar_health_with(config: &CheckConfig, slide: &Slide) -> ExemplarHealth {
    let buckets = HealthBuckets {
        role_separability: role_separability(slide),
        token_stability: token_stability(slide),
        geometry_coherence: geometry_coherence(slide),
        hygiene: hygiene(slide, config),
    };
    let score = buckets.total();

    let mut notes = Vec::new();
    if buckets.token_stability < NOTE_THRESHOLD {
        notes.push("Mixed token stability detected. Normalization is recommended.".to_string());
    }
    if buckets.hygiene < NOTE_THRESHOLD {
        notes.push("Potential ghost/placeholder artifacts found.".to_string());
    }

    ExemplarHealth {
        score,
        buckets,
        grade: HealthGrade::from_score(score),
        notes,
    }
}
