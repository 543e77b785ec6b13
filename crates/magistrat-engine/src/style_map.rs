//! Style map construction from an exemplar slide

use crate::roles::{infer_roles_with, RoleClassifier};
use magistrat_model::{
    DeckSnapshot, ExemplarMode, Role, RoleStyleTokens, Slide, StyleMap, TextRun,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StyleMapBuild {
    pub style_map: StyleMap,
    /// Number of token sets rounded in normalized mode
    pub normalized_tokens: usize,
}

/// Derive the expected tokens per role from one exemplar slide
///
/// Every classified shape contributes the style of its dominant run (the
/// longest text, first on ties); when several shapes share a role the later
/// one in slide order wins.
#[must_use]
pub fn build_style_map(exemplar: &Slide, mode: ExemplarMode) -> StyleMapBuild {
    let scoped = DeckSnapshot {
        deck_id: "exemplar-only".to_string(),
        slides: vec![exemplar.clone()],
    };
    let inference = infer_roles_with(&RoleClassifier::default(), &scoped);

    let mut style_map = StyleMap::new();
    let mut normalized_tokens = 0;
    let Some(slide) = inference.deck.slides.first() else {
        return StyleMapBuild {
            style_map,
            normalized_tokens,
        };
    };

    for shape in &slide.shapes {
        let role = shape.role();
        if role == Role::Unknown {
            continue;
        }
        let Some(dominant) = dominant_run(&shape.text_runs) else {
            continue;
        };
        let paragraph = shape.first_paragraph();
        let tokens = RoleStyleTokens {
            font_family: dominant.font_family.clone(),
            font_size_pt: dominant.font_size_pt,
            bold: dominant.bold,
            italic: dominant.italic,
            font_color: dominant.font_color.clone(),
            line_spacing: paragraph.and_then(|p| p.line_spacing),
            bullet_indent: paragraph.and_then(|p| p.bullet_indent),
            bullet_hanging: paragraph.and_then(|p| p.bullet_hanging),
        };
        let tokens = match mode {
            ExemplarMode::Original => tokens,
            ExemplarMode::Normalized => {
                normalized_tokens += 1;
                normalize_tokens(tokens)
            }
        };
        style_map.insert(role, tokens);
    }

    tracing::debug!(
        slide_id = %exemplar.slide_id,
        mode = mode.as_str(),
        roles = style_map.len(),
        "style map built"
    );

    StyleMapBuild {
        style_map,
        normalized_tokens,
    }
}

/// Longest-text run, first on ties
#[must_use]
pub fn dominant_run(runs: &[TextRun]) -> Option<&TextRun> {
    runs.iter()
        .min_by_key(|run| std::cmp::Reverse(run.text.chars().count()))
}

fn normalize_tokens(tokens: RoleStyleTokens) -> RoleStyleTokens {
    RoleStyleTokens {
        font_family: tokens.font_family.trim().to_string(),
        font_size_pt: round_to(tokens.font_size_pt, 2.0),
        line_spacing: tokens.line_spacing.map(|v| round_to(v, 4.0)),
        bullet_indent: tokens.bullet_indent.map(|v| round_to(v, 2.0)),
        bullet_hanging: tokens.bullet_hanging.map(|v| round_to(v, 2.0)),
        ..tokens
    }
}

/// Nearest step, with halves going toward positive infinity
fn round_to(value: f64, steps_per_unit: f64) -> f64 {
    (value * steps_per_unit + 0.5).floor() / steps_per_unit
}
