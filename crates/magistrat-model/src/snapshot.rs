//! Document snapshot types
//!
//! A [`DeckSnapshot`] is an immutable value read fresh from the host on every
//! pass. The classifier attaches `inferred_role`/`inferred_role_score` to
//! shapes; hosts never set them.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Host-level classification of a page element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    Text,
    Table,
    Image,
    Chart,
    SmartArt,
    Other,
}

impl ShapeType {
    /// Wire name (`TEXT`, `SMART_ART`, ...)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Table => "TABLE",
            Self::Image => "IMAGE",
            Self::Chart => "CHART",
            Self::SmartArt => "SMART_ART",
            Self::Other => "OTHER",
        }
    }
}

/// A styled run of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    pub font_family: String,
    pub font_size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    /// Normalized `#RRGGBB`
    pub font_color: String,
    pub font_alpha: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proofing_language: Option<String>,
}

/// A paragraph with optional bullet metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    /// Indent level, 0..=4
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_indent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_hanging: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_glyph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f64>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl Geometry {
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// What the host can reliably read back for a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspectability {
    pub typography: bool,
    pub bullets: bool,
}

impl Default for Inspectability {
    fn default() -> Self {
        Self {
            typography: true,
            bullets: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub object_id: String,
    pub name: String,
    pub shape_type: ShapeType,
    pub visible: bool,
    pub grouped: bool,
    pub z_index: i64,
    pub text_runs: Vec<TextRun>,
    pub paragraphs: Vec<Paragraph>,
    pub geometry: Geometry,
    pub supported_for_analysis: bool,
    pub autofit_enabled: bool,
    #[serde(default)]
    pub inspectability: Inspectability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_role_score: Option<f64>,
}

impl Shape {
    /// All run text joined with single spaces
    #[must_use]
    pub fn run_text(&self) -> String {
        self.text_runs
            .iter()
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[inline]
    #[must_use]
    pub fn first_run(&self) -> Option<&TextRun> {
        self.text_runs.first()
    }

    #[inline]
    #[must_use]
    pub fn first_paragraph(&self) -> Option<&Paragraph> {
        self.paragraphs.first()
    }

    /// Role attached by the classifier, `UNKNOWN` if unclassified
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.inferred_role.unwrap_or(Role::Unknown)
    }

    /// Invisible, larger than `min_area`, with runs that are all fully
    /// transparent. Requires at least one run so the predicate is never
    /// satisfied vacuously.
    #[must_use]
    pub fn is_strict_ghost(&self, min_area: f64) -> bool {
        !self.visible
            && self.geometry.area() > min_area
            && !self.text_runs.is_empty()
            && self.text_runs.iter().all(|run| run.font_alpha == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub slide_id: String,
    pub index: u32,
    /// Slide-level title as reported by the host; may be empty
    #[serde(default)]
    pub title: String,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSnapshot {
    pub deck_id: String,
    pub slides: Vec<Slide>,
}

impl DeckSnapshot {
    /// Locate a shape by (slide id, object id)
    #[must_use]
    pub fn find_shape(&self, slide_id: &str, object_id: &str) -> Option<&Shape> {
        self.slides
            .iter()
            .find(|slide| slide.slide_id == slide_id)
            .and_then(|slide| slide.shapes.iter().find(|shape| shape.object_id == object_id))
    }

    #[must_use]
    pub fn find_slide(&self, slide_id: &str) -> Option<&Slide> {
        self.slides.iter().find(|slide| slide.slide_id == slide_id)
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.slides.iter().map(|slide| slide.shapes.len()).sum()
    }
}
