//! Testing utilities for the Magistrat workspace
//!
//! Shared deck builders, canned scenarios and a tracing initializer.

#![allow(missing_docs)]

use magistrat_model::{
    ContentHash, DeckSnapshot, Geometry, Inspectability, Paragraph, PatchChange, PatchOp, Risk,
    Role, Shape, ShapeType, Slide, TargetFingerprint, TextRun,
};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a test-friendly subscriber once per process; `RUST_LOG` filters
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub const DEFAULT_COLOR: &str = "#1F1F1F";

pub fn run(text: &str, family: &str, size: f64) -> TextRun {
    TextRun {
        text: text.to_string(),
        font_family: family.to_string(),
        font_size_pt: size,
        bold: false,
        italic: false,
        font_color: DEFAULT_COLOR.to_string(),
        font_alpha: 1.0,
        proofing_language: None,
    }
}

pub fn bold_run(text: &str, family: &str, size: f64) -> TextRun {
    TextRun {
        bold: true,
        ..run(text, family, size)
    }
}

pub fn paragraph(level: u8, text: &str) -> Paragraph {
    Paragraph {
        level,
        bullet_indent: None,
        bullet_hanging: None,
        bullet_glyph: None,
        line_spacing: None,
        text: text.to_string(),
    }
}

/// Fluent builder for a single shape; defaults to a visible, supported
/// text box at the top-left of the slide
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    shape: Shape,
}

impl ShapeBuilder {
    pub fn text(object_id: &str) -> Self {
        Self {
            shape: Shape {
                object_id: object_id.to_string(),
                name: object_id.to_string(),
                shape_type: ShapeType::Text,
                visible: true,
                grouped: false,
                z_index: 1,
                text_runs: Vec::new(),
                paragraphs: Vec::new(),
                geometry: Geometry {
                    left: 40.0,
                    top: 40.0,
                    width: 640.0,
                    height: 80.0,
                    rotation: 0.0,
                },
                supported_for_analysis: true,
                autofit_enabled: false,
                inspectability: Inspectability::default(),
                inferred_role: None,
                inferred_role_score: None,
            },
        }
    }

    /// Adds the run and a level-0 paragraph with the same text
    pub fn run(mut self, run: TextRun) -> Self {
        if self.shape.paragraphs.is_empty() {
            self.shape.paragraphs.push(paragraph(0, &run.text));
        }
        self.shape.text_runs.push(run);
        self
    }

    pub fn paragraphs(mut self, paragraphs: Vec<Paragraph>) -> Self {
        self.shape.paragraphs = paragraphs;
        self
    }

    pub fn bullet_level(mut self, level: u8) -> Self {
        for p in &mut self.shape.paragraphs {
            p.level = level;
        }
        self
    }

    pub fn bullets(mut self, indent: f64, hanging: f64) -> Self {
        if self.shape.paragraphs.is_empty() {
            self.shape.paragraphs.push(paragraph(1, ""));
        }
        for p in &mut self.shape.paragraphs {
            p.bullet_indent = Some(indent);
            p.bullet_hanging = Some(hanging);
        }
        self
    }

    pub fn top(mut self, top: f64) -> Self {
        self.shape.geometry.top = top;
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.shape.geometry = geometry;
        self
    }

    pub fn z(mut self, z_index: i64) -> Self {
        self.shape.z_index = z_index;
        self
    }

    /// Invisible with every run fully transparent
    pub fn ghost(mut self) -> Self {
        self.shape.visible = false;
        for run in &mut self.shape.text_runs {
            run.font_alpha = 0.0;
        }
        self
    }

    pub fn unsupported(mut self, shape_type: ShapeType) -> Self {
        self.shape.shape_type = shape_type;
        self.shape.supported_for_analysis = false;
        self
    }

    pub fn autofit(mut self) -> Self {
        self.shape.autofit_enabled = true;
        self
    }

    pub fn typography_hidden(mut self) -> Self {
        self.shape.inspectability.typography = false;
        self
    }

    pub fn bullets_hidden(mut self) -> Self {
        self.shape.inspectability.bullets = false;
        self
    }

    /// Pre-attach a classification, bypassing the classifier
    pub fn role(mut self, role: Role, score: f64) -> Self {
        self.shape.inferred_role = Some(role);
        self.shape.inferred_role_score = Some(score);
        self
    }

    pub fn build(self) -> Shape {
        self.shape
    }
}

pub fn slide(slide_id: &str, index: u32, shapes: Vec<Shape>) -> Slide {
    Slide {
        slide_id: slide_id.to_string(),
        index,
        title: String::new(),
        shapes,
    }
}

pub fn titled_slide(slide_id: &str, index: u32, title: &str, shapes: Vec<Shape>) -> Slide {
    Slide {
        title: title.to_string(),
        ..slide(slide_id, index, shapes)
    }
}

pub fn deck(slides: Vec<Slide>) -> DeckSnapshot {
    DeckSnapshot {
        deck_id: "deck-test".to_string(),
        slides,
    }
}

/// Exemplar whose title run is Aptos Display 30pt bold
pub fn exemplar_title_slide() -> Slide {
    slide(
        "slide-exemplar",
        0,
        vec![ShapeBuilder::text("exemplar-title")
            .run(bold_run("Quarterly Business Review", "Aptos Display", 30.0))
            .build()],
    )
}

/// Title in the wrong family and size, otherwise matching the exemplar
pub fn mismatched_title_slide() -> Slide {
    slide(
        "slide-target",
        1,
        vec![ShapeBuilder::text("target-title")
            .run(bold_run("Regional Results", "Calibri", 22.0))
            .build()],
    )
}

/// Placeholder text on a shape whose typography the host cannot read
pub fn typography_limited_placeholder_slide() -> Slide {
    slide(
        "slide-limited",
        2,
        vec![ShapeBuilder::text("limited-title")
            .run(bold_run("Click to add title", "Calibri", 28.0))
            .typography_hidden()
            .build()],
    )
}

/// Deck of `count` text shapes spread over slides of ten
pub fn bulk_deck(count: usize) -> DeckSnapshot {
    let slides = (0..count.div_ceil(10))
        .map(|s| {
            let shapes = (s * 10..((s + 1) * 10).min(count))
                .map(|i| {
                    ShapeBuilder::text(&format!("shape-{i:03}"))
                        .top(200.0)
                        .run(run(&format!("Body text {i}"), "Calibri", 18.0))
                        .build()
                })
                .collect();
            slide(&format!("slide-{s:02}"), u32::try_from(s).unwrap_or(u32::MAX), shapes)
        })
        .collect();
    deck(slides)
}

/// One SET_FONT_FAMILY patch per shape of the deck, in deck order
pub fn font_family_patches(deck: &DeckSnapshot, family: &str) -> Vec<PatchOp> {
    deck.slides
        .iter()
        .flat_map(|slide| {
            slide.shapes.iter().map(move |shape| PatchOp {
                id: format!("patch-{}", shape.object_id),
                change: PatchChange::SetFontFamily {
                    font_family: family.to_string(),
                },
                target: TargetFingerprint {
                    slide_id: slide.slide_id.clone(),
                    object_id: shape.object_id.clone(),
                    precondition_hash: ContentHash::compute(shape.object_id.as_bytes()),
                },
                risk: Risk::Safe,
                validations: Vec::new(),
                finding_id: Some(format!("finding-{}", shape.object_id)),
            })
        })
        .collect()
}
