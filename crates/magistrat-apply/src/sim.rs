//! In-memory simulated host
//!
//! Holds a deck, a revision counter (`r1`, `r2`, ...) and a document carrier
//! text. Enforces the revision guard the same way a live host does, records
//! every apply call, and can be told to fail a chosen call or to omit
//! revision ids from apply results.

use crate::error::HostError;
use crate::host::{ApplyOptions, ApplyResult, DocumentCarrier, HostRead, Mutation, PresentationHost};
use magistrat_model::{DeckSnapshot, PatchChange, Shape};
use parking_lot::Mutex;

/// One recorded `apply_mutations` call
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyCall {
    pub mutations: Vec<Mutation>,
    pub required_revision_id: Option<String>,
    /// Revision returned to the caller, if the call succeeded
    pub returned_revision_id: Option<String>,
}

#[derive(Debug, Clone)]
struct SimState {
    deck: DeckSnapshot,
    revision: u64,
    carrier: String,
    calls: Vec<ApplyCall>,
    reads: usize,
    /// 1-based call number and the error to return for it
    fail_on_call: Option<(usize, HostError)>,
    omit_revision_ids: bool,
}

impl SimState {
    fn fresh(deck: DeckSnapshot, carrier: String) -> Self {
        Self {
            deck,
            revision: 1,
            carrier,
            calls: Vec::new(),
            reads: 0,
            fail_on_call: None,
            omit_revision_ids: false,
        }
    }

    fn revision_id(&self) -> String {
        format!("r{}", self.revision)
    }
}

#[derive(Debug)]
pub struct SimHost {
    initial: DeckSnapshot,
    initial_carrier: String,
    state: Mutex<SimState>,
}

impl SimHost {
    #[must_use]
    pub fn new(deck: DeckSnapshot) -> Self {
        Self::with_carrier(deck, String::new())
    }

    #[must_use]
    pub fn with_carrier(deck: DeckSnapshot, carrier: impl Into<String>) -> Self {
        let carrier = carrier.into();
        Self {
            state: Mutex::new(SimState::fresh(deck.clone(), carrier.clone())),
            initial: deck,
            initial_carrier: carrier,
        }
    }

    /// Restore the initial deck and carrier, revision `r1`, no recorded calls
    pub fn reset(&self) {
        *self.state.lock() = SimState::fresh(self.initial.clone(), self.initial_carrier.clone());
    }

    /// Fail the `call`-th apply call (1-based) with `error`
    pub fn fail_on_call(&self, call: usize, error: HostError) {
        self.state.lock().fail_on_call = Some((call, error));
    }

    pub fn omit_revision_ids(&self, omit: bool) {
        self.state.lock().omit_revision_ids = omit;
    }

    /// Simulate a concurrent edit by another client
    pub fn edit_externally(&self, edit: impl FnOnce(&mut DeckSnapshot)) {
        let mut state = self.state.lock();
        edit(&mut state.deck);
        state.revision += 1;
    }

    #[must_use]
    pub fn revision_id(&self) -> String {
        self.state.lock().revision_id()
    }

    #[must_use]
    pub fn deck(&self) -> DeckSnapshot {
        self.state.lock().deck.clone()
    }

    #[must_use]
    pub fn carrier(&self) -> String {
        self.state.lock().carrier.clone()
    }

    #[must_use]
    pub fn apply_calls(&self) -> Vec<ApplyCall> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn call_sizes(&self) -> Vec<usize> {
        self.state.lock().calls.iter().map(|c| c.mutations.len()).collect()
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }
}

fn find_shape_mut<'a>(deck: &'a mut DeckSnapshot, slide_id: &str, object_id: &str) -> Option<&'a mut Shape> {
    deck.slides
        .iter_mut()
        .find(|s| s.slide_id == slide_id)?
        .shapes
        .iter_mut()
        .find(|s| s.object_id == object_id)
}

fn apply_one(deck: &mut DeckSnapshot, mutation: &Mutation) -> Result<(), HostError> {
    let not_found = || HostError::Other(format!("object {} not found on slide {}", mutation.object_id, mutation.slide_id));

    if matches!(mutation.change, PatchChange::DeleteGhostObject {}) {
        let slide = deck
            .slides
            .iter_mut()
            .find(|s| s.slide_id == mutation.slide_id)
            .ok_or_else(not_found)?;
        let before = slide.shapes.len();
        slide.shapes.retain(|s| s.object_id != mutation.object_id);
        return if slide.shapes.len() < before {
            Ok(())
        } else {
            Err(not_found())
        };
    }

    let shape = find_shape_mut(deck, &mutation.slide_id, &mutation.object_id).ok_or_else(not_found)?;
    match &mutation.change {
        PatchChange::SetFontFamily { font_family } => {
            for run in &mut shape.text_runs {
                run.font_family.clone_from(font_family);
            }
        }
        PatchChange::SetFontColor { font_color } => {
            for run in &mut shape.text_runs {
                run.font_color.clone_from(font_color);
            }
        }
        PatchChange::SetFontStyle { bold, italic } => {
            for run in &mut shape.text_runs {
                if let Some(bold) = bold {
                    run.bold = *bold;
                }
                if let Some(italic) = italic {
                    run.italic = *italic;
                }
            }
        }
        PatchChange::SetBulletIndent {
            bullet_indent,
            bullet_hanging,
        } => {
            if let Some(paragraph) = shape.paragraphs.first_mut() {
                paragraph.bullet_indent = Some(*bullet_indent);
                paragraph.bullet_hanging = Some(*bullet_hanging);
            }
        }
        PatchChange::NormalizeLanguageTags { language } => {
            for run in &mut shape.text_runs {
                run.proofing_language = Some(language.clone());
            }
        }
        PatchChange::SetFontSize { font_size_pt } => {
            for run in &mut shape.text_runs {
                run.font_size_pt = *font_size_pt;
            }
        }
        PatchChange::SetLineSpacing { line_spacing } => {
            for paragraph in &mut shape.paragraphs {
                paragraph.line_spacing = Some(*line_spacing);
            }
        }
        PatchChange::MoveGeometry { left, top } => {
            shape.geometry.left = *left;
            shape.geometry.top = *top;
        }
        PatchChange::ResizeGeometry { width, height } => {
            shape.geometry.width = *width;
            shape.geometry.height = *height;
        }
        other => return Err(HostError::Unsupported(other.op_name().to_string())),
    }
    Ok(())
}

#[async_trait::async_trait]
impl PresentationHost for SimHost {
    async fn read_presentation(&self) -> Result<HostRead, HostError> {
        let mut state = self.state.lock();
        state.reads += 1;
        Ok(HostRead {
            deck: state.deck.clone(),
            revision_id: Some(state.revision_id()),
        })
    }

    async fn apply_mutations(
        &self,
        batch: &[Mutation],
        options: ApplyOptions,
    ) -> Result<ApplyResult, HostError> {
        let mut state = self.state.lock();
        state.calls.push(ApplyCall {
            mutations: batch.to_vec(),
            required_revision_id: options.required_revision_id.clone(),
            returned_revision_id: None,
        });
        let call_number = state.calls.len();

        if let Some((fail_at, error)) = &state.fail_on_call {
            if *fail_at == call_number {
                return Err(error.clone());
            }
        }

        let current = state.revision_id();
        if let Some(expected) = options.required_revision_id {
            if expected != current {
                return Err(HostError::RevisionMismatch {
                    expected,
                    actual: current,
                });
            }
        }

        // All-or-nothing: mutate a copy and commit only if every write lands.
        let mut next = state.deck.clone();
        for mutation in batch {
            apply_one(&mut next, mutation)?;
        }
        state.deck = next;
        state.revision += 1;

        let returned = (!state.omit_revision_ids).then(|| state.revision_id());
        if let Some(call) = state.calls.last_mut() {
            call.returned_revision_id.clone_from(&returned);
        }
        Ok(ApplyResult {
            revision_id: returned,
        })
    }
}

#[async_trait::async_trait]
impl DocumentCarrier for SimHost {
    async fn read_carrier(&self) -> Result<String, HostError> {
        Ok(self.state.lock().carrier.clone())
    }

    async fn write_carrier(&self, content: &str) -> Result<(), HostError> {
        self.state.lock().carrier = content.to_string();
        Ok(())
    }
}
