//! Canonical ordering of a raw snapshot

use magistrat_model::DeckSnapshot;

/// Sort slides by (index, id) and each slide's shapes by (z-index, id)
///
/// No other field is touched.
#[must_use]
pub fn canonicalize_deck(mut deck: DeckSnapshot) -> DeckSnapshot {
    deck.slides
        .sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.slide_id.cmp(&b.slide_id)));
    for slide in &mut deck.slides {
        slide
            .shapes
            .sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.object_id.cmp(&b.object_id)));
    }
    deck
}
