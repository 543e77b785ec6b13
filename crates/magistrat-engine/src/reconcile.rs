//! Reconciliation of applied patches against a fresh snapshot
//!
//! Pure and infallible: an unreachable target classifies as
//! `missing_target`, never as an error. Also hosts the patch-log helpers
//! built on top of reconciliation (restore planning, grouping, counts).

use crate::ids::patch_id;
use magistrat_model::{
    DeckSnapshot, PatchChange, PatchOp, PatchRecord, ReconcileSignature, ReconcileState, Risk,
    TargetFingerprint,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// State of one record given the live shape signature (if the shape exists)
#[must_use]
pub fn classify_record(record: &PatchRecord, current: Option<&ReconcileSignature>) -> ReconcileState {
    let Some(current) = current else {
        return ReconcileState::MissingTarget;
    };
    let current_hash = current.stable_hash();
    if current_hash == record.after.stable_hash() {
        ReconcileState::Applied
    } else if current_hash == record.before.stable_hash() {
        ReconcileState::RevertedExternally
    } else {
        ReconcileState::Drifted
    }
}

fn current_signature(deck: &DeckSnapshot, target: &TargetFingerprint) -> Option<ReconcileSignature> {
    deck.find_shape(&target.slide_id, &target.object_id)
        .map(ReconcileSignature::of_shape)
}

/// Recompute every record's state; output is index-aligned with input
#[must_use]
pub fn reconcile(records: &[PatchRecord], deck: &DeckSnapshot) -> Vec<PatchRecord> {
    records
        .iter()
        .map(|record| {
            let current = current_signature(deck, &record.target_fingerprint);
            let state = classify_record(record, current.as_ref());
            record.clone().with_state(state)
        })
        .collect()
}

/// Reconcile a persisted patch log by position
///
/// Records sharing an id are still reconciled independently.
#[must_use]
pub fn reconcile_patch_log(records: &[PatchRecord], deck: &DeckSnapshot) -> Vec<PatchRecord> {
    let reconciled = reconcile(records, deck);
    let changed = count_state_transitions(records, &reconciled);
    tracing::debug!(records = reconciled.len(), changed, "patch log reconciled");
    reconciled
}

/// A signature field the apply orchestrator may write without review
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SafeField {
    FontFamily,
    FontColor,
    Bold,
    Italic,
    BulletIndent,
    BulletHanging,
}

/// Safe fields whose values differ between two signatures; font size is
/// never included
#[must_use]
pub fn safe_field_diff(before: &ReconcileSignature, after: &ReconcileSignature) -> Vec<SafeField> {
    let mut diff = Vec::new();
    if before.font_family != after.font_family {
        diff.push(SafeField::FontFamily);
    }
    if before.font_color != after.font_color {
        diff.push(SafeField::FontColor);
    }
    if before.bold != after.bold {
        diff.push(SafeField::Bold);
    }
    if before.italic != after.italic {
        diff.push(SafeField::Italic);
    }
    if before.bullet_indent != after.bullet_indent {
        diff.push(SafeField::BulletIndent);
    }
    if before.bullet_hanging != after.bullet_hanging {
        diff.push(SafeField::BulletHanging);
    }
    diff
}

/// Why a record cannot be restored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreBlocked {
    #[error("patch record is {0}, restore requires applied")]
    NotApplied(ReconcileState),

    #[error("patch record removed its target and cannot be restored")]
    DeleteLike,

    #[error("patch record changed no safe fields")]
    NoSafeDiff,

    #[error("previous values are unknown for every changed safe field")]
    NothingRestorable,
}

/// `Ok` when "restore before" may be offered for a record
///
/// # Errors
/// Returns the first reason the record is not restorable
pub fn restore_eligibility(record: &PatchRecord) -> Result<(), RestoreBlocked> {
    if record.reconcile_state != ReconcileState::Applied {
        return Err(RestoreBlocked::NotApplied(record.reconcile_state));
    }
    if record.after.is_empty() {
        return Err(RestoreBlocked::DeleteLike);
    }
    if safe_field_diff(&record.before, &record.after).is_empty() {
        return Err(RestoreBlocked::NoSafeDiff);
    }
    Ok(())
}

/// Safe ops writing a record's `before` values back over its `after` state
///
/// # Errors
/// Returns why the record is not restorable, or
/// [`RestoreBlocked::NothingRestorable`] when every changed field lacks a
/// previous value
pub fn plan_restore(record: &PatchRecord) -> Result<Vec<PatchOp>, RestoreBlocked> {
    restore_eligibility(record)?;
    let before = &record.before;
    let diff = safe_field_diff(before, &record.after);
    let has = |field: SafeField| diff.contains(&field);

    let mut changes = Vec::new();
    if let (true, Some(family)) = (has(SafeField::FontFamily), &before.font_family) {
        changes.push(PatchChange::SetFontFamily {
            font_family: family.clone(),
        });
    }
    if let (true, Some(color)) = (has(SafeField::FontColor), &before.font_color) {
        changes.push(PatchChange::SetFontColor {
            font_color: color.clone(),
        });
    }
    let bold = before.bold.filter(|_| has(SafeField::Bold));
    let italic = before.italic.filter(|_| has(SafeField::Italic));
    if bold.is_some() || italic.is_some() {
        changes.push(PatchChange::SetFontStyle { bold, italic });
    }
    if has(SafeField::BulletIndent) || has(SafeField::BulletHanging) {
        if let (Some(bullet_indent), Some(bullet_hanging)) =
            (before.bullet_indent, before.bullet_hanging)
        {
            changes.push(PatchChange::SetBulletIndent {
                bullet_indent,
                bullet_hanging,
            });
        }
    }

    if changes.is_empty() {
        return Err(RestoreBlocked::NothingRestorable);
    }

    let precondition_hash = record.after.stable_hash();
    let restore_key = format!("restore:{}", record.id);
    Ok(changes
        .into_iter()
        .map(|change| PatchOp {
            id: patch_id(&restore_key, change.op_name()),
            change,
            target: TargetFingerprint {
                precondition_hash,
                ..record.target_fingerprint.clone()
            },
            risk: Risk::Safe,
            validations: Vec::new(),
            finding_id: Some(record.finding_id.clone()),
        })
        .collect())
}

/// Newest first; ties by id, finding id, slide, object, then input order
#[must_use]
pub fn sort_newest_first(records: &[PatchRecord]) -> Vec<PatchRecord> {
    let mut sorted = records.to_vec();
    // Stable sort keeps input order as the final tie-break.
    sorted.sort_by(|a, b| {
        b.applied_at
            .cmp(&a.applied_at)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.finding_id.cmp(&b.finding_id))
            .then_with(|| a.target_fingerprint.slide_id.cmp(&b.target_fingerprint.slide_id))
            .then_with(|| a.target_fingerprint.object_id.cmp(&b.target_fingerprint.object_id))
    });
    sorted
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchLogGroup {
    pub applied_at: DateTime<Utc>,
    pub records: Vec<PatchRecord>,
}

/// Consecutive newest-first records sharing an apply timestamp
#[must_use]
pub fn group_by_applied_at(records: &[PatchRecord]) -> Vec<PatchLogGroup> {
    let mut groups: Vec<PatchLogGroup> = Vec::new();
    for record in sort_newest_first(records) {
        match groups.last_mut() {
            Some(group) if group.applied_at == record.applied_at => group.records.push(record),
            _ => groups.push(PatchLogGroup {
                applied_at: record.applied_at,
                records: vec![record],
            }),
        }
    }
    groups
}

/// Count per state; every state is present, zero if unused
#[must_use]
pub fn count_states(records: &[PatchRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> = [
        ReconcileState::Applied,
        ReconcileState::RevertedExternally,
        ReconcileState::Drifted,
        ReconcileState::MissingTarget,
    ]
    .into_iter()
    .map(|state| (state.as_str(), 0))
    .collect();
    for record in records {
        *counts.entry(record.reconcile_state.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Positions whose state changed, plus any length difference
#[must_use]
pub fn count_state_transitions(previous: &[PatchRecord], next: &[PatchRecord]) -> usize {
    let changed = previous
        .iter()
        .zip(next)
        .filter(|(a, b)| a.reconcile_state != b.reconcile_state)
        .count();
    changed + previous.len().abs_diff(next.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use magistrat_model::ContentHash;
    use magistrat_test_utils::{bold_run, deck, slide, ShapeBuilder};

    fn signature(family: &str, bold: bool) -> ReconcileSignature {
        ReconcileSignature {
            font_family: Some(family.to_string()),
            font_size_pt: Some(22.0),
            font_color: Some(magistrat_test_utils::DEFAULT_COLOR.to_string()),
            bold: Some(bold),
            italic: Some(false),
            bullet_indent: None,
            bullet_hanging: None,
        }
    }

    fn record(id: &str, before: ReconcileSignature, after: ReconcileSignature) -> PatchRecord {
        PatchRecord {
            id: id.to_string(),
            finding_id: format!("finding-{id}"),
            target_fingerprint: TargetFingerprint {
                slide_id: "s1".to_string(),
                object_id: "title".to_string(),
                precondition_hash: ContentHash::default(),
            },
            before,
            after,
            reconcile_state: ReconcileState::Applied,
            applied_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn deck_with_family(family: &str) -> DeckSnapshot {
        deck(vec![slide(
            "s1",
            0,
            vec![ShapeBuilder::text("title")
                .run(bold_run("Results", family, 22.0))
                .build()],
        )])
    }

    #[test]
    fn classifies_applied_reverted_drifted_missing() {
        let r = record("p1", signature("Calibri", true), signature("Aptos", true));
        let states: Vec<_> = ["Aptos", "Calibri", "Georgia"]
            .iter()
            .map(|family| reconcile(std::slice::from_ref(&r), &deck_with_family(family))[0].reconcile_state)
            .collect();
        assert_eq!(
            states,
            [
                ReconcileState::Applied,
                ReconcileState::RevertedExternally,
                ReconcileState::Drifted
            ]
        );
        let gone = reconcile(&[r], &deck(vec![slide("s1", 0, Vec::new())]));
        assert_eq!(gone[0].reconcile_state, ReconcileState::MissingTarget);
    }

    #[test]
    fn duplicate_ids_reconciled_by_position() {
        let applied = record("dup", signature("Calibri", true), signature("Aptos", true));
        let mut other = record("dup", signature("Aptos", true), signature("Georgia", true));
        other.reconcile_state = ReconcileState::Drifted;
        let out = reconcile_patch_log(&[applied, other], &deck_with_family("Aptos"));
        assert_eq!(out[0].reconcile_state, ReconcileState::Applied);
        assert_eq!(out[1].reconcile_state, ReconcileState::RevertedExternally);
    }

    #[test]
    fn safe_diff_ignores_font_size() {
        let mut after = signature("Calibri", true);
        after.font_size_pt = Some(30.0);
        assert!(safe_field_diff(&signature("Calibri", true), &after).is_empty());
        assert_eq!(
            safe_field_diff(&signature("Calibri", true), &signature("Aptos", false)),
            [SafeField::FontFamily, SafeField::Bold]
        );
    }

    #[test]
    fn restore_requires_applied_non_delete_with_safe_diff() {
        let mut r = record("p1", signature("Calibri", true), signature("Aptos", true));
        assert!(restore_eligibility(&r).is_ok());

        r.reconcile_state = ReconcileState::Drifted;
        assert_eq!(
            restore_eligibility(&r),
            Err(RestoreBlocked::NotApplied(ReconcileState::Drifted))
        );

        let delete = record("p2", signature("Calibri", true), ReconcileSignature::empty());
        assert_eq!(restore_eligibility(&delete), Err(RestoreBlocked::DeleteLike));

        let same = record("p3", signature("Calibri", true), signature("Calibri", true));
        assert_eq!(restore_eligibility(&same), Err(RestoreBlocked::NoSafeDiff));
    }

    #[test]
    fn plan_restore_writes_before_values() {
        let r = record("p1", signature("Calibri", false), signature("Aptos", true));
        let ops = plan_restore(&r).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0].change,
            PatchChange::SetFontFamily {
                font_family: "Calibri".to_string()
            }
        );
        assert_eq!(
            ops[1].change,
            PatchChange::SetFontStyle {
                bold: Some(false),
                italic: None
            }
        );
        assert!(ops.iter().all(|op| op.target.precondition_hash == r.after.stable_hash()));
        assert_eq!(plan_restore(&r).unwrap(), ops);
    }

    #[test]
    fn grouping_and_counts() {
        let early = record("a", signature("Calibri", true), signature("Aptos", true));
        let mut late = record("b", signature("Calibri", true), signature("Aptos", true));
        late.applied_at = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        late.reconcile_state = ReconcileState::Drifted;
        let same_time = record("c", signature("Calibri", true), signature("Aptos", true));

        let groups = group_by_applied_at(&[early.clone(), late.clone(), same_time.clone()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].records[0].id, "b");
        let ids: Vec<&str> = groups[1].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);

        let counts = count_states(&[early.clone(), late.clone()]);
        assert_eq!(counts["applied"], 1);
        assert_eq!(counts["drifted"], 1);
        assert_eq!(counts["missing_target"], 0);

        assert_eq!(count_state_transitions(&[early.clone()], &[late.clone(), same_time]), 2);
    }
}
