//! Patch apply orchestrator
//!
//! Applies caller-approved safe patches to a live host in fixed-size chunks,
//! guarding every call with the last known revision id.
//!
//! # Flow
//!
//! 1. Reject any op outside the safe allow-list (no host call).
//! 2. Read the baseline snapshot and revision.
//! 3. Absent targets become `missing_target` records; present targets must
//!    pass a fidelity gate for their op family.
//! 4. Send chunks sequentially, advancing the revision after each call. A
//!    call that reports no revision is followed by a read; if that read
//!    fails, the chunk counts as failed.
//! 5. Re-read once and build a record per applied patch.
//!
//! A failed chunk after earlier successes re-reads the presentation and
//! returns records for the applied prefix inside the error.

use crate::config::ApplyConfig;
use crate::error::{ApplyError, FidelityGate, HostError};
use crate::host::{ApplyOptions, Mutation, PresentationHost};
use chrono::{DateTime, Utc};
use magistrat_engine::is_apply_eligible;
use magistrat_model::{
    DeckSnapshot, PatchOp, PatchOpType, PatchRecord, ReconcileSignature, ReconcileState, Shape,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum area for a ghost deletion to pass its apply-time gate
pub const GHOST_MIN_AREA: f64 = magistrat_engine::config::MIN_GHOST_AREA;

/// Check that the live shape can be read back faithfully after `op`
///
/// # Errors
/// Returns the gate the shape fails
pub fn fidelity_gate(shape: &Shape, op: PatchOpType) -> Result<(), FidelityGate> {
    match op {
        PatchOpType::SetBulletIndent => {
            if shape.inspectability.bullets && shape.first_paragraph().is_some() {
                Ok(())
            } else {
                Err(FidelityGate::BulletMetricsUnreadable)
            }
        }
        PatchOpType::DeleteGhostObject => {
            if shape.is_strict_ghost(GHOST_MIN_AREA) {
                Ok(())
            } else {
                Err(FidelityGate::NotStrictGhost)
            }
        }
        _ => {
            if shape.inspectability.typography && shape.first_run().is_some() {
                Ok(())
            } else {
                Err(FidelityGate::TypographyUnreadable)
            }
        }
    }
}

fn finding_id_for(patch: &PatchOp) -> String {
    patch
        .finding_id
        .clone()
        .unwrap_or_else(|| format!("finding-for-{}", patch.id))
}

fn missing_target_record(patch: &PatchOp, applied_at: DateTime<Utc>) -> PatchRecord {
    PatchRecord {
        id: patch.id.clone(),
        finding_id: finding_id_for(patch),
        target_fingerprint: patch.target.clone(),
        before: ReconcileSignature::empty(),
        after: ReconcileSignature::empty(),
        reconcile_state: ReconcileState::MissingTarget,
        applied_at,
    }
}

/// Record for a patch that reached the host, from before/after snapshots
#[must_use]
pub fn applied_record(
    patch: &PatchOp,
    before: &DeckSnapshot,
    after: &DeckSnapshot,
    applied_at: DateTime<Utc>,
) -> PatchRecord {
    let target = &patch.target;
    let before_shape = before.find_shape(&target.slide_id, &target.object_id);
    let after_shape = after.find_shape(&target.slide_id, &target.object_id);
    let is_delete = patch.op_type() == Some(PatchOpType::DeleteGhostObject);

    let reconcile_state = match (is_delete, after_shape.is_some()) {
        (false, true) | (true, false) => ReconcileState::Applied,
        _ => ReconcileState::MissingTarget,
    };

    PatchRecord {
        id: patch.id.clone(),
        finding_id: finding_id_for(patch),
        target_fingerprint: target.clone(),
        before: before_shape.map_or_else(ReconcileSignature::empty, ReconcileSignature::of_shape),
        after: after_shape.map_or_else(ReconcileSignature::empty, ReconcileSignature::of_shape),
        reconcile_state,
        applied_at,
    }
}

/// Drives one read, apply, confirm cycle against a host
#[derive(Clone)]
pub struct PatchApplier {
    host: Arc<dyn PresentationHost>,
    config: ApplyConfig,
}

impl std::fmt::Debug for PatchApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchApplier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PatchApplier {
    #[must_use]
    pub fn new(host: Arc<dyn PresentationHost>, config: ApplyConfig) -> Self {
        Self { host, config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    /// Apply safe patches, returning one record per input patch in
    /// submission order
    ///
    /// # Errors
    /// - [`ApplyError::NotApplyEligible`] / [`ApplyError::FidelityBlocked`]
    ///   before any mutation is sent
    /// - [`ApplyError::RevisionConflict`] / [`ApplyError::Host`] when a chunk
    ///   fails, carrying records for the chunks that succeeded
    /// - [`ApplyError::Readback`] when the confirming read fails
    pub async fn apply(&self, patches: &[PatchOp]) -> Result<Vec<PatchRecord>, ApplyError> {
        if patches.is_empty() {
            return Ok(Vec::new());
        }
        for patch in patches {
            if !is_apply_eligible(patch) {
                return Err(ApplyError::NotApplyEligible {
                    patch_id: patch.id.clone(),
                    op: patch.change.op_name().to_string(),
                });
            }
        }

        let baseline = self
            .host
            .read_presentation()
            .await
            .map_err(|source| ApplyError::from_host(source, Vec::new()))?;
        let applied_at = Utc::now();

        let mut slots: Vec<Option<PatchRecord>> = vec![None; patches.len()];
        let mut pending: Vec<(usize, &PatchOp)> = Vec::new();
        for (index, patch) in patches.iter().enumerate() {
            let target = &patch.target;
            let Some(shape) = baseline.deck.find_shape(&target.slide_id, &target.object_id) else {
                debug!(patch = %patch.id, object = %target.object_id, "target missing before apply");
                slots[index] = Some(missing_target_record(patch, applied_at));
                continue;
            };
            // Eligibility above guarantees a known op type.
            let Some(op) = patch.op_type() else {
                return Err(ApplyError::NotApplyEligible {
                    patch_id: patch.id.clone(),
                    op: patch.change.op_name().to_string(),
                });
            };
            fidelity_gate(shape, op).map_err(|gate| ApplyError::FidelityBlocked {
                patch_id: patch.id.clone(),
                op,
                gate,
            })?;
            pending.push((index, patch));
        }

        if pending.is_empty() {
            return Ok(slots.into_iter().flatten().collect());
        }

        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = pending.len().div_ceil(chunk_size);
        info!(
            patches = patches.len(),
            pending = pending.len(),
            chunks = chunk_count,
            "applying safe patches"
        );

        let mut required = baseline.revision_id.clone();
        let mut applied = 0usize;
        for (chunk_index, chunk) in pending.chunks(chunk_size).enumerate() {
            let batch: Vec<Mutation> = chunk.iter().map(|(_, p)| Mutation::from_patch(p)).collect();
            debug!(
                chunk = chunk_index,
                size = batch.len(),
                required_revision = required.as_deref().unwrap_or("none"),
                "sending chunk"
            );
            let options = ApplyOptions {
                required_revision_id: required.clone(),
            };
            let result = match self.host.apply_mutations(&batch, options).await {
                Ok(result) => result,
                Err(source) => {
                    return Err(self
                        .fail(source, &pending[..applied], &baseline.deck, applied_at)
                        .await);
                }
            };
            applied += chunk.len();
            required = match self.advance_revision(result.revision_id).await {
                Ok(revision) => revision,
                Err(source) => {
                    return Err(self
                        .fail(source, &pending[..applied], &baseline.deck, applied_at)
                        .await);
                }
            };
            if self.config.yield_between_chunks && chunk_index + 1 < chunk_count {
                tokio::task::yield_now().await;
            }
        }

        let after = self
            .host
            .read_presentation()
            .await
            .map_err(|source| ApplyError::Readback { applied, source })?;
        for (index, patch) in &pending {
            slots[*index] = Some(applied_record(patch, &baseline.deck, &after.deck, applied_at));
        }

        let records: Vec<PatchRecord> = slots.into_iter().flatten().collect();
        info!(
            records = records.len(),
            applied,
            revision = after.revision_id.as_deref().unwrap_or("none"),
            "patch apply complete"
        );
        Ok(records)
    }

    /// Revision reported by the call, else the one a fresh read returns
    ///
    /// A failed refresh read fails the chunk; the old revision is known stale.
    async fn advance_revision(&self, reported: Option<String>) -> Result<Option<String>, HostError> {
        if reported.is_some() {
            debug!(revision = reported.as_deref().unwrap_or("none"), "revision advanced");
            return Ok(reported);
        }
        let read = self.host.read_presentation().await?;
        debug!(
            revision = read.revision_id.as_deref().unwrap_or("none"),
            "revision refreshed by read"
        );
        Ok(read.revision_id)
    }

    async fn fail(
        &self,
        source: HostError,
        applied: &[(usize, &PatchOp)],
        baseline: &DeckSnapshot,
        applied_at: DateTime<Utc>,
    ) -> ApplyError {
        if applied.is_empty() {
            warn!(error = %source, "patch apply failed before any chunk succeeded");
            return ApplyError::from_host(source, Vec::new());
        }
        let partial = match self.host.read_presentation().await {
            Ok(after) => applied
                .iter()
                .map(|(_, patch)| applied_record(patch, baseline, &after.deck, applied_at))
                .collect(),
            Err(read_err) => {
                warn!(error = %read_err, "could not re-read presentation for partial records");
                Vec::new()
            }
        };
        warn!(
            error = %source,
            partial = partial.len(),
            "patch apply interrupted after partial progress"
        );
        ApplyError::from_host(source, partial)
    }
}
