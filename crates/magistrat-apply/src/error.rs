//! Error types for patch application
//!
//! Two families:
//! - input-contract violations, raised before any host call
//! - host failures, which carry whatever prefix of work already succeeded

use magistrat_model::{PatchOpType, PatchRecord};

/// Failure reported by a presentation host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Optimistic-concurrency guard rejected the call
    #[error("revision mismatch: expected {expected}, document is at {actual}")]
    RevisionMismatch { expected: String, actual: String },

    #[error("host transport failed: {0}")]
    Transport(String),

    #[error("host does not support {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl HostError {
    /// Whether the host signalled a revision conflict
    ///
    /// Hosts that only report free-form messages are matched on the words
    /// "revision" and "mismatch".
    #[must_use]
    pub fn is_revision_mismatch(&self) -> bool {
        match self {
            Self::RevisionMismatch { .. } => true,
            Self::Transport(message) | Self::Other(message) => {
                let message = message.to_lowercase();
                message.contains("revision") && message.contains("mismatch")
            }
            Self::Unsupported(_) => false,
        }
    }
}

/// Why a patch failed its apply-time fidelity gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FidelityGate {
    BulletMetricsUnreadable,
    NotStrictGhost,
    TypographyUnreadable,
}

impl std::fmt::Display for FidelityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::BulletMetricsUnreadable => "bullet metrics are unreadable for reconcile fidelity",
            Self::NotStrictGhost => "target did not meet strict ghost detection criteria",
            Self::TypographyUnreadable => "typography signature is unreadable for reconcile fidelity",
        })
    }
}

/// Error returned by [`crate::PatchApplier::apply`]
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// A non-safe op was submitted; nothing was sent to the host
    #[error("patch {patch_id} ({op}) is not apply-eligible, only safe operations are supported")]
    NotApplyEligible { patch_id: String, op: String },

    /// A target failed its fidelity gate; nothing was sent to the host
    #[error("patch {patch_id} ({op}) blocked: {gate}")]
    FidelityBlocked {
        patch_id: String,
        op: PatchOpType,
        gate: FidelityGate,
    },

    /// The document changed since it was read; refresh, re-plan and retry
    #[error("patch apply failed due to revision mismatch after {} applied patches, refresh and retry", .partial.len())]
    RevisionConflict {
        partial: Vec<PatchRecord>,
        #[source]
        source: HostError,
    },

    /// Host failure, with records for the chunks that did apply
    #[error("patch apply failed after {} applied patches: {source}", .partial.len())]
    Host {
        partial: Vec<PatchRecord>,
        #[source]
        source: HostError,
    },

    /// Every chunk applied but the confirming read failed
    #[error("{applied} patches applied but the presentation could not be re-read: {source}")]
    Readback {
        applied: usize,
        #[source]
        source: HostError,
    },
}

impl ApplyError {
    /// Records for work that completed before the failure
    #[must_use]
    pub fn partial_records(&self) -> &[PatchRecord] {
        match self {
            Self::RevisionConflict { partial, .. } | Self::Host { partial, .. } => partial,
            _ => &[],
        }
    }

    #[must_use]
    pub fn into_partial_records(self) -> Vec<PatchRecord> {
        match self {
            Self::RevisionConflict { partial, .. } | Self::Host { partial, .. } => partial,
            _ => Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_retry_after_refresh(&self) -> bool {
        matches!(self, Self::RevisionConflict { .. })
    }

    /// Rejected before any host call
    #[inline]
    #[must_use]
    pub fn is_input_contract_violation(&self) -> bool {
        matches!(self, Self::NotApplyEligible { .. } | Self::FidelityBlocked { .. })
    }

    /// Sort a host failure into conflict or propagated cause
    pub(crate) fn from_host(source: HostError, partial: Vec<PatchRecord>) -> Self {
        if source.is_revision_mismatch() {
            Self::RevisionConflict { partial, source }
        } else {
            Self::Host { partial, source }
        }
    }
}

/// Document-state persistence failure
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("document carrier unavailable: {0}")]
    Carrier(#[from] HostError),
}
