//! Host contract
//!
//! The only surface through which the orchestrator touches a live
//! presentation. Every call is a suspend point; the orchestrator never
//! issues two calls concurrently.

use crate::error::HostError;
use magistrat_model::{DeckSnapshot, PatchChange, PatchOp};
use serde::{Deserialize, Serialize};

/// A snapshot plus the opaque revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct HostRead {
    pub deck: DeckSnapshot,
    pub revision_id: Option<String>,
}

/// One write sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub patch_id: String,
    pub slide_id: String,
    pub object_id: String,
    #[serde(flatten)]
    pub change: PatchChange,
}

impl Mutation {
    #[must_use]
    pub fn from_patch(patch: &PatchOp) -> Self {
        Self {
            patch_id: patch.id.clone(),
            slide_id: patch.target.slide_id.clone(),
            object_id: patch.target.object_id.clone(),
            change: patch.change.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Revision the document must still be at for the call to succeed
    pub required_revision_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// New revision, when the host reports one
    pub revision_id: Option<String>,
}

/// Read/apply bridge to a live presentation
///
/// `apply_mutations` is all-or-nothing per call and must fail with
/// [`HostError::RevisionMismatch`] when the revision guard does not hold.
#[async_trait::async_trait]
pub trait PresentationHost: Send + Sync {
    async fn read_presentation(&self) -> Result<HostRead, HostError>;

    async fn apply_mutations(
        &self,
        batch: &[Mutation],
        options: ApplyOptions,
    ) -> Result<ApplyResult, HostError>;
}

/// Free-text area of the document where state can be stored
#[async_trait::async_trait]
pub trait DocumentCarrier: Send + Sync {
    async fn read_carrier(&self) -> Result<String, HostError>;

    async fn write_carrier(&self, content: &str) -> Result<(), HostError>;
}
