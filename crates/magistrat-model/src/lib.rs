//! Magistrat Model
//!
//! Data model for the presentation style-compliance engine.
//!
//! # Core Concepts
//!
//! - [`DeckSnapshot`]: immutable slides/shapes read from a host
//! - [`Role`]: semantic role assigned to a text object
//! - [`Finding`]: auditable rule outcome with explicit coverage
//! - [`PatchOp`]: typed, content-addressed correction with a precondition hash
//! - [`PatchRecord`]: applied patch with before/after [`ReconcileSignature`]s
//! - [`ContentHash`]: 32-byte Blake3 hash used for every deterministic id
//!
//! # Example
//!
//! ```rust
//! use magistrat_model::{ContentHash, ReconcileSignature};
//!
//! let id = ContentHash::of_json(&serde_json::json!(["slide-1", "shape-1"])).prefixed("finding");
//! assert!(id.starts_with("finding-"));
//! assert!(ReconcileSignature::empty().is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod coverage;
mod finding;
mod hash;
mod patch;
mod role;
mod signature;
mod snapshot;
mod state;
mod style;

pub use coverage::{ContinuityStatus, CoverageSnapshot};
pub use finding::{Coverage, Evidence, EvidenceType, Finding, FindingSource, Risk, Severity};
pub use hash::{canonicalize, ContentHash, HashError};
pub use patch::{
    PatchChange, PatchOp, PatchOpType, PatchRecord, ReconcileState, TargetFingerprint,
};
pub use role::{NotAnalyzedReason, Role, RoleConfidence};
pub use signature::ReconcileSignature;
pub use snapshot::{
    DeckSnapshot, Geometry, Inspectability, Paragraph, Shape, ShapeType, Slide, TextRun,
};
pub use state::{DocumentState, STATE_SCHEMA_VERSION};
pub use style::{ExemplarMode, ExemplarSelection, RatifyStamp, RoleStyleTokens, StyleMap};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
