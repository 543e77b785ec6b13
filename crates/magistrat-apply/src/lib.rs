//! Magistrat Apply
//!
//! Asynchronous, revision-guarded application of safe patches to a live
//! presentation host, plus document-state persistence.
//!
//! # Core Concepts
//!
//! - [`PresentationHost`]: read/apply bridge to a live document
//! - [`PatchApplier`]: chunked, sequential apply with optimistic concurrency
//! - [`ApplyError`]: input-contract violations vs. host failures with partial records
//! - [`StateStore`]: JSON state embedded in the document's carrier text
//! - [`SimHost`]: in-memory host for tests and offline runs
//!
//! # Example
//!
//! ```rust,ignore
//! use magistrat_apply::{ApplyConfig, PatchApplier, SimHost};
//! use std::sync::Arc;
//!
//! let host = Arc::new(SimHost::new(deck));
//! let applier = PatchApplier::new(host.clone(), ApplyConfig::default());
//! let records = applier.apply(&plan.safe).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod sim;
pub mod state_store;

pub use config::{ApplyConfig, ApplyConfigError, DEFAULT_CHUNK_SIZE};
pub use error::{ApplyError, FidelityGate, HostError, StateStoreError};
pub use host::{ApplyOptions, ApplyResult, DocumentCarrier, HostRead, Mutation, PresentationHost};
pub use orchestrator::{applied_record, fidelity_gate, PatchApplier, GHOST_MIN_AREA};
pub use sim::{ApplyCall, SimHost};
pub use state_store::StateStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for applying patches
    pub use crate::{
        ApplyConfig, ApplyError, DocumentCarrier, HostError, PatchApplier, PresentationHost,
        SimHost, StateStore,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
