//! Magistrat Engine
//!
//! Pure, synchronous style-compliance analysis over presentation snapshots.
//!
//! # Core Concepts
//!
//! - [`canonicalize_deck`]: stable slide/shape ordering before analysis
//! - [`RoleClassifier`]: ordered (predicate, role, confidence) rule table
//! - [`build_style_map`]: expected tokens per role from one exemplar slide
//! - [`RuleChecker`]: hygiene plus gated role/style checks with explicit coverage
//! - [`run_continuity_checks`]: deck-level title and agenda rules
//! - [`plan_patches`]: the only authority on which patches may auto-apply
//! - [`reconcile`]: classify applied patches against a fresh snapshot
//! - [`build_style_signature`]: timestamp-free hash of an approved style
//!
//! # Example
//!
//! ```rust,ignore
//! use magistrat_engine::{build_style_map, plan_patches, run_checks};
//! use magistrat_model::ExemplarMode;
//!
//! let style = build_style_map(&deck.slides[0], ExemplarMode::Original);
//! let run = run_checks(&deck, &style.style_map);
//! let plan = plan_patches(&run.findings, &run.suggested_patches);
//! println!("{} safe patches", plan.safe.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod canonical;
pub mod checks;
pub mod config;
pub mod continuity;
pub mod exemplar_health;
pub mod ids;
pub mod planner;
pub mod reconcile;
pub mod roles;
pub mod signature;
pub mod style_map;

pub use canonical::canonicalize_deck;
pub use checks::{CheckRun, RuleChecker};
pub use config::{CheckConfig, ConfidenceThresholds, ConfigError, MIN_GHOST_AREA};
pub use continuity::{resolve_effective_title, run_continuity_checks, ContinuityReport};
pub use exemplar_health::{score_exemplar_health, ExemplarHealth, HealthBuckets, HealthGrade};
pub use planner::{classify_op, is_apply_eligible, plan_patches, PatchPlan};
pub use reconcile::{
    plan_restore, reconcile, reconcile_patch_log, restore_eligibility, safe_field_diff,
    RestoreBlocked, SafeField,
};
pub use roles::{infer_roles, RoleClassifier, RoleInference};
pub use signature::{build_style_signature, BasisSummary, StyleSignature};
pub use style_map::{build_style_map, StyleMapBuild};

use magistrat_model::{DeckSnapshot, StyleMap};

/// Full analysis pipeline with one configuration
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    classifier: RoleClassifier,
    checker: RuleChecker,
}

impl Analyzer {
    #[must_use]
    pub fn new(config: CheckConfig) -> Self {
        Self {
            classifier: RoleClassifier::default(),
            checker: RuleChecker::new(config),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: RoleClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Canonicalize, classify, check, then fold in the continuity pass
    #[must_use]
    pub fn run_checks(&self, deck: &DeckSnapshot, style_map: &StyleMap) -> CheckRun {
        let canonical = canonicalize_deck(deck.clone());
        let inference = roles::infer_roles_with(&self.classifier, &canonical);
        let mut run = self.checker.run(&inference.deck, style_map);

        let continuity = run_continuity_checks(&inference.deck);
        run.coverage = continuity.apply_to(run.coverage);
        run.findings.extend(continuity.findings);

        tracing::debug!(
            deck = %deck.deck_id,
            findings = run.findings.len(),
            patches = run.suggested_patches.len(),
            "analysis complete"
        );
        run
    }
}

/// [`Analyzer::run_checks`] with the default configuration
#[must_use]
pub fn run_checks(deck: &DeckSnapshot, style_map: &StyleMap) -> CheckRun {
    Analyzer::default().run_checks(deck, style_map)
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        build_style_map, build_style_signature, plan_patches, reconcile, run_checks, Analyzer,
        CheckConfig, CheckRun, PatchPlan,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
