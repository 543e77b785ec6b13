//! Coverage accounting

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContinuityStatus {
    #[default]
    NotRun,
    Ran,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverageSnapshot {
    pub analyzed_slides: usize,
    pub total_slides: usize,
    pub analyzed_objects: usize,
    pub not_analyzed_objects: usize,
    pub total_objects: usize,
    /// Most frequent unsupported shape type names, at most three
    pub top_unhandled_object_types: Vec<String>,
    pub continuity_status: ContinuityStatus,
    pub continuity_coverage: f64,
}

impl CoverageSnapshot {
    /// Record a completed continuity pass
    #[must_use]
    pub fn with_continuity(mut self, coverage: f64) -> Self {
        self.continuity_status = ContinuityStatus::Ran;
        self.continuity_coverage = coverage.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuity_defaults_to_not_run() {
        let coverage = CoverageSnapshot::default();
        assert_eq!(coverage.continuity_status, ContinuityStatus::NotRun);
        let value = serde_json::to_value(&coverage).unwrap();
        assert_eq!(value["continuityStatus"], "NOT_RUN");
    }

    #[test]
    fn with_continuity_marks_ran() {
        let coverage = CoverageSnapshot::default().with_continuity(1.0);
        assert_eq!(coverage.continuity_status, ContinuityStatus::Ran);
        assert_eq!(coverage.continuity_coverage, 1.0);
    }
}
