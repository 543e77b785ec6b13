//! Semantic roles and coverage reason codes

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Semantic role of a text object on a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Title,
    Subtitle,
    Body,
    #[serde(rename = "BULLET_L1")]
    BulletL1,
    #[serde(rename = "BULLET_L2")]
    BulletL2,
    Footer,
    Callout,
    Unknown,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Title,
        Role::Subtitle,
        Role::Body,
        Role::BulletL1,
        Role::BulletL2,
        Role::Footer,
        Role::Callout,
        Role::Unknown,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Subtitle => "SUBTITLE",
            Self::Body => "BODY",
            Self::BulletL1 => "BULLET_L1",
            Self::BulletL2 => "BULLET_L2",
            Self::Footer => "FOOTER",
            Self::Callout => "CALLOUT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Roles whose text is expected to carry bullet metrics
    #[inline]
    #[must_use]
    pub fn expects_bullets(&self) -> bool {
        matches!(self, Self::BulletL1 | Self::BulletL2)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role plus classifier confidence in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleConfidence {
    pub role: Role,
    pub score: f64,
}

impl RoleConfidence {
    #[must_use]
    pub fn new(role: Role, score: f64) -> Self {
        Self {
            role,
            score: score.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn unknown(score: f64) -> Self {
        Self::new(Role::Unknown, score)
    }
}

/// Closed set of reasons an object was not analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotAnalyzedReason {
    LowRoleConfidence,
    MissingStylemapRole,
    ExpectedConfidenceLow,
    UnsupportedObjectType,
    GroupedObjectUnsafe,
    ApiLimitation,
    AmbiguousTextRuns,
    AutofitPresent,
    ValidationUnavailable,
}

impl NotAnalyzedReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowRoleConfidence => "LOW_ROLE_CONFIDENCE",
            Self::MissingStylemapRole => "MISSING_STYLEMAP_ROLE",
            Self::ExpectedConfidenceLow => "EXPECTED_CONFIDENCE_LOW",
            Self::UnsupportedObjectType => "UNSUPPORTED_OBJECT_TYPE",
            Self::GroupedObjectUnsafe => "GROUPED_OBJECT_UNSAFE",
            Self::ApiLimitation => "API_LIMITATION",
            Self::AmbiguousTextRuns => "AMBIGUOUS_TEXT_RUNS",
            Self::AutofitPresent => "AUTOFIT_PRESENT",
            Self::ValidationUnavailable => "VALIDATION_UNAVAILABLE",
        }
    }
}

impl Display for NotAnalyzedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names_match_display() {
        for role in Role::ALL {
            let encoded = serde_json::to_string(&role).unwrap();
            assert_eq!(encoded, format!("\"{role}\""));
        }
    }

    #[test]
    fn bullet_roles_expect_bullets() {
        assert!(Role::BulletL1.expects_bullets());
        assert!(Role::BulletL2.expects_bullets());
        assert!(!Role::Body.expects_bullets());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(RoleConfidence::new(Role::Title, 1.4).score, 1.0);
        assert_eq!(RoleConfidence::unknown(-0.2).score, 0.0);
    }

    #[test]
    fn reason_wire_names() {
        let encoded = serde_json::to_string(&NotAnalyzedReason::MissingStylemapRole).unwrap();
        assert_eq!(encoded, "\"MISSING_STYLEMAP_ROLE\"");
        assert_eq!(NotAnalyzedReason::ApiLimitation.to_string(), "API_LIMITATION");
    }
}
