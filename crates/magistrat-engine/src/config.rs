//! Check thresholds and tolerances
//!
//! [`CheckConfig`] carries every tunable the rule checker reads. `Default`
//! gives the production values; a TOML document may override any subset.
//!
//! ```toml
//! font_size_tolerance_pt = 0.5
//!
//! [thresholds]
//! safe = 0.9
//! caution = 0.9
//! manual = 0.7
//! ```

use serde::{Deserialize, Serialize};

/// Smallest ghost area the apply step will delete; configs may only raise it
pub const MIN_GHOST_AREA: f64 = 200.0;

/// Role-confidence thresholds used by the gate ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub safe: f64,
    pub caution: f64,
    pub manual: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            safe: 0.9,
            caution: 0.9,
            manual: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub thresholds: ConfidenceThresholds,
    pub font_size_tolerance_pt: f64,
    /// Minimum area (device units squared) for ghost detection
    pub ghost_min_area: f64,
    /// Lower-case phrases that mark leftover template text
    pub placeholder_phrases: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            font_size_tolerance_pt: 0.5,
            ghost_min_area: MIN_GHOST_AREA,
            placeholder_phrases: vec!["click to add".to_string(), "lorem ipsum".to_string()],
        }
    }
}

impl CheckConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or inconsistent thresholds
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns error unless `0 <= manual <= caution <= safe <= 1`, the font
    /// size tolerance is non-negative and `ghost_min_area` is at least
    /// [`MIN_GHOST_AREA`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.thresholds;
        for (name, value) in [("safe", t.safe), ("caution", t.caution), ("manual", t.manual)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if t.manual > t.caution || t.caution > t.safe {
            return Err(ConfigError::ThresholdOrder {
                manual: t.manual,
                caution: t.caution,
                safe: t.safe,
            });
        }
        if self.font_size_tolerance_pt < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "font_size_tolerance_pt".to_string(),
                value: self.font_size_tolerance_pt,
            });
        }
        if self.ghost_min_area.is_nan() || self.ghost_min_area < MIN_GHOST_AREA {
            return Err(ConfigError::OutOfRange {
                name: "ghost_min_area".to_string(),
                value: self.ghost_min_area,
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_font_size_tolerance(mut self, tolerance_pt: f64) -> Self {
        self.font_size_tolerance_pt = tolerance_pt;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ghost_min_area(mut self, area: f64) -> Self {
        self.ghost_min_area = area;
        self
    }

    #[must_use]
    pub fn with_placeholder_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.placeholder_phrases.push(phrase.into().to_lowercase());
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} out of range: {value}")]
    OutOfRange { name: String, value: f64 },

    #[error("thresholds must satisfy manual <= caution <= safe (got {manual}, {caution}, {safe})")]
    ThresholdOrder { manual: f64, caution: f64, safe: f64 },
}
