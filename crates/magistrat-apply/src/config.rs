//! Apply orchestrator settings
//!
//! ```toml
//! chunk_size = 75
//! yield_between_chunks = true
//! ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Mutations per host call
    pub chunk_size: usize,
    /// Yield to the runtime between host calls
    pub yield_between_chunks: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            yield_between_chunks: true,
        }
    }
}

impl ApplyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns error on malformed TOML or a zero chunk size
    pub fn from_toml_str(raw: &str) -> Result<Self, ApplyConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns error when `chunk_size` is zero
    pub fn validate(&self) -> Result<(), ApplyConfigError> {
        if self.chunk_size == 0 {
            return Err(ApplyConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_yield_between_chunks(mut self, enabled: bool) -> Self {
        self.yield_between_chunks = enabled;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyConfigError {
    #[error("invalid apply config toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("chunk_size must be at least 1")]
    ZeroChunkSize,
}
