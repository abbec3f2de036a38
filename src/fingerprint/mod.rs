//! State fingerprinting
//!
//! A state's identity is the SHA-256 of its normalized URL and canonical DOM,
//! so two renders of the same logical state produce the same identity across
//! runs while distinct states differ with overwhelming probability.

mod canonical;

pub use canonical::canonicalize;

use crate::browser::RenderedPage;
use crate::config::ExplorationPolicy;
use crate::url::{normalize_url, NormalizeOptions};
use crate::{AtlasError, ConfigError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identity of a rendered UI state (lowercase hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an identity read back from storage or an export
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes fingerprints under one exploration policy
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    exclusions: Vec<Regex>,
    normalize: NormalizeOptions,
}

impl Fingerprinter {
    /// Compiles the policy's exclusion patterns
    ///
    /// # Returns
    ///
    /// * `Ok(Fingerprinter)` - Ready to fingerprint renders
    /// * `Err(ConfigError::InvalidPattern)` - A pattern is not a valid regex
    pub fn new(policy: &ExplorationPolicy) -> Result<Self, ConfigError> {
        let exclusions = policy
            .fingerprint_exclusions
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::InvalidPattern(format!("fingerprint exclusion '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclusions,
            normalize: NormalizeOptions {
                ignored_query_params: policy.ignored_query_params.clone(),
                strip_fragment: policy.strip_fragment,
            },
        })
    }

    /// Computes the identity of a rendered page
    ///
    /// # Returns
    ///
    /// * `Ok(Fingerprint)` - Deterministic identity for this render
    /// * `Err(AtlasError::RenderUnavailable)` - The URL is unusable or the
    ///   document has no content to identify
    pub fn fingerprint(&self, page: &RenderedPage) -> Result<Fingerprint, AtlasError> {
        let unavailable = |reason: String| AtlasError::RenderUnavailable {
            url: page.url.clone(),
            reason,
        };

        let url = normalize_url(&page.url, &self.normalize)
            .map_err(|e| unavailable(format!("unusable URL: {}", e)))?;

        let canonical = canonicalize(&page.dom, &self.exclusions)
            .ok_or_else(|| unavailable("document has no content".to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical.as_bytes());

        Ok(Fingerprint(hex::encode(hasher.finalize())))
    }
}
