//! Sumi-Atlas: a state-space mapper for rendered web applications
//!
//! This crate drives a real browser session through a web application,
//! recognises previously seen UI states by a content fingerprint, and builds
//! a directed reachability graph of states with one archived DOM snapshot per
//! distinct state.

pub mod archive;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod fingerprint;
pub mod graph;
pub mod output;
pub mod storage;
pub mod synth;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Atlas operations
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render unavailable for {url}: {reason}")]
    RenderUnavailable { url: String, reason: String },

    #[error("Could not return to state {identity} (last rendered at {url})")]
    StateDrift { identity: String, url: String },

    #[error("Unknown state referenced by transition: {identity}")]
    UnknownState { identity: String },

    #[error("Failed to archive snapshot {identity} at {}: {source}", path.display())]
    ArchiveWriteFailure {
        identity: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(archive::ArchiveError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtlasError {
    /// Returns true if the error only affects a single affordance attempt
    ///
    /// Recoverable errors are logged and recorded in the run's failure list;
    /// everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RenderUnavailable { .. } | Self::StateDrift { .. } => true,
            Self::Browser(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

impl From<archive::ArchiveError> for AtlasError {
    fn from(error: archive::ArchiveError) -> Self {
        match error {
            archive::ArchiveError::Write {
                identity,
                path,
                source,
            } => Self::ArchiveWriteFailure {
                identity,
                path,
                source,
            },
            other => Self::Archive(other),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, ExplorationPolicy};
pub use crawler::{ExplorationOutcome, Explorer, StopReason};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use graph::{ReachabilityGraph, State, Transition};
pub use url::normalize_url;
