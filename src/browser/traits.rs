//! Browser session trait and error types

use crate::browser::{Affordance, RenderedPage};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while driving a browser session
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("WebDriver for {engine} is not reachable at {endpoint}: {reason}")]
    DriverUnavailable {
        engine: String,
        endpoint: String,
        reason: String,
    },

    #[error("Failed to open browser session: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Browser command failed: {0}")]
    Command(String),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Browser session already closed")]
    Closed,
}

impl BrowserError {
    /// True for failures confined to one action; the session stays usable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::ElementNotFound { .. } | Self::Command(_) | Self::Timeout { .. }
        )
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// A single browser page session
///
/// The explorer drives exactly one session per engine, strictly
/// sequentially: the DOM after an action depends on the actions before it.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to a URL and returns the rendered page
    async fn navigate(&mut self, url: &str) -> BrowserResult<RenderedPage>;

    /// Exercises an affordance on the current page
    async fn perform(&mut self, affordance: &Affordance) -> BrowserResult<()>;

    /// Reads back the currently rendered page
    async fn render(&mut self) -> BrowserResult<RenderedPage>;

    /// Releases the session; further calls fail with `BrowserError::Closed`
    async fn close(&mut self) -> BrowserResult<()>;
}
