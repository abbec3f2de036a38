use crate::browser::Engine;
use crate::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sumi-Atlas
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub target: TargetConfig,

    /// Optional sign-in performed before exploration starts
    #[serde(default)]
    pub login: Option<LoginConfig>,

    #[serde(default)]
    pub exploration: ExplorationPolicy,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Application under exploration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Root URL exploration starts from
    pub url: String,

    /// Browser engines to run, each in its own isolated session
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

impl TargetConfig {
    /// Engines named in `browsers`, in the order listed
    pub fn engines(&self) -> Result<Vec<Engine>, ConfigError> {
        self.browsers
            .iter()
            .map(|name| {
                name.parse()
                    .map_err(|e| ConfigError::Validation(format!("target.browsers: {}", e)))
            })
            .collect()
    }
}

/// Credentials and selectors for the sign-in form
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LoginConfig {
    /// Page hosting the sign-in form
    pub url: String,
    pub username: String,
    pub password: String,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("username_selector", &self.username_selector)
            .field("password_selector", &self.password_selector)
            .field("submit_selector", &self.submit_selector)
            .finish()
    }
}

/// Exploration policy: how deep to go, what counts as a transition, and
/// which page noise is ignored when fingerprinting
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ExplorationPolicy {
    /// Maximum traversal depth from the root (>= 1)
    pub depth_levels: u32,

    /// Whether to submit forms with synthetic values during enumeration
    pub input_values: bool,

    /// Hard cap on the number of distinct states
    pub state_ceiling: Option<u64>,

    /// Regex patterns for DOM attributes and text ignored by fingerprinting
    pub fingerprint_exclusions: Vec<String>,

    /// Query parameters dropped from URLs before fingerprinting
    pub ignored_query_params: Vec<String>,

    /// Drop URL fragments before fingerprinting
    pub strip_fragment: bool,

    /// Only follow links that stay on the root URL's origin
    pub same_origin_only: bool,

    /// Regex patterns; links whose href or text match are never followed
    pub link_exclusions: Vec<String>,

    /// Field name to value; takes precedence over generated input values
    pub input_overrides: BTreeMap<String, String>,

    /// Seed for synthetic input values (random when absent)
    pub seed: Option<u64>,
}

impl Default for ExplorationPolicy {
    fn default() -> Self {
        Self {
            depth_levels: 1,
            input_values: false,
            state_ceiling: None,
            fingerprint_exclusions: default_fingerprint_exclusions(),
            ignored_query_params: Vec::new(),
            strip_fragment: false,
            same_origin_only: true,
            link_exclusions: default_link_exclusions(),
            input_overrides: BTreeMap::new(),
            seed: None,
        }
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BrowserConfig {
    pub headless: bool,

    /// Upper bound for any single browser command (milliseconds)
    pub command_timeout_ms: u64,

    /// Pause after an action before the page is read back (milliseconds)
    pub settle_ms: u64,

    /// WebDriver endpoint per engine name, overriding the defaults
    pub endpoints: BTreeMap<String, String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            command_timeout_ms: 30_000,
            settle_ms: 250,
            endpoints: BTreeMap::new(),
        }
    }
}

/// What happens when a snapshot is archived twice under the same identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Keep the first snapshot written for an identity
    #[default]
    FirstWriteWins,

    /// Replace the snapshot on every write
    AlwaysOverwrite,
}

/// DOM archive configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ArchiveConfig {
    pub overwrite: OverwritePolicy,

    /// Delay before the single retry of a failed snapshot write (milliseconds)
    pub retry_backoff_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            overwrite: OverwritePolicy::FirstWriteWins,
            retry_backoff_ms: 250,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for per-run, per-engine results
    pub results_dir: String,

    /// Path to the SQLite run ledger
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: "./results".to_string(),
            database_path: "./results/atlas.db".to_string(),
        }
    }
}

fn default_browsers() -> Vec<String> {
    vec!["chromium".to_string()]
}

fn default_fingerprint_exclusions() -> Vec<String> {
    vec![
        r"(?i)csrf".to_string(),
        r"(?i)nonce".to_string(),
        r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?".to_string(),
    ]
}

fn default_link_exclusions() -> Vec<String> {
    vec![r"(?i)sign-?out".to_string(), r"(?i)log-?out".to_string()]
}
