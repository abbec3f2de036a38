//! Browser control for state exploration
//!
//! This module contains the seam between the explorer and a real browser:
//! - `BrowserSession`: the operations the explorer needs (navigate, perform, render, close)
//! - `WebDriverSession`: a WebDriver-backed implementation supporting several engines
//! - `Affordance`: a description of one user action that may lead to another state

mod traits;
mod webdriver;

pub use traits::{BrowserError, BrowserResult, BrowserSession};
pub use webdriver::{probe_driver, WebDriverSession};

use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// A page as rendered by the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL reported by the browser after rendering
    pub url: String,

    /// Serialized DOM
    pub dom: String,
}

/// One input value to type into a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInput {
    /// CSS selector addressing the field
    pub selector: String,

    /// Field name (or id) used for diagnostics and overrides
    pub name: String,

    pub value: String,
}

/// An interactive element whose use may move the application to another state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    /// A hyperlink, followed by navigating to its resolved target
    Link {
        href: String,
        text: String,
        selector: String,
    },

    /// A form, filled with the given values and then submitted
    Form {
        selector: String,
        fields: Vec<FieldInput>,
        /// Submit control to click; the form is submitted directly when absent
        submit: Option<String>,
    },
}

impl Affordance {
    /// Human readable trigger description recorded on transitions
    pub fn describe(&self) -> String {
        match self {
            Self::Link { href, text, .. } => {
                if text.is_empty() {
                    format!("link -> {}", href)
                } else {
                    format!("link \"{}\" -> {}", text, href)
                }
            }
            Self::Form {
                selector, fields, ..
            } => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                format!("submit {} [{}]", selector, names.join(", "))
            }
        }
    }
}

/// Browser engines a session can be opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Chromium,
    Firefox,
    Webkit,
}

impl Engine {
    /// Canonical engine name, used for output directories and config keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }

    /// Default WebDriver endpoint (chromedriver, geckodriver, safaridriver)
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Chromium => "http://localhost:9515",
            Self::Firefox => "http://localhost:4444",
            Self::Webkit => "http://localhost:4445",
        }
    }

    /// WebDriver capabilities requesting this engine
    pub fn capabilities(&self, headless: bool) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();

        match self {
            Self::Chromium => {
                let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
                if headless {
                    args.push("--headless=new");
                    args.push("--disable-gpu");
                }
                caps.insert("browserName".to_string(), json!("chrome"));
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
            Self::Firefox => {
                let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
                caps.insert("browserName".to_string(), json!("firefox"));
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            Self::Webkit => {
                // safaridriver has no headless mode
                caps.insert("browserName".to_string(), json!("safari"));
            }
        }

        caps
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" | "safari" => Ok(Self::Webkit),
            other => Err(format!("unsupported browser engine '{}'", other)),
        }
    }
}
