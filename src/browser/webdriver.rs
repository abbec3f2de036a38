//! WebDriver-backed browser session
//!
//! This module handles:
//! - Probing the WebDriver server before a session is requested
//! - Opening a session for the requested engine (headed or headless)
//! - Bounding every browser command by the configured timeout
//! - Filling and submitting forms, following links

use crate::browser::traits::{BrowserError, BrowserResult, BrowserSession};
use crate::browser::{Affordance, Engine, FieldInput, RenderedPage};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use std::future::Future;
use std::time::Duration;

/// Timeout for the WebDriver readiness probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A browser session on a WebDriver server
pub struct WebDriverSession {
    client: Client,
    engine: Engine,
    command_timeout: Duration,
    settle: Duration,
    closed: bool,
}

impl WebDriverSession {
    /// Opens a new session for `engine`
    ///
    /// The endpoint comes from `browser.endpoints.<engine>` or the engine's
    /// default driver port. The driver's `/status` endpoint is checked first
    /// so a missing driver is reported as such rather than as a session error.
    pub async fn connect(engine: Engine, config: &BrowserConfig) -> BrowserResult<Self> {
        let endpoint = config
            .endpoints
            .get(engine.name())
            .map(String::as_str)
            .unwrap_or_else(|| engine.default_endpoint())
            .trim_end_matches('/')
            .to_string();

        probe_driver(engine, &endpoint).await?;

        if config.headless && engine == Engine::Webkit {
            tracing::warn!("webkit (safaridriver) does not support headless mode; running headed");
        }

        tracing::debug!("Opening {} session at {}", engine, endpoint);

        let client = ClientBuilder::rustls()
            .capabilities(engine.capabilities(config.headless))
            .connect(&endpoint)
            .await
            .map_err(|e| BrowserError::Session(format!("{} at {}: {}", engine, endpoint, e)))?;

        tracing::info!("Opened {} session (headless: {})", engine, config.headless);

        Ok(Self {
            client,
            engine,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            settle: Duration::from_millis(config.settle_ms),
            closed: false,
        })
    }

    /// The engine this session runs on
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Runs a WebDriver command under the command timeout
    async fn bounded<T, F>(&self, operation: &str, command: F) -> BrowserResult<T>
    where
        F: Future<Output = Result<T, CmdError>>,
    {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CmdError::NoSuchElement(_))) => Err(BrowserError::ElementNotFound {
                selector: operation.to_string(),
            }),
            Ok(Err(e)) => Err(BrowserError::Command(format!("{}: {}", operation, e))),
            Err(_) => Err(BrowserError::Timeout {
                operation: operation.to_string(),
                after_ms: self.command_timeout.as_millis() as u64,
            }),
        }
    }

    /// Gives client-side rendering a moment to finish after an action
    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }

    async fn fill_and_submit(
        &self,
        selector: &str,
        fields: &[FieldInput],
        submit: Option<&str>,
    ) -> BrowserResult<()> {
        for field in fields {
            let element = self
                .bounded(&field.selector, self.client.find(Locator::Css(&field.selector)))
                .await?;

            // Not every control can be cleared (checkboxes, selects); typing still works
            if let Err(e) = self.bounded("clear", element.clear()).await {
                tracing::debug!("Could not clear {}: {}", field.selector, e);
            }

            self.bounded("send_keys", element.send_keys(&field.value))
                .await?;
        }

        match submit {
            Some(submit_selector) => {
                let button = self
                    .bounded(submit_selector, self.client.find(Locator::Css(submit_selector)))
                    .await?;
                self.bounded("click", button.click()).await?;
            }
            None => {
                let form = self
                    .bounded(selector, self.client.form(Locator::Css(selector)))
                    .await?;
                self.bounded("submit", form.submit()).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<RenderedPage> {
        self.bounded("goto", self.client.goto(url))
            .await
            .map_err(|e| navigation_error(url, e))?;
        self.settle().await;
        self.render().await
    }

    async fn perform(&mut self, affordance: &Affordance) -> BrowserResult<()> {
        match affordance {
            Affordance::Link { href, .. } => {
                self.bounded("goto", self.client.goto(href))
                    .await
                    .map_err(|e| navigation_error(href, e))?;
            }
            Affordance::Form {
                selector,
                fields,
                submit,
            } => {
                self.fill_and_submit(selector, fields, submit.as_deref())
                    .await?;
            }
        }

        self.settle().await;
        Ok(())
    }

    async fn render(&mut self) -> BrowserResult<RenderedPage> {
        let url = self.bounded("current_url", self.client.current_url()).await?;
        let dom = self.bounded("source", self.client.source()).await?;

        Ok(RenderedPage {
            url: url.to_string(),
            dom,
        })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.bounded("close", self.client.clone().close()).await;
        self.closed = true;
        tracing::info!("Closed {} session", self.engine);
        result
    }
}

/// Attaches the target URL to failed navigation commands; timeouts stay timeouts
fn navigation_error(url: &str, error: BrowserError) -> BrowserError {
    match error {
        BrowserError::Command(message) => BrowserError::Navigation {
            url: url.to_string(),
            message,
        },
        other => other,
    }
}

/// Checks that a WebDriver server is up and ready for new sessions
///
/// # Arguments
///
/// * `engine` - Engine the driver serves (for error reporting)
/// * `endpoint` - WebDriver base URL, e.g. `http://localhost:9515`
///
/// # Returns
///
/// * `Ok(())` - The driver answered `/status` and did not report `ready: false`
/// * `Err(BrowserError::DriverUnavailable)` - Otherwise
pub async fn probe_driver(engine: Engine, endpoint: &str) -> BrowserResult<()> {
    let unavailable = |reason: String| BrowserError::DriverUnavailable {
        engine: engine.to_string(),
        endpoint: endpoint.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let response = client
        .get(format!("{}/status", endpoint.trim_end_matches('/')))
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(unavailable(format!("status endpoint returned {}", response.status())));
    }

    // Drivers that report readiness must report true; others are assumed ready
    let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
    if body["value"]["ready"] == serde_json::Value::Bool(false) {
        let message = body["value"]["message"]
            .as_str()
            .unwrap_or("driver reports not ready")
            .to_string();
        return Err(unavailable(message));
    }

    Ok(())
}
