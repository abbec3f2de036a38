//! Scripted browser session and fixtures shared by the integration tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use sumi_atlas::browser::{
    Affordance, BrowserError, BrowserResult, BrowserSession, RenderedPage,
};
use sumi_atlas::config::{parse_config, Config};
use tokio_util::sync::CancellationToken;

pub const ROOT: &str = "http://app.test/";

/// A browser whose pages are a fixed URL -> DOM map
///
/// Links navigate to their href. A form submission shows the next of
/// `form_views` (the last one repeats) or else lands on `form_target`.
/// URLs listed in `failing` fail to navigate.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    form_target: Option<String>,
    form_views: Vec<(String, String)>,
    cancel_on: Option<(usize, CancellationToken)>,
    current: Option<String>,
    view: Option<String>,
    performs: usize,
    pub navigations: Vec<String>,
    pub submissions: usize,
    pub closed: bool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page at `path` (relative to `ROOT`) with the given body
    pub fn page(mut self, path: &str, body: &str) -> Self {
        self.pages.insert(url(path), page_dom(path, body));
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(url(path));
        self
    }

    pub fn form_target(mut self, path: &str) -> Self {
        self.form_target = Some(url(path));
        self
    }

    /// A submission shows `body` at `path` without changing the URL mapping
    pub fn form_view(mut self, path: &str, body: &str) -> Self {
        self.form_views.push((url(path), page_dom(path, body)));
        self
    }

    /// Cancels `token` while performing the `n`th action (1-based)
    pub fn cancel_on_perform(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on = Some((n, token));
        self
    }

    fn go(&mut self, target: &str) -> BrowserResult<()> {
        self.navigations.push(target.to_string());

        if self.failing.contains(target) || !self.pages.contains_key(target) {
            return Err(BrowserError::Navigation {
                url: target.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }

        self.current = Some(target.to_string());
        self.view = None;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<RenderedPage> {
        self.go(url)?;
        self.render().await
    }

    async fn perform(&mut self, affordance: &Affordance) -> BrowserResult<()> {
        self.performs += 1;
        if let Some((n, token)) = &self.cancel_on {
            if *n == self.performs {
                token.cancel();
            }
        }

        match affordance {
            Affordance::Link { href, .. } => self.go(href),
            Affordance::Form { .. } if !self.form_views.is_empty() => {
                let index = self.submissions.min(self.form_views.len() - 1);
                let (target, dom) = self.form_views[index].clone();
                self.submissions += 1;
                self.go(&target)?;
                self.view = Some(dom);
                Ok(())
            }
            Affordance::Form { selector, .. } => {
                let target = self
                    .form_target
                    .clone()
                    .ok_or_else(|| BrowserError::ElementNotFound {
                        selector: selector.clone(),
                    })?;
                self.submissions += 1;
                self.go(&target)
            }
        }
    }

    async fn render(&mut self) -> BrowserResult<RenderedPage> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let url = self
            .current
            .clone()
            .ok_or_else(|| BrowserError::Command("no page loaded".to_string()))?;
        let dom = match &self.view {
            Some(dom) => dom.clone(),
            None => self.pages.get(&url).cloned().unwrap_or_default(),
        };

        Ok(RenderedPage { url, dom })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.closed = true;
        Ok(())
    }
}

fn page_dom(path: &str, body: &str) -> String {
    format!("<html><head><title>{}</title></head><body>{}</body></html>", path, body)
}

/// Absolute URL of a path under `ROOT`
pub fn url(path: &str) -> String {
    format!("{}{}", ROOT, path.trim_start_matches('/'))
}

/// Link markup to a path under `ROOT`
pub fn link(path: &str, text: &str) -> String {
    format!("<a href=\"/{}\">{}</a>", path.trim_start_matches('/'), text)
}

/// Configuration exploring `ROOT` with the given `[exploration]` body
pub fn config_with(exploration: &str) -> Config {
    parse_config(&format!(
        "[target]\nurl = \"{}\"\n\n[exploration]\n{}\n",
        ROOT, exploration
    ))
    .unwrap()
}
