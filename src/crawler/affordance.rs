//! Affordance enumeration from rendered HTML
//!
//! This module extracts the user actions a state offers:
//! - Links (`<a href>`), resolved against the page (or its `<base href>`)
//! - Forms, when input injection is enabled, with a synthetic value per field
//!
//! **Excluded links:**
//! - `javascript:`, `mailto:`, `tel:` and `data:` targets
//! - Same-page anchors (`#section`) and `download` links; hash routes
//!   (`#/posts`, `#!/posts`) are kept since they change the rendered state
//! - Targets off the root origin when `same-origin-only` is set
//! - Links whose href or text match a `link-exclusions` pattern

use crate::browser::{Affordance, FieldInput};
use crate::config::ExplorationPolicy;
use crate::synth::SyntheticContent;
use crate::url::same_origin;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Input types that never receive typed values
const UNTYPED_INPUTS: &[&str] = &[
    "hidden", "submit", "button", "reset", "image", "file", "checkbox", "radio",
];

/// Decides which affordances count as transitions
#[derive(Debug, Clone)]
pub struct AffordanceFilter {
    origin: Option<Url>,
    exclusions: Vec<Regex>,
    include_forms: bool,
}

impl AffordanceFilter {
    /// Builds the filter for a run rooted at `root`
    ///
    /// # Returns
    ///
    /// * `Ok(AffordanceFilter)` - Filter ready for use
    /// * `Err(ConfigError::InvalidPattern)` - A link exclusion is not a valid regex
    pub fn new(policy: &ExplorationPolicy, root: &Url) -> Result<Self, ConfigError> {
        let exclusions = policy
            .link_exclusions
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::InvalidPattern(format!("link exclusion '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin: policy.same_origin_only.then(|| root.clone()),
            exclusions,
            include_forms: policy.input_values,
        })
    }

    fn allows(&self, target: &Url, text: &str) -> bool {
        if let Some(origin) = &self.origin {
            if !same_origin(origin, target) {
                return false;
            }
        }

        !self
            .exclusions
            .iter()
            .any(|pattern| pattern.is_match(target.as_str()) || pattern.is_match(text))
    }
}

/// Extracts the affordances of a rendered page in document order
///
/// Links come first, then forms (only when the filter includes forms).
/// Exact duplicates (same target and text) are reported once.
///
/// # Arguments
///
/// * `dom` - Serialized DOM of the current state
/// * `page_url` - URL the DOM was rendered at
/// * `filter` - Policy filter
/// * `synth` - Source of form field values
pub fn extract_affordances(
    dom: &str,
    page_url: &Url,
    filter: &AffordanceFilter,
    synth: &mut SyntheticContent,
) -> Vec<Affordance> {
    let document = Html::parse_document(dom);
    let base_url = document_base(&document, page_url);

    let mut affordances = extract_links(&document, &base_url, filter);
    if filter.include_forms {
        affordances.extend(extract_forms(&document, synth));
    }

    affordances
}

/// Honors `<base href>` when present
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

fn extract_links(document: &Html, base_url: &Url, filter: &AffordanceFilter) -> Vec<Affordance> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(target) = element.value().attr("href").and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        let text = collapse_whitespace(&element.text().collect::<String>());
        if !filter.allows(&target, &text) {
            tracing::trace!("Link to {} excluded by policy", target);
            continue;
        }

        let href = target.to_string();
        if !seen.insert((href.clone(), text.clone())) {
            continue;
        }

        links.push(Affordance::Link {
            href,
            text,
            selector: css_path(&element),
        });
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Same-page anchors (hash routes are kept)
/// - Invalid URLs
/// - Non-HTTP(S)/file URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || is_same_page_anchor(href) {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https" | "file").then_some(absolute)
}

fn is_same_page_anchor(href: &str) -> bool {
    href.starts_with('#') && !href.starts_with("#/") && !href.starts_with("#!")
}

fn extract_forms(document: &Html, synth: &mut SyntheticContent) -> Vec<Affordance> {
    let (Ok(form_selector), Ok(field_selector), Ok(submit_selector)) = (
        Selector::parse("form"),
        Selector::parse("input, textarea"),
        Selector::parse("button[type=submit], button:not([type]), input[type=submit]"),
    ) else {
        return Vec::new();
    };

    let mut forms = Vec::new();

    for form in document.select(&form_selector) {
        let fields: Vec<FieldInput> = form
            .select(&field_selector)
            .filter(|field| is_typeable(field))
            .map(|field| {
                let element = field.value();
                let name = element
                    .attr("name")
                    .or_else(|| element.attr("id"))
                    .unwrap_or(element.name())
                    .to_string();
                let value = synth.value_for(&name, element.name(), element.attr("type"));

                FieldInput {
                    selector: css_path(&field),
                    name,
                    value,
                }
            })
            .collect();

        // A form with nothing to type into is just a button; clicking it adds no input
        if fields.is_empty() {
            continue;
        }

        let submit = form
            .select(&submit_selector)
            .find(|control| control.value().attr("disabled").is_none())
            .map(|control| css_path(&control));

        forms.push(Affordance::Form {
            selector: css_path(&form),
            fields,
            submit,
        });
    }

    forms
}

fn is_typeable(field: &ElementRef) -> bool {
    let element = field.value();
    if element.attr("disabled").is_some() || element.attr("readonly").is_some() {
        return false;
    }

    match element.attr("type") {
        Some(kind) if element.name() == "input" => {
            !UNTYPED_INPUTS.contains(&kind.to_ascii_lowercase().as_str())
        }
        _ => true,
    }
}

/// Builds a CSS selector addressing exactly this element
///
/// Uses the nearest ancestor with a simple `id` as anchor, then
/// `tag:nth-of-type(n)` steps down to the element.
fn css_path(element: &ElementRef) -> String {
    let mut steps = Vec::new();
    let mut current = Some(*element);

    while let Some(node) = current {
        let el = node.value();

        if let Some(id) = el.attr("id").filter(|id| is_simple_identifier(id)) {
            steps.push(format!("#{}", id));
            break;
        }

        let position = node
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == el.name())
            .count()
            + 1;
        steps.push(format!("{}:nth-of-type({})", el.name(), position));

        current = node.parent().and_then(ElementRef::wrap);
    }

    steps.reverse();
    steps.join(" > ")
}

fn is_simple_identifier(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
