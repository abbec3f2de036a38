//! DOM canonicalization
//!
//! Produces a text form of a rendered document that is stable under
//! whitespace changes, attribute order, and configured volatile fragments
//! (CSRF tokens, nonces, timestamps).

use regex::Regex;
use scraper::node::Node;
use scraper::Html;

/// Elements whose subtree never contributes to a state's identity
const IGNORED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that exist in every parsed document, even an empty one
const SKELETON_ELEMENTS: &[&str] = &["html", "head", "body"];

/// Attributes carrying an element's payload
const VALUE_ATTRIBUTES: &[&str] = &["value", "content"];

/// Canonicalizes a serialized DOM
///
/// Every element becomes one line `depth<name attr="value" ...>` with
/// attributes sorted by name; every non-blank text node becomes one line
/// `depth#text` with whitespace collapsed. Comments are dropped.
///
/// Returns `None` when the document carries no content at all (no text and
/// no elements beyond the html/head/body skeleton).
pub fn canonicalize(dom: &str, exclusions: &[Regex]) -> Option<String> {
    if dom.trim().is_empty() {
        return None;
    }

    let document = Html::parse_document(dom);
    let mut lines: Vec<String> = Vec::new();
    let mut has_content = false;

    for node in document.tree.root().descendants() {
        let in_ignored_subtree = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if IGNORED_ELEMENTS.contains(&el.name()))
        });
        if in_ignored_subtree {
            continue;
        }

        let depth = node.ancestors().count();

        match node.value() {
            Node::Element(element) => {
                let name = element.name();
                if IGNORED_ELEMENTS.contains(&name) {
                    continue;
                }
                if !SKELETON_ELEMENTS.contains(&name) {
                    has_content = true;
                }

                // A volatile marker on an element also hides the value it carries,
                // e.g. <input name="csrf_token" value="..."> or <meta name="csrf-token" content="...">
                let marked = element
                    .attrs()
                    .any(|(attr, value)| is_excluded_attribute(attr, value, exclusions));

                let mut attrs: Vec<(&str, &str)> = element
                    .attrs()
                    .filter(|(attr, value)| !is_excluded_attribute(attr, value, exclusions))
                    .filter(|(attr, _)| !(marked && VALUE_ATTRIBUTES.contains(attr)))
                    .collect();
                attrs.sort();

                let mut line = format!("{}<{}", depth, name);
                for (attr, value) in attrs {
                    line.push_str(&format!(" {}=\"{}\"", attr, collapse_whitespace(value)));
                }
                line.push('>');
                lines.push(line);
            }
            Node::Text(text) => {
                let cleaned = erase_exclusions(text, exclusions);
                if !cleaned.is_empty() {
                    has_content = true;
                    lines.push(format!("{}#{}", depth, cleaned));
                }
            }
            _ => {}
        }
    }

    if !has_content {
        return None;
    }

    Some(lines.join("\n"))
}

/// An attribute is excluded when a pattern matches its name or `name=value`
fn is_excluded_attribute(name: &str, value: &str, exclusions: &[Regex]) -> bool {
    if exclusions.is_empty() {
        return false;
    }
    let pair = format!("{}={}", name, value);
    exclusions
        .iter()
        .any(|pattern| pattern.is_match(name) || pattern.is_match(&pair))
}

/// Removes every exclusion match from a text node, then collapses whitespace
fn erase_exclusions(text: &str, exclusions: &[Regex]) -> String {
    let mut cleaned = collapse_whitespace(text);
    for pattern in exclusions {
        if pattern.is_match(&cleaned) {
            cleaned = collapse_whitespace(&pattern.replace_all(&cleaned, ""));
        }
    }
    cleaned
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
