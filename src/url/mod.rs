//! URL handling module for Sumi-Atlas
//!
//! This module provides URL normalization for state fingerprinting and
//! origin checks used to decide which links count as transitions.

mod normalize;

pub use normalize::{normalize_url, NormalizeOptions};

use url::Url;

/// Checks whether two URLs share the same origin (scheme, host and port)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_atlas::url::same_origin;
///
/// let root = Url::parse("http://localhost:2368/ghost/").unwrap();
/// assert!(same_origin(&root, &Url::parse("http://localhost:2368/ghost/#/posts").unwrap()));
/// assert!(!same_origin(&root, &Url::parse("https://ghost.org/").unwrap()));
/// ```
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
