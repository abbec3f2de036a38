use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "_ga",
];

/// Options controlling which URL noise is stripped before fingerprinting
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Extra query parameters to drop (in addition to tracking parameters)
    pub ignored_query_params: Vec<String>,

    /// Whether to drop the fragment. Hash-routed applications keep their
    /// route in the fragment, so this is off unless asked for.
    pub strip_fragment: bool,
}

/// Normalizes a URL so that renders of the same logical page compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only accept http, https and file schemes
/// 3. Lowercase the host (the `url` crate also drops default ports)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove tracking and ignored query parameters
/// 6. Sort remaining query parameters alphabetically
/// 7. Remove empty query string (trailing ?)
/// 8. Remove the fragment when `strip_fragment` is set
///
/// # Examples
///
/// ```
/// use sumi_atlas::url::{normalize_url, NormalizeOptions};
///
/// let url = normalize_url("http://EXAMPLE.COM/ghost/?b=2&a=1#/posts", &NormalizeOptions::default()).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/ghost?a=1&b=2#/posts");
/// ```
pub fn normalize_url(url_str: &str, options: &NormalizeOptions) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https" | "file") {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP, HTTPS and file schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.scheme() != "file" {
        let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url, &options.ignored_query_params);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    if options.strip_fragment || url.fragment() == Some("") {
        url.set_fragment(None);
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking/ignored parameters and sorts the remaining ones
fn filter_and_sort_query_params(url: &Url, ignored: &[String]) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key) && !ignored.iter().any(|i| i == key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
