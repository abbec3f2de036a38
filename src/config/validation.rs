use crate::browser::Engine;
use crate::config::types::{BrowserConfig, Config, ExplorationPolicy, LoginConfig, OutputConfig, TargetConfig};
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target(&config.target)?;
    if let Some(login) = &config.login {
        validate_login(login)?;
    }
    validate_exploration(&config.exploration)?;
    validate_browser(&config.browser)?;
    validate_output(&config.output)?;
    Ok(())
}

/// Validates the target URL and browser list
fn validate_target(target: &TargetConfig) -> Result<(), ConfigError> {
    validate_http_url("target.url", &target.url)?;

    if target.browsers.is_empty() {
        return Err(ConfigError::Validation(
            "target.browsers must name at least one engine".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for name in &target.browsers {
        let engine: Engine = name
            .parse()
            .map_err(|e| ConfigError::Validation(format!("target.browsers: {}", e)))?;
        if !seen.insert(engine) {
            return Err(ConfigError::Validation(format!(
                "target.browsers lists engine '{}' more than once",
                engine
            )));
        }
    }

    Ok(())
}

/// Validates the login prelude
fn validate_login(login: &LoginConfig) -> Result<(), ConfigError> {
    validate_http_url("login.url", &login.url)?;

    for (field, value) in [
        ("login.username", &login.username),
        ("login.username-selector", &login.username_selector),
        ("login.password-selector", &login.password_selector),
        ("login.submit-selector", &login.submit_selector),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
        }
    }

    Ok(())
}

/// Validates the exploration policy
fn validate_exploration(policy: &ExplorationPolicy) -> Result<(), ConfigError> {
    if policy.depth_levels < 1 {
        return Err(ConfigError::Validation(format!(
            "exploration.depth-levels must be >= 1, got {}",
            policy.depth_levels
        )));
    }

    if policy.state_ceiling == Some(0) {
        return Err(ConfigError::Validation(
            "exploration.state-ceiling must be >= 1 when set".to_string(),
        ));
    }

    validate_patterns("exploration.fingerprint-exclusions", &policy.fingerprint_exclusions)?;
    validate_patterns("exploration.link-exclusions", &policy.link_exclusions)?;

    Ok(())
}

/// Validates browser session settings
fn validate_browser(browser: &BrowserConfig) -> Result<(), ConfigError> {
    if browser.command_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "browser.command-timeout-ms must be >= 100ms, got {}ms",
            browser.command_timeout_ms
        )));
    }

    for (name, endpoint) in &browser.endpoints {
        name.parse::<Engine>()
            .map_err(|e| ConfigError::Validation(format!("browser.endpoints: {}", e)))?;
        validate_http_url(&format!("browser.endpoints.{}", name), endpoint)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output.results-dir cannot be empty".to_string(),
        ));
    }

    if output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "output.database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a value parses as an http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Checks that every pattern compiles as a regex
fn validate_patterns(field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", field, pattern, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("f", "http://localhost:2368/ghost/").is_ok());
        assert!(validate_http_url("f", "https://example.com").is_ok());

        assert!(validate_http_url("f", "").is_err());
        assert!(validate_http_url("f", "localhost:2368").is_err());
        assert!(validate_http_url("f", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_patterns() {
        assert!(validate_patterns("f", &["(?i)csrf".to_string()]).is_ok());
        assert!(matches!(
            validate_patterns("f", &["(unclosed".to_string()]),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_duplicate_engines_rejected() {
        let target = TargetConfig {
            url: "http://localhost:2368/".to_string(),
            browsers: vec!["chromium".to_string(), "chrome".to_string()],
        };
        assert!(validate_target(&target).is_err());
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let target = TargetConfig {
            url: "http://localhost:2368/".to_string(),
            browsers: vec!["netscape".to_string()],
        };
        assert!(validate_target(&target).is_err());
    }

    #[test]
    fn test_zero_state_ceiling_rejected() {
        let policy = ExplorationPolicy {
            state_ceiling: Some(0),
            ..Default::default()
        };
        assert!(validate_exploration(&policy).is_err());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let policy = ExplorationPolicy {
            depth_levels: 0,
            ..Default::default()
        };
        assert!(validate_exploration(&policy).is_err());
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(validate_exploration(&ExplorationPolicy::default()).is_ok());
        assert!(validate_browser(&BrowserConfig::default()).is_ok());
        assert!(validate_output(&OutputConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_endpoint_engine_rejected() {
        let mut browser = BrowserConfig::default();
        browser
            .endpoints
            .insert("lynx".to_string(), "http://localhost:1".to_string());
        assert!(validate_browser(&browser).is_err());
    }
}
