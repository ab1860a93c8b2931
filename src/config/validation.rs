use crate::config::types::{Config, LinkcheckConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use std::time::Duration;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_linkcheck_config(&config.linkcheck)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates link checking configuration
fn validate_linkcheck_config(config: &LinkcheckConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if let Some(timeout) = config.timeout {
        validate_seconds("timeout", timeout)?;
    }
    validate_seconds("rate-limit-timeout", config.rate_limit_timeout)?;

    for pattern in config
        .ignore
        .iter()
        .chain(config.anchors_ignore.iter())
        .chain(config.auth.iter().map(|entry| &entry.pattern))
    {
        validate_regex(pattern)?;
    }

    for key in config.request_headers.keys() {
        validate_header_key(key)?;
    }

    Ok(())
}

/// Checks that `value` is a positive number of seconds that fits in a
/// `Duration`
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && Duration::try_from_secs_f64(value).is_ok() {
        return Ok(());
    }
    Err(ConfigError::Validation(format!(
        "{} must be a positive number of seconds, got {}",
        name, value
    )))
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a pattern compiles as a regex
fn validate_regex(pattern: &str) -> Result<(), ConfigError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Request-header keys are either `*` or an absolute URI
fn validate_header_key(key: &str) -> Result<(), ConfigError> {
    if key == "*" {
        return Ok(());
    }

    Url::parse(key)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid request-headers key '{}': {}", key, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
