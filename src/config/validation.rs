use crate::config::types::{CatalogConfig, Config, FetcherConfig, ScraperConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_scraper_config(&config.scraper)?;
    Ok(())
}

/// Validates the catalog endpoint settings
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.endpoint.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "endpoint must start with '/', got '{}'",
            config.endpoint
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents cannot be empty".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry, timeout and session settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 1000 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 1000, got {}",
            config.max_concurrency
        )));
    }

    if config.hard_timeout_ms <= config.request_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "hard-timeout-ms ({}) must exceed request-timeout-ms ({})",
            config.hard_timeout_ms, config.request_timeout_ms
        )));
    }

    if config.recycle_after < 1 {
        return Err(ConfigError::Validation(format!(
            "recycle-after must be >= 1, got {}",
            config.recycle_after
        )));
    }

    Ok(())
}

/// Validates orchestration settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.missing_course_limit == Some(0) {
        return Err(ConfigError::Validation(
            "missing-course-limit must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}
