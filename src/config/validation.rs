use crate::config::types::{ApiConfig, CatalogConfig, Config, HttpConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// The volumes API rejects `maxResults` above this value
const API_MAX_PAGE_SIZE: u32 = 40;

/// Upper bound on retry budgets; each retry at least doubles the wait
const MAX_RETRIES_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_http_config(&config.http)?;
    validate_api_config(&config.api)?;
    validate_catalog_config(&config.catalog)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the volumes API section
fn validate_api_config(config: &ApiConfig) -> ConfigResult<()> {
    validate_http_url(&config.base_url, "api base_url")?;

    if config.page_size < 1 || config.page_size > API_MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "api page_size must be between 1 and {}, got {}",
            API_MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.max_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "api max_requests must be >= 1, got {}",
            config.max_requests
        )));
    }

    validate_retries(config.max_retries, "api")?;
    validate_stale_pages(config.max_stale_pages, "api")?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "api timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_path(&config.output_path, "api output_path")?;
    validate_worklist(&config.queries, "api queries")?;

    Ok(())
}

/// Validates the HTML catalog section
fn validate_catalog_config(config: &CatalogConfig) -> ConfigResult<()> {
    let base = validate_http_url(&config.base_url, "catalog base_url")?;

    base.join(&config.search_path).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid catalog search_path '{}': {}",
            config.search_path, e
        ))
    })?;

    if config.max_offset < 1 {
        return Err(ConfigError::Validation(format!(
            "catalog max_offset must be >= 1, got {}",
            config.max_offset
        )));
    }

    if config.max_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "catalog max_requests must be >= 1, got {}",
            config.max_requests
        )));
    }

    validate_retries(config.max_retries, "catalog")?;
    validate_stale_pages(config.max_stale_pages, "catalog")?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "catalog timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_path(&config.output_path, "catalog output_path")?;
    validate_worklist(&config.categories, "catalog categories")?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    validate_path(&config.merged_path, "merged_path")?;
    validate_path(&config.cleaned_path, "cleaned_path")?;

    Ok(())
}

fn validate_http_url(raw: &str, what: &str) -> ConfigResult<Url> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", what, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    Ok(url)
}

fn validate_retries(max_retries: u32, section: &str) -> ConfigResult<()> {
    if max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "{} max_retries must be <= {}, got {}",
            section, MAX_RETRIES_LIMIT, max_retries
        )));
    }
    Ok(())
}

fn validate_stale_pages(max_stale_pages: Option<u32>, section: &str) -> ConfigResult<()> {
    if max_stale_pages == Some(0) {
        return Err(ConfigError::Validation(format!(
            "{} max_stale_pages must be >= 1 when set",
            section
        )));
    }
    Ok(())
}

fn validate_path(path: &str, what: &str) -> ConfigResult<()> {
    if path.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// A worklist must be non-empty and must not contain blank entries
fn validate_worklist(items: &[String], what: &str) -> ConfigResult<()> {
    if items.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} must contain at least one entry",
            what
        )));
    }

    if items.iter().any(|item| item.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{} cannot contain blank entries",
            what
        )));
    }

    Ok(())
}
