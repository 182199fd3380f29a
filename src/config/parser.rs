use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses and validates a TOML configuration file
///
/// Missing sections and keys fall back to their defaults, so an empty file
/// yields the stock collection setup.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use biblio_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Catalog categories: {}", config.catalog.categories.len());
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    load_config_with_hash(path).map(|(config, _)| config)
}

/// Hex-encoded SHA-256 of the raw configuration file
///
/// Logged at the start of every run so checkpoints can be traced back to
/// the configuration that produced them.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    Ok(content_hash(&std::fs::read(path)?))
}

/// Loads a configuration together with the hash of the text it was parsed from
///
/// The file is read once, so the hash always describes the parsed content.
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(
        "{}: {} API queries, {} catalog categories",
        path.display(),
        config.api.queries.len(),
        config.catalog.categories.len()
    );
    Ok((config, content_hash(content.as_bytes())))
}

fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[api]
page-size = 20
max-per-query = 100
api-key = "secret"
queries = ["fiction", "mystery"]

[catalog]
target-total = 50
max-stale-pages = 3
categories = ["Poetry"]
fetch-details = true

[output]
checkpoint-interval = 25
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.api.max_per_query, 100);
        assert_eq!(config.api.queries, vec!["fiction", "mystery"]);
        assert_eq!(config.catalog.target_total, Some(50));
        assert_eq!(config.catalog.max_stale_pages, Some(3));
        assert!(config.catalog.fetch_details);
        assert_eq!(config.output.checkpoint_interval, 25);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.api.page_size, 40);
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.api.rate_limit_backoff_secs, 60);
        assert_eq!(config.api.queries.len(), 30);
        assert_eq!(config.catalog.max_stale_pages, Some(5));
        assert_eq!(config.catalog.target_total, Some(10_000));
        assert_eq!(config.output.checkpoint_interval, 100);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[api]
page-size = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_loaded_hash_matches_file_hash() {
        let file = create_temp_config("[output]\ncheckpoint-interval = 10\n");

        let (config, loaded_hash) = load_config_with_hash(file.path()).unwrap();
        let file_hash = compute_config_hash(file.path()).unwrap();

        assert_eq!(config.output.checkpoint_interval, 10);
        assert_eq!(loaded_hash, file_hash);
        assert_eq!(file_hash.len(), 64);
    }

    #[test]
    fn test_bad_catalog_url_is_rejected() {
        let result = parse_config("[catalog]\nbase-url = \"not a url\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("[api]\npage-size = 10");
        let file2 = create_temp_config("[api]\npage-size = 20");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
