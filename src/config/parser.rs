use crate::config::types::Config;
use crate::config::validation::validate;
use crate::model::CourtType;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub start_year: Option<u16>,
    pub end_year: Option<u16>,
    pub workers: Option<usize>,
    pub court_types: Option<Vec<CourtType>>,
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use court_sweep::config::load_config;
///
/// let config = load_config(Path::new("court-sweep.toml")).unwrap();
/// println!("Workers: {}", config.crawl.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Applies command-line overrides and re-validates the result
pub fn apply_overrides(mut config: Config, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    if let Some(start_year) = overrides.start_year {
        config.crawl.start_year = start_year;
    }
    if let Some(end_year) = overrides.end_year {
        config.crawl.end_year = end_year;
    }
    if let Some(workers) = overrides.workers {
        config.crawl.workers = workers;
    }
    if let Some(court_types) = &overrides.court_types {
        config.crawl.court_types = court_types.clone();
    }

    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
