use crate::config::types::{CalendarConfig, Config, CrawlConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on worker threads; the site does not tolerate more
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawl_config(&config.crawl)?;
    validate_calendar_config(&config.calendar)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates remote site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    url.join(&config.court_list_path).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid court_list_path '{}': {}",
            config.court_list_path, e
        ))
    })?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.start_year > config.end_year {
        return Err(ConfigError::Validation(format!(
            "start_year ({}) must not be after end_year ({})",
            config.start_year, config.end_year
        )));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.delay_min_ms > config.delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "delay_min_ms ({}) must not exceed delay_max_ms ({})",
            config.delay_min_ms, config.delay_max_ms
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch_size must be >= 1".to_string(),
        ));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    if config.court_types.is_empty() {
        return Err(ConfigError::Validation(
            "court_types must list at least one court type".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for court_type in &config.court_types {
        if !seen.insert(court_type) {
            return Err(ConfigError::Validation(format!(
                "court type '{}' is listed more than once",
                court_type
            )));
        }
    }

    Ok(())
}

/// Validates the calendar month table
fn validate_calendar_config(config: &CalendarConfig) -> Result<(), ConfigError> {
    config
        .month_table()
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("month_lengths: {}", e)))
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    for (name, path) in [
        ("log_file", &config.log_file),
        ("dataset_file", &config.dataset_file),
        ("summary_file", &config.summary_file),
        ("progress_db", &config.progress_db),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}
