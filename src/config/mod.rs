//! Configuration module for Court-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use court_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("court-sweep.toml")).unwrap();
//! println!("Searching {}..={}", config.crawl.start_year, config.crawl.end_year);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CalendarConfig, Config, CrawlConfig, OutputConfig, SiteConfig, TaskOrder, BROWSER_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    ConfigOverrides,
};
