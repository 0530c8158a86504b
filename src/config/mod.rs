//! Configuration module for the scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shnaton_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shnaton.toml")).unwrap();
//! println!("Requests will be retried {} times", config.fetcher.retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, FetcherConfig, LayoutKind, ScraperConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default};
pub use validation::validate;
