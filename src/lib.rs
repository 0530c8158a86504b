//! Shnaton scraper: typed course records from the university course catalog
//!
//! This crate fetches server-rendered catalog pages (single course, exam dates,
//! paginated program search) and turns them into `Course`, `Lesson` and `Exam`
//! records, tolerating an unreliable upstream along the way.

pub mod config;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parse;
pub mod scrape;

use std::time::Duration;
use thiserror::Error;

/// Main error type for scrape runs
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch {entity}: {source}")]
    Fetch {
        entity: String,
        #[source]
        source: FetchError,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Too many missing courses: {missing} reached the limit of {limit}")]
    TooManyMissing { missing: usize, limit: usize },

    #[error("Parse worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by the fetch layer once retries are exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport's own error, including non-success statuses
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} abandoned after {timeout:?}")]
    HardTimeout { url: String, timeout: Duration },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Fetcher has been shut down")]
    Closed,
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors (4xx) are permanent except for 408 and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => match e.status() {
                Some(status) if status.is_client_error() => {
                    status == reqwest::StatusCode::REQUEST_TIMEOUT
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                }
                _ => !e.is_builder(),
            },
            FetchError::HardTimeout { .. } => true,
            FetchError::ClientBuild(_) | FetchError::Closed => false,
        }
    }
}

/// Errors raised while turning catalog HTML into records
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Missing element: {0}")]
    MissingElement(String),

    #[error("Invalid number in {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Expected {expected} fields in {context}, found {found}")]
    FieldCount {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Invalid pattern: {0}")]
    Pattern(String),
}

/// Result type alias for scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for parse operations
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{Fetcher, FetchTask};
pub use model::{Course, Exam, Lesson, Semester};
pub use parse::{CourseParser, Layout};
pub use scrape::{ScrapeReport, Scraper};
