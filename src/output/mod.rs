//! Output module for exporting scrape results
//!
//! This module handles:
//! - Writing courses as a JSON document
//! - Summarizing and printing run statistics

mod json;
pub mod stats;

pub use json::{export, write_json, ScrapeOutput};
pub use stats::{print_statistics, ScrapeStatistics};
