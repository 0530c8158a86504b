//! Orchestration of whole scrape runs
//!
//! Combines the fetcher and the parsers over a list of course ids or a
//! paginated program search, and reports what was found, missing or failed.

mod coordinator;
mod dedup;

pub use coordinator::{Failure, ScrapeReport, Scraper, MISSING_COURSE_TEXT};
pub use dedup::dedup_courses;
