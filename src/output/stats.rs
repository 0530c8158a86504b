//! Run statistics
//!
//! Summarizes a [`ScrapeReport`] and prints it once a run is over.

use crate::scrape::ScrapeReport;
use std::time::Duration;

/// Scrape run statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeStatistics {
    /// Course ids requested, or results pages for program searches
    pub requested: usize,

    /// Courses returned
    pub found: usize,

    /// Courses the catalog did not know
    pub missing: usize,

    /// Entities skipped because of errors
    pub failed: usize,

    /// Results pages fetched
    pub pages: u32,

    /// Returned courses that carry exam dates
    pub with_exams: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl ScrapeStatistics {
    pub fn from_report(report: &ScrapeReport, requested: usize, elapsed: Duration) -> Self {
        Self {
            requested,
            found: report.courses.len(),
            missing: report.missing.len(),
            failed: report.failed.len(),
            pages: report.pages,
            with_exams: report.courses.iter().filter(|c| c.has_exams()).count(),
            elapsed,
        }
    }

    /// Share of requested entities that produced a course, in percent
    pub fn success_rate(&self) -> f64 {
        if self.requested > 0 {
            (self.found as f64 / self.requested as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// Stdout is left to the JSON export.
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `report` - The report the statistics came from, for failure details
pub fn print_statistics(stats: &ScrapeStatistics, report: &ScrapeReport) {
    eprintln!("=== Scrape Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Requested: {}", stats.requested);
    eprintln!("  Courses found: {}", stats.found);
    eprintln!("  With exams: {}", stats.with_exams);
    eprintln!("  Missing: {}", stats.missing);
    eprintln!("  Failed: {}", stats.failed);
    if stats.pages > 0 {
        eprintln!("  Result pages: {}", stats.pages);
    }
    eprintln!("  Duration: {:.1}s", stats.elapsed.as_secs_f64());
    eprintln!();

    if !report.failed.is_empty() {
        eprintln!("Failures ({}):", report.failed.len());
        for failure in &report.failed {
            eprintln!("  - {}: {}", failure.entity, failure.error);
        }
        eprintln!();
    }

    if stats.pages == 0 {
        eprintln!(
            "Success Rate: {:.1}% ({} / {} courses scraped)",
            stats.success_rate(),
            stats.found,
            stats.requested
        );
    }
}
