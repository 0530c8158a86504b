//! Scrape orchestration
//!
//! The coordinator drives a whole run:
//! - building requests for every course id or results page
//! - fetching them concurrently through the shared [`Fetcher`]
//! - recognising courses the catalog does not know
//! - parsing off the async workers and attaching exams
//! - collecting per-entity failures without aborting the batch

use crate::config::ScraperConfig;
use crate::fetch::{Catalog, FetchTask, Fetcher, MaslulQuery};
use crate::model::Course;
use crate::parse::{page_count, parse_exams, parse_page, CourseParser, PageCourses};
use crate::scrape::dedup::dedup_courses;
use crate::{ParseError, ScrapeError};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Text the catalog prints instead of a course that does not exist
pub const MISSING_COURSE_TEXT: &str = "לא נמצא קורס";

/// An entity that was skipped because of an error
#[derive(Debug)]
pub struct Failure {
    /// What was being scraped, e.g. "course 41800 (2025)"
    pub entity: String,
    pub error: ScrapeError,
}

/// Outcome of a scrape run
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Successfully scraped courses
    pub courses: Vec<Course>,

    /// Course ids the catalog reported as not found
    pub missing: Vec<String>,

    /// Entities skipped because of fetch or parse errors
    pub failed: Vec<Failure>,

    /// Results pages fetched (program searches only)
    pub pages: u32,
}

enum CourseOutcome {
    Found(Course),
    Missing(String),
    Failed(Failure),
}

/// Drives fetchers and parsers across a batch of courses or a program search
pub struct Scraper {
    fetcher: Arc<Fetcher>,
    catalog: Catalog,
    parser: Arc<dyn CourseParser>,
    config: ScraperConfig,
    progress: ProgressBar,
}

impl Scraper {
    /// Creates a new scraper
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher; the caller stays responsible for shutting it down
    /// * `catalog` - Request builder for the catalog endpoints
    /// * `parser` - Course parser for the configured layout
    /// * `config` - Missing-course limit and slow-parse threshold
    pub fn new(
        fetcher: Arc<Fetcher>,
        catalog: Catalog,
        parser: Arc<dyn CourseParser>,
        config: ScraperConfig,
    ) -> Self {
        Self {
            fetcher,
            catalog,
            parser,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports progress on `bar` as entities complete
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    /// Scrapes a list of courses for one academic year
    ///
    /// All courses are requested at once (the fetcher bounds how many are
    /// actually in flight) and collected in completion order, so the output
    /// order does not follow `course_ids`.
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeReport)` - Found courses plus missing and failed ids
    /// * `Err(ScrapeError::TooManyMissing)` - The missing-course limit was reached
    pub async fn scrape_courses(
        &self,
        course_ids: &[String],
        year: u16,
        include_exams: bool,
    ) -> Result<ScrapeReport, ScrapeError> {
        tracing::info!(
            "Scraping {} courses for {} (exams: {})",
            course_ids.len(),
            year,
            include_exams
        );
        self.progress.set_length(course_ids.len() as u64);

        let mut pending: FuturesUnordered<_> = course_ids
            .iter()
            .map(|course_id| self.scrape_single(course_id, year, include_exams))
            .collect();

        let mut report = ScrapeReport::default();
        while let Some(outcome) = pending.next().await {
            self.progress.inc(1);
            match outcome {
                CourseOutcome::Found(course) => report.courses.push(course),
                CourseOutcome::Missing(course_id) => {
                    report.missing.push(course_id);
                    if let Some(limit) = self.config.missing_course_limit {
                        if report.missing.len() >= limit {
                            tracing::error!(
                                "{} courses missing, aborting batch",
                                report.missing.len()
                            );
                            return Err(ScrapeError::TooManyMissing {
                                missing: report.missing.len(),
                                limit,
                            });
                        }
                    }
                }
                CourseOutcome::Failed(failure) => report.failed.push(failure),
            }
        }

        tracing::info!(
            "Scraped {} courses ({} missing, {} failed)",
            report.courses.len(),
            report.missing.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn scrape_single(&self, course_id: &str, year: u16, include_exams: bool) -> CourseOutcome {
        let task = self.catalog.course_task(course_id, year);
        let entity = task.kind().to_string();

        let html = match self.fetch(&task).await {
            Ok(html) => html,
            Err(error) => return CourseOutcome::Failed(Failure { entity, error }),
        };

        if html.contains(MISSING_COURSE_TEXT) {
            tracing::debug!("Course {} not found in {}", course_id, year);
            return CourseOutcome::Missing(course_id.to_string());
        }

        let parser = Arc::clone(&self.parser);
        let mut course = match self
            .offload(&entity, move || parser.parse(&html))
            .await
        {
            Ok(course) => course,
            Err(error) => {
                tracing::warn!("Failed to parse {}: {}", entity, error);
                return CourseOutcome::Failed(Failure { entity, error });
            }
        };

        if include_exams {
            if let Err(failure) = self.attach_exams(&mut course, year).await {
                return CourseOutcome::Failed(failure);
            }
        }

        CourseOutcome::Found(course)
    }

    /// Fetches, parses and attaches the exams of `course`
    ///
    /// On failure the course is left untouched.
    async fn attach_exams(&self, course: &mut Course, year: u16) -> Result<(), Failure> {
        let task = self.catalog.exams_task(&course.course_id, year);
        let entity = task.kind().to_string();

        let html = self
            .fetch(&task)
            .await
            .map_err(|error| Failure {
                entity: entity.clone(),
                error,
            })?;

        let exams = self
            .offload(&entity, move || parse_exams(&html))
            .await
            .map_err(|error| {
                tracing::warn!("Failed to parse {}: {}", entity, error);
                Failure {
                    entity: entity.clone(),
                    error,
                }
            })?;

        course.attach_exams(exams);
        Ok(())
    }

    /// Scrapes every results page of a program search
    ///
    /// Page 1 is fetched first to learn the page count, the remaining pages
    /// are fetched concurrently. Courses listed on several pages appear once,
    /// as first seen in page order.
    pub async fn scrape_maslul(
        &self,
        query: &MaslulQuery,
        include_exams: bool,
    ) -> Result<ScrapeReport, ScrapeError> {
        let first_task = self.catalog.search_page_task(query, 1);
        let first_html = self.fetch(&first_task).await?;

        let counter_html = first_html.clone();
        let total = self
            .offload("page counter", move || page_count(&counter_html))
            .await?
            .max(1);
        tracing::info!(
            "Program {} has {} result pages for {}",
            query.maslul,
            total,
            query.year
        );
        self.progress.set_length(u64::from(total));

        let mut report = ScrapeReport {
            pages: total,
            ..ScrapeReport::default()
        };
        let mut pages: Vec<(u32, PageCourses)> = Vec::with_capacity(total as usize);

        match self.parse_results(1, first_html).await {
            Ok(page) => pages.push((1, page)),
            Err(failure) => report.failed.push(failure),
        }
        self.progress.inc(1);

        let mut pending: FuturesUnordered<_> = (2..=total)
            .map(|page| self.fetch_results(query, page))
            .collect();
        while let Some((page, outcome)) = pending.next().await {
            self.progress.inc(1);
            match outcome {
                Ok(courses) => pages.push((page, courses)),
                Err(failure) => report.failed.push(failure),
            }
        }

        self.finish_pages(pages, include_exams, query.year, report)
            .await
    }

    /// Scrapes a single results page of a program search
    pub async fn scrape_maslul_page(
        &self,
        query: &MaslulQuery,
        page: u32,
        include_exams: bool,
    ) -> Result<ScrapeReport, ScrapeError> {
        self.progress.set_length(1);
        let (page, outcome) = self.fetch_results(query, page).await;
        self.progress.inc(1);

        let mut report = ScrapeReport {
            pages: 1,
            ..ScrapeReport::default()
        };
        let pages = match outcome {
            Ok(courses) => vec![(page, courses)],
            Err(failure) => {
                report.failed.push(failure);
                Vec::new()
            }
        };

        self.finish_pages(pages, include_exams, query.year, report)
            .await
    }

    async fn fetch_results(
        &self,
        query: &MaslulQuery,
        page: u32,
    ) -> (u32, Result<PageCourses, Failure>) {
        let task = self.catalog.search_page_task(query, page);
        let outcome = match self.fetch(&task).await {
            Ok(html) => self.parse_results(page, html).await,
            Err(error) => Err(Failure {
                entity: task.kind().to_string(),
                error,
            }),
        };
        (page, outcome)
    }

    async fn parse_results(&self, page: u32, html: String) -> Result<PageCourses, Failure> {
        let entity = format!("search page {}", page);
        let parser = Arc::clone(&self.parser);
        self.offload(&entity, move || parse_page(parser.as_ref(), &html))
            .await
            .map_err(|error| Failure { entity, error })
    }

    /// Merges pages in page order, drops duplicates and attaches exams
    async fn finish_pages(
        &self,
        mut pages: Vec<(u32, PageCourses)>,
        include_exams: bool,
        year: u16,
        mut report: ScrapeReport,
    ) -> Result<ScrapeReport, ScrapeError> {
        pages.sort_by_key(|(page, _)| *page);

        let mut courses = Vec::new();
        for (page, results) in pages {
            for failure in results.failures {
                report.failed.push(Failure {
                    entity: format!("course block {} on search page {}", failure.index, page),
                    error: ScrapeError::Parse(failure.error),
                });
            }
            courses.extend(results.courses);
        }

        let found = courses.len();
        let mut courses = dedup_courses(courses);
        if courses.len() < found {
            tracing::debug!(
                "Dropped {} duplicate courses across pages",
                found - courses.len()
            );
        }

        if include_exams {
            courses = self.attach_all_exams(courses, year, &mut report).await;
        }

        report.courses = courses;
        tracing::info!(
            "Scraped {} courses from {} pages ({} failed)",
            report.courses.len(),
            report.pages,
            report.failed.len()
        );
        Ok(report)
    }

    /// Attaches exams to every course concurrently, keeping the input order
    async fn attach_all_exams(
        &self,
        courses: Vec<Course>,
        year: u16,
        report: &mut ScrapeReport,
    ) -> Vec<Course> {
        let mut pending: FuturesUnordered<_> = courses
            .into_iter()
            .enumerate()
            .map(|(index, mut course)| async move {
                let outcome = self.attach_exams(&mut course, year).await;
                (index, course, outcome)
            })
            .collect();

        let mut attached = Vec::new();
        while let Some((index, course, outcome)) = pending.next().await {
            match outcome {
                Ok(()) => attached.push((index, course)),
                Err(failure) => report.failed.push(failure),
            }
        }

        attached.sort_by_key(|(index, _)| *index);
        attached.into_iter().map(|(_, course)| course).collect()
    }

    async fn fetch(&self, task: &FetchTask) -> Result<String, ScrapeError> {
        self.fetcher
            .fetch(task)
            .await
            .map_err(|source| {
                let entity = task.kind().to_string();
                tracing::warn!("Failed to fetch {}: {}", entity, source);
                ScrapeError::Fetch { entity, source }
            })
    }

    /// Runs a parse on the blocking pool, warning when it is slow
    async fn offload<T, F>(&self, entity: &str, parse: F) -> Result<T, ScrapeError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ParseError> + Send + 'static,
    {
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(parse).await?;

        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(self.config.slow_parse_ms) {
            tracing::warn!("Parsing {} took {:?}", entity, elapsed);
        }

        Ok(result?)
    }
}
