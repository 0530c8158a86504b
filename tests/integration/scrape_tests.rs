//! Integration tests for fetching and scraping
//!
//! These tests use wiremock to stand in for the catalog and drive the
//! fetcher and scraper end-to-end.

use shnaton_scraper::config::{CatalogConfig, FetcherConfig, LayoutKind, ScraperConfig};
use shnaton_scraper::fetch::{Catalog, MaslulQuery};
use shnaton_scraper::model::{Semester, Toar, ToarYear};
use shnaton_scraper::parse::parser_for;
use shnaton_scraper::scrape::MISSING_COURSE_TEXT;
use shnaton_scraper::{FetchError, Fetcher, ScrapeError, Scraper};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COURSE_PAGE: &str = include_str!("../fixtures/course_div.html");
const EXAMS_PAGE: &str = include_str!("../fixtures/exams.html");
const RESULTS_PAGE: &str = include_str!("../fixtures/search_page.html");

/// Fetcher settings that keep tests fast: no jitter, tiny backoff, no cooldown
fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        retries: 3,
        max_concurrency: 10,
        connect_timeout_ms: 1_000,
        request_timeout_ms: 5_000,
        hard_timeout_ms: 10_000,
        backoff_unit_ms: 1,
        max_jitter_ms: 0,
        cooldown_ms: 0,
        recovery_interval_ms: 0,
        grace_period_ms: 10,
        ..FetcherConfig::default()
    }
}

fn catalog(server: &MockServer) -> Catalog {
    Catalog::new(&CatalogConfig {
        base_url: server.uri(),
        ..CatalogConfig::default()
    })
}

fn scraper(server: &MockServer, fetcher: Arc<Fetcher>, config: ScraperConfig) -> Scraper {
    let parser = parser_for(LayoutKind::Div, &server.uri()).unwrap();
    Scraper::new(fetcher, catalog(server), parser, config)
}

/// A results page with one div-layout block per course id
fn results_page(course_ids: &[&str]) -> String {
    let blocks: String = course_ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="course-block">
                  <div class="courseTitle">קורס</div>
                  <div class="data-school">הפקולטה למדעי הרוח: החוג לבלשנות</div>
                  <div class="title">קורס {id}</div>
                  <div class="subtitle">קורס {id}</div>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", blocks)
}

fn html_response(body: impl AsRef<str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(body.as_ref())
}

#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fetcher_config()).unwrap();
    let task = catalog(&server).course_task("41800", 2025);

    let result = fetcher.fetch(&task).await;

    match result {
        Err(FetchError::Http(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(500)),
        other => panic!("expected HTTP 500 error, got {:?}", other),
    }
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fetcher_config()).unwrap();
    let task = catalog(&server).course_task("41800", 2025);

    let error = fetcher.fetch(&task).await.unwrap_err();

    assert!(!error.is_retryable());
    assert_eq!(fetcher.sessions().generation(), 0);
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_hard_timeout_abandons_stuck_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&FetcherConfig {
        retries: 2,
        hard_timeout_ms: 100,
        ..fetcher_config()
    })
    .unwrap();
    let task = catalog(&server).course_task("41800", 2025);

    let error = fetcher.fetch(&task).await.unwrap_err();

    assert!(matches!(error, FetchError::HardTimeout { .. }));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_form_fields_and_user_agent_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/index.php"))
        .and(header_exists("user-agent"))
        .and(body_string_contains("peula=Simple"))
        .and(body_string_contains("year=2025"))
        .and(body_string_contains("course=41800"))
        .respond_with(html_response(COURSE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fetcher_config()).unwrap();
    let body = fetcher
        .fetch(&catalog(&server).course_task("41800", 2025))
        .await
        .unwrap();

    assert!(body.contains("41800"));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_failure_replaces_session_and_retry_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fetcher_config()).unwrap();
    let body = fetcher
        .fetch(&catalog(&server).course_task("41800", 2025))
        .await
        .unwrap();

    assert!(body.contains("41800"));
    assert!(
        fetcher
            .sessions()
            .wait_for_generation(1, Duration::from_secs(2))
            .await
    );
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_session_recycled_after_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&FetcherConfig {
        recycle_after: 2,
        ..fetcher_config()
    })
    .unwrap();
    let task = catalog(&server).course_task("41800", 2025);

    fetcher.fetch(&task).await.unwrap();
    assert_eq!(fetcher.sessions().generation(), 0);
    fetcher.fetch(&task).await.unwrap();

    assert!(
        fetcher
            .sessions()
            .wait_for_generation(1, Duration::from_secs(2))
            .await
    );
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_single_attempt_failure_still_replaces_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&FetcherConfig {
        retries: 1,
        ..fetcher_config()
    })
    .unwrap();

    let error = fetcher
        .fetch(&catalog(&server).course_task("41800", 2025))
        .await
        .unwrap_err();

    assert!(error.is_retryable());
    assert!(
        fetcher
            .sessions()
            .wait_for_generation(1, Duration::from_secs(2))
            .await
    );
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_retry_backs_off_at_least_two_units() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&FetcherConfig {
        retries: 2,
        backoff_unit_ms: 100,
        ..fetcher_config()
    })
    .unwrap();

    let started = Instant::now();
    let result = fetcher
        .fetch(&catalog(&server).course_task("41800", 2025))
        .await;

    assert!(result.is_err());
    // One backoff after the first failed attempt: 100ms * (2^1 + U(0,1))
    assert!(started.elapsed() >= Duration::from_millis(200));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_error_recovery_pauses_new_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;

    let fetcher = Arc::new(
        Fetcher::new(&FetcherConfig {
            cooldown_ms: 400,
            ..fetcher_config()
        })
        .unwrap(),
    );
    let catalog = catalog(&server);

    let failing = {
        let fetcher = Arc::clone(&fetcher);
        let task = catalog.course_task("41800", 2025);
        tokio::spawn(async move { fetcher.fetch(&task).await })
    };

    assert!(
        fetcher
            .sessions()
            .wait_for_generation(1, Duration::from_secs(2))
            .await
    );
    assert!(fetcher.admission().is_paused());

    let started = Instant::now();
    fetcher
        .fetch(&catalog.course_task("41801", 2025))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));

    // The failed request also waits out the cooldown before its retry
    failing.await.unwrap().unwrap();
    assert!(!fetcher.admission().is_paused());
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_recycling_does_not_pause_admission() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&FetcherConfig {
        recycle_after: 2,
        cooldown_ms: 60_000,
        ..fetcher_config()
    })
    .unwrap();
    let task = catalog(&server).course_task("41800", 2025);

    fetcher.fetch(&task).await.unwrap();
    fetcher.fetch(&task).await.unwrap();
    assert!(
        fetcher
            .sessions()
            .wait_for_generation(1, Duration::from_secs(2))
            .await
    );

    assert!(!fetcher.admission().is_paused());
    let next = tokio::time::timeout(Duration::from_secs(2), fetcher.fetch(&task)).await;
    assert!(matches!(next, Ok(Ok(_))));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(html_response(COURSE_PAGE).set_delay(Duration::from_millis(200)))
        .expect(6)
        .mount(&server)
        .await;

    let fetcher = Arc::new(
        Fetcher::new(&FetcherConfig {
            max_concurrency: 2,
            ..fetcher_config()
        })
        .unwrap(),
    );
    let catalog = catalog(&server);

    let started = Instant::now();
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let fetcher = Arc::clone(&fetcher);
            let task = catalog.course_task(&format!("4180{}", i), 2025);
            tokio::spawn(async move { fetcher.fetch(&task).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Six requests, two at a time, 200ms each
    assert!(started.elapsed() >= Duration::from_millis(550));
    assert_eq!(fetcher.admission().available(), fetcher.admission().limit());
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_scrape_courses_with_exams() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("peula=Simple"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("peula=CourseD"))
        .and(body_string_contains("detail=examDates"))
        .respond_with(html_response(EXAMS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(&server, Arc::clone(&fetcher), ScraperConfig::default());

    let report = scraper
        .scrape_courses(&["41800".to_string()], 2025, true)
        .await
        .unwrap();

    assert_eq!(report.courses.len(), 1);
    let course = &report.courses[0];
    assert_eq!(course.course_id, "41800");
    assert_eq!(course.hebrew_name, "מבוא לבלשנות");
    assert_eq!(course.schedule.len(), 4);

    let exams = course.exams.as_ref().unwrap();
    assert_eq!(exams.len(), 2);
    assert_eq!(exams[0].moed, "א");
    assert_eq!(exams[0].date, "28/01/2025");
    assert_eq!(exams[0].semester, Semester::A);
    assert_eq!(exams[1].notes, "");
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_scrape_courses_without_exams_skips_exam_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("peula=Simple"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("peula=CourseD"))
        .respond_with(html_response(EXAMS_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(&server, Arc::clone(&fetcher), ScraperConfig::default());

    let report = scraper
        .scrape_courses(&["41800".to_string()], 2025, false)
        .await
        .unwrap();

    assert_eq!(report.courses.len(), 1);
    assert!(report.courses[0].exams.is_none());
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_missing_and_broken_courses_are_isolated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("course=41800"))
        .respond_with(html_response(COURSE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("course=99999"))
        .respond_with(html_response(format!(
            "<html><body><p>{}</p></body></html>",
            MISSING_COURSE_TEXT
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("course=41899"))
        .respond_with(html_response("<html><body><div>nothing here</div></body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("course=41898"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(&server, Arc::clone(&fetcher), ScraperConfig::default());

    let ids: Vec<String> = ["41800", "99999", "41899", "41898"]
        .iter()
        .map(|id| id.to_string())
        .collect();
    let report = scraper.scrape_courses(&ids, 2025, false).await.unwrap();

    assert_eq!(report.courses.len(), 1);
    assert_eq!(report.courses[0].course_id, "41800");
    assert_eq!(report.missing, vec!["99999".to_string()]);
    assert_eq!(report.failed.len(), 2);

    let parse_failure = report
        .failed
        .iter()
        .find(|f| f.entity.contains("41899"))
        .unwrap();
    assert!(matches!(parse_failure.error, ScrapeError::Parse(_)));
    let fetch_failure = report
        .failed
        .iter()
        .find(|f| f.entity.contains("41898"))
        .unwrap();
    assert!(matches!(fetch_failure.error, ScrapeError::Fetch { .. }));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_missing_course_limit_aborts_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(html_response(format!(
            "<html><body>{}</body></html>",
            MISSING_COURSE_TEXT
        )))
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(
        &server,
        Arc::clone(&fetcher),
        ScraperConfig {
            missing_course_limit: Some(2),
            ..ScraperConfig::default()
        },
    );

    let ids: Vec<String> = (0..5).map(|i| format!("9990{}", i)).collect();
    let result = scraper.scrape_courses(&ids, 2025, false).await;

    match result {
        Err(ScrapeError::TooManyMissing { missing, limit }) => {
            assert_eq!(missing, 2);
            assert_eq!(limit, 2);
        }
        other => panic!("expected TooManyMissing, got {:?}", other),
    }
    fetcher.shutdown().await;
}

fn maslul_query() -> MaslulQuery {
    MaslulQuery {
        year: 2025,
        faculty: "2".to_string(),
        hug: "418".to_string(),
        maslul: "3240".to_string(),
        toar: Toar::Boger,
        toar_year: ToarYear::Any,
    }
}

#[tokio::test]
async fn test_scrape_maslul_merges_pages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("peula=Advanced"))
        .and(body_string_contains("maslul=3240"))
        .and(body_string_contains("starting=1"))
        .respond_with(html_response(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("starting=2"))
        .respond_with(html_response(results_page(&["41801", "41802"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("starting=3"))
        .respond_with(html_response(results_page(&["41803", "41800"])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(&server, Arc::clone(&fetcher), ScraperConfig::default());

    let report = scraper.scrape_maslul(&maslul_query(), false).await.unwrap();

    assert_eq!(report.pages, 3);
    let ids: Vec<_> = report.courses.iter().map(|c| c.course_id.as_str()).collect();
    assert_eq!(ids, vec!["41800", "41801", "41802", "41803"]);
    // First occurrence of 41801 comes from page 1
    assert_eq!(report.courses[1].english_name, "Syntax");
    // The malformed block on page 1
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].error, ScrapeError::Parse(_)));
    fetcher.shutdown().await;
}

#[tokio::test]
async fn test_scrape_single_maslul_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("starting=2"))
        .respond_with(html_response(results_page(&["41801", "41802"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("peula=CourseD"))
        .respond_with(html_response(EXAMS_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&fetcher_config()).unwrap());
    let scraper = scraper(&server, Arc::clone(&fetcher), ScraperConfig::default());

    let report = scraper
        .scrape_maslul_page(&maslul_query(), 2, true)
        .await
        .unwrap();

    let ids: Vec<_> = report.courses.iter().map(|c| c.course_id.as_str()).collect();
    assert_eq!(ids, vec!["41801", "41802"]);
    assert!(report.courses.iter().all(|c| c.has_exams()));
    assert!(report.failed.is_empty());
    fetcher.shutdown().await;
}
