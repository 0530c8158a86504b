use serde::Deserialize;

/// Main configuration structure for the scraper
///
/// Every section is optional; a missing section or key falls back to the
/// values the catalog is known to tolerate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub fetcher: FetcherConfig,
    pub scraper: ScraperConfig,
}

/// Which HTML layout the catalog serves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Current div-based layout
    #[default]
    Div,
    /// Older table-based layout
    Table,
}

/// Upstream catalog endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Origin of the catalog, also used to absolutize syllabus links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the single endpoint every request is posted to
    pub endpoint: String,

    /// HTML layout the course parser should expect
    pub layout: LayoutKind,

    /// User-agent strings rotated per request
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://shnaton.huji.ac.il".to_string(),
            endpoint: "/index.php".to_string(),
            layout: LayoutKind::Div,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

/// HTTP behaviour: retries, concurrency and session lifecycle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Total attempts per request, including the first
    pub retries: u32,

    /// Maximum requests in flight at once
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Idle connections kept per host
    #[serde(rename = "max-idle-connections")]
    pub max_idle_connections: usize,

    /// Never reuse a connection
    #[serde(rename = "force-close")]
    pub force_close: bool,

    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,

    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Timeout enforced by the HTTP client itself
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Outer deadline per attempt, must exceed `request_timeout_ms`
    #[serde(rename = "hard-timeout-ms")]
    pub hard_timeout_ms: u64,

    /// Backoff after failed attempt n (from 1) is `unit * (2^n + U(0,1))`
    #[serde(rename = "backoff-unit-ms")]
    pub backoff_unit_ms: u64,

    /// Upper bound of the random sleep before each attempt
    #[serde(rename = "max-jitter-ms")]
    pub max_jitter_ms: u64,

    /// Completed requests after which a session is replaced
    #[serde(rename = "recycle-after")]
    pub recycle_after: u64,

    /// Admission pause after an error-triggered recovery
    #[serde(rename = "cooldown-ms")]
    pub cooldown_ms: u64,

    /// Minimum spacing between two recoveries
    #[serde(rename = "recovery-interval-ms")]
    pub recovery_interval_ms: u64,

    /// How long a replaced session stays alive for in-flight requests
    #[serde(rename = "grace-period-ms")]
    pub grace_period_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            max_concurrency: 100,
            max_idle_connections: 20,
            force_close: false,
            accept_invalid_certs: true,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            hard_timeout_ms: 90_000,
            backoff_unit_ms: 1_000,
            max_jitter_ms: 500,
            recycle_after: 200,
            cooldown_ms: 30_000,
            recovery_interval_ms: 5_000,
            grace_period_ms: 10_000,
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Abort the batch once this many courses are reported missing
    #[serde(rename = "missing-course-limit")]
    pub missing_course_limit: Option<usize>,

    #[serde(rename = "include-exams")]
    pub include_exams: bool,

    /// Parses slower than this are logged as warnings
    #[serde(rename = "slow-parse-ms")]
    pub slow_parse_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            missing_course_limit: None,
            include_exams: true,
            slow_parse_ms: 5_000,
        }
    }
}
