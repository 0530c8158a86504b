//! Request descriptors for the catalog endpoints
//!
//! A [`FetchTask`] carries everything needed to issue one HTTP request and
//! nothing else; [`Catalog`] knows how the catalog expects each kind of
//! request to be shaped.

use crate::config::CatalogConfig;
use crate::model::{Prisa, Toar, ToarYear};
use rand::seq::SliceRandom;
use reqwest::Method;
use std::fmt;

/// Which logical entity a request is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Course { course_id: String, year: u16 },
    Exams { course_id: String, year: u16 },
    SearchPage { year: u16, page: u32 },
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Course { course_id, year } => write!(f, "course {} ({})", course_id, year),
            TaskKind::Exams { course_id, year } => {
                write!(f, "exams of course {} ({})", course_id, year)
            }
            TaskKind::SearchPage { year, page } => write!(f, "search page {} ({})", page, year),
        }
    }
}

/// One HTTP request against the catalog
#[derive(Debug, Clone)]
pub struct FetchTask {
    method: Method,
    url: String,
    form: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    kind: TaskKind,
}

impl FetchTask {
    pub fn new(method: Method, url: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            method,
            url: url.into(),
            form: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            kind,
        }
    }

    pub fn with_form(mut self, key: &str, value: impl ToString) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_header(mut self, key: &str, value: impl ToString) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Course this request is about, if any
    pub fn course_id(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Course { course_id, .. } | TaskKind::Exams { course_id, .. } => {
                Some(course_id)
            }
            TaskKind::SearchPage { .. } => None,
        }
    }

    pub fn year(&self) -> u16 {
        match &self.kind {
            TaskKind::Course { year, .. }
            | TaskKind::Exams { year, .. }
            | TaskKind::SearchPage { year, .. } => *year,
        }
    }

    /// Form value for `key`, used mostly by tests and logs
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Filters of the paginated program ("maslul") search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaslulQuery {
    pub year: u16,
    pub faculty: String,
    /// Department ("hug")
    pub hug: String,
    pub maslul: String,
    pub toar: Toar,
    pub toar_year: ToarYear,
}

/// Builds requests the way the catalog expects them
#[derive(Debug, Clone)]
pub struct Catalog {
    endpoint_url: String,
    user_agents: Vec<String>,
}

impl Catalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            endpoint_url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.endpoint
            ),
            user_agents: config.user_agents.clone(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn base_task(&self, kind: TaskKind) -> FetchTask {
        let task = FetchTask::new(Method::POST, self.endpoint_url.clone(), kind);
        match self.user_agents.choose(&mut rand::thread_rng()) {
            Some(agent) => task.with_header("User-Agent", agent),
            None => task,
        }
    }

    /// Single-course lookup
    pub fn course_task(&self, course_id: &str, year: u16) -> FetchTask {
        self.base_task(TaskKind::Course {
            course_id: course_id.to_string(),
            year,
        })
        .with_form("peula", "Simple")
        .with_form("maslul", 0)
        .with_form("shana", 0)
        .with_form("year", year)
        .with_form("course", course_id)
    }

    /// Exam dates of one course
    pub fn exams_task(&self, course_id: &str, year: u16) -> FetchTask {
        self.base_task(TaskKind::Exams {
            course_id: course_id.to_string(),
            year,
        })
        .with_form("peula", "CourseD")
        .with_form("year", year)
        .with_form("detail", "examDates")
        .with_form("course", course_id)
    }

    /// One page (1-based) of a program search
    pub fn search_page_task(&self, query: &MaslulQuery, page: u32) -> FetchTask {
        self.base_task(TaskKind::SearchPage {
            year: query.year,
            page,
        })
        .with_form("peula", "Advanced")
        .with_form("year", query.year)
        .with_form("faculty", &query.faculty)
        .with_form("hug", &query.hug)
        .with_form("maslul", &query.maslul)
        .with_form("prisa", Prisa::Maximal.code())
        .with_form("toar", query.toar.code())
        .with_form("shana", query.toar_year.code())
        .with_form("starting", page)
    }
}
