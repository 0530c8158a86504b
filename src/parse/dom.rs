//! Small DOM helpers shared by the layout parsers

use crate::ParseError;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

/// Compiles a CSS selector, reporting failures as [`ParseError::Selector`]
pub fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {:?}", css, e)))
}

/// Whitespace-trimmed text content of an element
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text content with every run of whitespace collapsed to one space
pub fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First descendant of `scope` matching `selector`
pub fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Trimmed text of the first match, empty when there is none
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    first(scope, selector).map(text_of).unwrap_or_default()
}

/// Next element in document order after the start of `after` that matches
///
/// Like a forward scan of the whole document: descendants of `after` come
/// first, then everything following it, regardless of nesting.
pub fn find_next<'a>(after: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    after
        .tree()
        .root()
        .descendants()
        .skip_while(|node| node.id() != after.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|element| selector.matches(element))
}

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> Result<&'static Regex, ParseError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| ParseError::Pattern(e.to_string()))
}

fn digits_regex() -> Result<&'static Regex, ParseError> {
    static DIGITS: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&DIGITS, r"\d+")
}

fn decimal_regex() -> Result<&'static Regex, ParseError> {
    static DECIMAL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&DECIMAL, r"\d+\.\d+")
}

/// Every run of digits in `text`, in order
pub fn digit_runs(text: &str) -> Result<Vec<&str>, ParseError> {
    Ok(digits_regex()?.find_iter(text).map(|m| m.as_str()).collect())
}

/// First integer in `text`, `None` if there is none
pub fn first_number(text: &str, field: &str) -> Result<Option<u32>, ParseError> {
    match digits_regex()?.find(text) {
        Some(m) => m
            .as_str()
            .parse()
            .map(Some)
            .map_err(|_| ParseError::InvalidNumber {
                field: field.to_string(),
                value: m.as_str().to_string(),
            }),
        None => Ok(None),
    }
}

/// First `N.N` decimal in `text`, zero when absent
pub fn first_decimal(text: &str) -> Result<f64, ParseError> {
    Ok(decimal_regex()?
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0))
}

/// Splits "faculty: department" text
pub fn split_school(text: &str) -> (String, String) {
    match text.split_once(':') {
        Some((faculty, department)) => (faculty.trim().to_string(), department.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

/// Extracts the real target of a `javascript:OpenUrl('...')` link
///
/// Returns `None` for any other kind of href.
pub fn open_url_target(href: &str, origin: &str) -> Option<String> {
    if !href.contains("javascript:OpenUrl(") {
        return None;
    }
    let target = href.split('\'').nth(1)?;
    Some(format!("{}{}", origin.trim_end_matches('/'), target))
}
