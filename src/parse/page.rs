//! Search-results pages: several course blocks plus a page counter

use crate::model::Course;
use crate::parse::dom::{digit_runs, find_next, selector, text_of};
use crate::parse::layout::CourseParser;
use crate::ParseError;
use scraper::{ElementRef, Html};
use std::collections::HashSet;

/// A course block that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentFailure {
    /// Position of the block on the page, from 0
    pub index: usize,
    pub error: ParseError,
}

/// Everything recovered from one results page
#[derive(Debug, Clone, Default)]
pub struct PageCourses {
    pub courses: Vec<Course>,
    pub failures: Vec<FragmentFailure>,
}

/// Parses every course block on a search results page
///
/// Each `div.courseTitle` marks a course; its parent element is handed to
/// `parser`. A block that fails to parse is logged and reported in
/// [`PageCourses::failures`] without affecting the others.
pub fn parse_page(parser: &dyn CourseParser, html: &str) -> Result<PageCourses, ParseError> {
    let document = Html::parse_document(html);
    let marker = selector("div.courseTitle")?;

    let mut seen = HashSet::new();
    let fragments: Vec<ElementRef<'_>> = document
        .select(&marker)
        .filter_map(|title| title.parent().and_then(ElementRef::wrap))
        .filter(|fragment| seen.insert(fragment.id()))
        .collect();

    let mut page = PageCourses::default();
    for (index, fragment) in fragments.into_iter().enumerate() {
        match parser.parse_fragment(fragment) {
            Ok(course) => page.courses.push(course),
            Err(error) => {
                tracing::warn!("Skipping course block {} on results page: {}", index, error);
                page.failures.push(FragmentFailure { index, error });
            }
        }
    }

    Ok(page)
}

/// Total number of result pages announced on a results page
///
/// The counter is the first cell after `div.facultyTitle`, reading like
/// "page X of Y"; the second number in it is the total. A page without the
/// counter is a single page.
pub fn page_count(html: &str) -> Result<u32, ParseError> {
    let document = Html::parse_document(html);
    let marker = selector("div.facultyTitle")?;
    let cell = selector("td")?;

    let Some(title) = document.select(&marker).next() else {
        tracing::debug!("No page counter found, assuming a single page");
        return Ok(1);
    };

    let counter = find_next(title, &cell)
        .map(text_of)
        .ok_or_else(|| ParseError::MissingElement("page counter cell".to_string()))?;

    let numbers = digit_runs(&counter)?;
    numbers
        .get(1)
        .and_then(|total| total.parse().ok())
        .ok_or_else(|| ParseError::InvalidNumber {
            field: "page count".to_string(),
            value: counter.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::course::DivLayoutParser;

    const RESULTS_PAGE: &str = include_str!("../../tests/fixtures/search_page.html");

    #[test]
    fn test_parse_page_isolates_failures() {
        let parser = DivLayoutParser::new("https://shnaton.huji.ac.il").unwrap();
        let page = parse_page(&parser, RESULTS_PAGE).unwrap();

        let ids: Vec<_> = page.courses.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["41800", "41801"]);
        assert_eq!(page.failures.len(), 1);
        assert_eq!(page.failures[0].index, 1);
        assert!(matches!(
            page.failures[0].error,
            ParseError::MissingElement(_)
        ));
    }

    #[test]
    fn test_page_blocks_keep_their_own_schedule() {
        let parser = DivLayoutParser::new("https://shnaton.huji.ac.il").unwrap();
        let page = parse_page(&parser, RESULTS_PAGE).unwrap();

        assert_eq!(page.courses[0].schedule.len(), 1);
        assert_eq!(page.courses[0].schedule[0].day, "יום א'");
        assert_eq!(page.courses[1].schedule.len(), 2);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(RESULTS_PAGE).unwrap(), 3);
    }

    #[test]
    fn test_page_count_without_counter() {
        assert_eq!(page_count("<html><body></body></html>").unwrap(), 1);
    }

    #[test]
    fn test_page_count_malformed_counter() {
        let html = r#"<div class="facultyTitle">מדעי הרוח</div><table><tr><td>עמוד</td></tr></table>"#;
        assert!(matches!(
            page_count(html),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_empty_page() {
        let parser = DivLayoutParser::new("https://shnaton.huji.ac.il").unwrap();
        let page = parse_page(&parser, "<html><body></body></html>").unwrap();
        assert!(page.courses.is_empty());
        assert!(page.failures.is_empty());
    }
}
