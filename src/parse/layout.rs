use crate::config::LayoutKind;
use crate::model::Course;
use crate::parse::course::DivLayoutParser;
use crate::parse::legacy::TableLayoutParser;
use crate::ParseError;
use scraper::{ElementRef, Html};
use std::sync::Arc;

/// Turns one course's markup into a [`Course`]
///
/// There is one implementation per catalog layout; which one runs is decided
/// by configuration, never by sniffing the markup.
pub trait CourseParser: Send + Sync {
    /// Layout this parser understands
    fn layout(&self) -> LayoutKind;

    /// Parses the course contained in `fragment`
    ///
    /// `fragment` is either a whole course page or one course block of a
    /// search results page. Exams are never filled in here.
    fn parse_fragment(&self, fragment: ElementRef<'_>) -> Result<Course, ParseError>;

    /// Parses a complete course page
    fn parse(&self, html: &str) -> Result<Course, ParseError> {
        let document = Html::parse_document(html);
        self.parse_fragment(document.root_element())
    }
}

/// Builds the parser for `layout`
///
/// # Arguments
///
/// * `layout` - Catalog layout from the configuration
/// * `origin` - Catalog origin, prefixed to relative syllabus links
pub fn parser_for(layout: LayoutKind, origin: &str) -> Result<Arc<dyn CourseParser>, ParseError> {
    Ok(match layout {
        LayoutKind::Div => Arc::new(DivLayoutParser::new(origin)?),
        LayoutKind::Table => Arc::new(TableLayoutParser::new(origin)?),
    })
}
