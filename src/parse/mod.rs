//! HTML parsers for catalog pages
//!
//! Pure functions from page text to records, no I/O:
//! - course pages, through a [`CourseParser`] chosen per catalog layout
//! - exam-date pages ([`parse_exams`])
//! - search results pages ([`parse_page`], [`page_count`])

pub mod course;
pub mod dom;
pub mod exams;
pub mod layout;
pub mod legacy;
pub mod page;
pub mod schedule;

pub use crate::config::LayoutKind as Layout;
pub use course::DivLayoutParser;
pub use exams::parse_exams;
pub use layout::{parser_for, CourseParser};
pub use legacy::TableLayoutParser;
pub use page::{page_count, parse_page, FragmentFailure, PageCourses};
pub use schedule::{sort_lessons, ScheduleColumns};
