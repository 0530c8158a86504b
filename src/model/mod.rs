//! Domain records produced by the parsers
//!
//! Courses, their weekly lessons and exam sittings, plus the small enums the
//! catalog uses in its search forms.

mod catalog;
pub(crate) mod course;
mod exam;
mod lesson;

pub use catalog::{Prisa, Semester, Toar, ToarYear};
pub use course::Course;
pub use exam::Exam;
pub use lesson::Lesson;
