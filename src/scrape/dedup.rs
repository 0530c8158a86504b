use crate::model::Course;
use std::collections::HashSet;

/// Keeps one course per `course_id`
///
/// The first occurrence wins and keeps its position; later duplicates are
/// dropped even when their other fields differ.
pub fn dedup_courses(courses: impl IntoIterator<Item = Course>) -> Vec<Course> {
    let mut seen = HashSet::new();
    courses
        .into_iter()
        .filter(|course| seen.insert(course.course_id.clone()))
        .collect()
}
