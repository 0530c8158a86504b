use crate::model::{Exam, Lesson, Semester};
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// One catalog entry for an academic year
///
/// Equality and hashing only look at `course_id`, so a set of courses
/// collapses duplicates coming from different search pages.
#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub faculty: String,
    pub department: String,
    pub course_id: String,
    pub english_name: String,
    pub hebrew_name: String,
    pub semester: Semester,
    pub weekly_hours: u32,
    pub credits: u32,
    pub language: String,
    /// Exam duration in hours, zero when unknown
    pub exam_length: f64,
    pub exam_type: String,
    pub schedule: Vec<Lesson>,
    /// `None` until exams were fetched for this course
    pub exams: Option<Vec<Exam>>,
    pub hebrew_notes: String,
    pub english_notes: String,
    pub is_running: bool,
    pub syllabus_url: String,
    pub moodle_url: String,
}

impl Course {
    /// Second phase of construction: attach the exam list once it was fetched.
    pub fn attach_exams(&mut self, exams: Vec<Exam>) {
        self.exams = Some(exams);
    }

    pub fn has_exams(&self) -> bool {
        self.exams.is_some()
    }
}

impl PartialEq for Course {
    fn eq(&self, other: &Self) -> bool {
        self.course_id == other.course_id
    }
}

impl Eq for Course {}

impl Hash for Course {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.course_id.hash(state);
    }
}
