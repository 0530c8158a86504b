use crate::model::Semester;
use serde::Serialize;

/// One scheduled meeting slot of a course
///
/// `time` is kept exactly as the catalog prints it, which is `end-start`
/// (e.g. `"15:45-14:00"`); use [`Lesson::start_time`] and
/// [`Lesson::end_time`] for the split values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    pub location: String,
    /// Attendance mode (in class, recorded, online...)
    pub passing_type: String,
    pub time: String,
    pub day: String,
    pub semester: Semester,
    pub group: String,
    /// Lesson kind (lecture, exercise...)
    #[serde(rename = "type")]
    pub kind: String,
    pub lecturers: Vec<String>,
    /// Index of the schedule block this lesson was reconstructed from
    pub row: usize,
}

impl Lesson {
    /// Splits `time` into `(start, end)`; anything but exactly one `-` gives two empty strings.
    fn split_time(&self) -> (&str, &str) {
        let mut parts = self.time.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(end), Some(start), None) => (start, end),
            _ => ("", ""),
        }
    }

    pub fn start_time(&self) -> &str {
        self.split_time().0
    }

    pub fn end_time(&self) -> &str {
        self.split_time().1
    }

    /// Key lessons are ordered by: semester, day, start, end, passing type, location.
    ///
    /// Day and times compare as raw text.
    pub fn sort_key(&self) -> (&Semester, &str, &str, &str, &str, &str) {
        (
            &self.semester,
            &self.day,
            self.start_time(),
            self.end_time(),
            &self.passing_type,
            &self.location,
        )
    }
}
