use crate::model::Semester;
use serde::Serialize;

/// One exam sitting of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exam {
    pub date: String,
    pub hour: String,
    pub notes: String,
    pub location: String,
    /// Named sitting ("moed"), e.g. first sitting or retake
    pub moed: String,
    pub semester: Semester,
}
