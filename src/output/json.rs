//! JSON export of scraped courses

use crate::model::Course;
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Top-level document written by the exporter
#[derive(Debug, Serialize)]
pub struct ScrapeOutput<'a> {
    pub scraped_at: DateTime<Utc>,
    pub year: u16,
    pub courses: &'a [Course],
}

impl<'a> ScrapeOutput<'a> {
    pub fn new(year: u16, courses: &'a [Course]) -> Self {
        Self {
            scraped_at: Utc::now(),
            year,
            courses,
        }
    }
}

/// Writes `output` as pretty-printed JSON followed by a newline
pub fn write_json<W: Write>(output: &ScrapeOutput<'_>, mut writer: W) -> Result<(), ScrapeError> {
    serde_json::to_writer_pretty(&mut writer, output)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `output` to `path`, or to stdout when no path is given
///
/// # Arguments
///
/// * `output` - The document to export
/// * `path` - Destination file, created or truncated
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the document
/// * `Err(ScrapeError)` - Failed to create the file or serialize
pub fn export(output: &ScrapeOutput<'_>, path: Option<&Path>) -> Result<(), ScrapeError> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            write_json(output, BufWriter::new(file))
        }
        None => write_json(output, std::io::stdout().lock()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::course::tests::course;
    use crate::model::{Exam, Lesson, Semester};

    #[test]
    fn test_json_shape() {
        let mut with_schedule = course("41800", "מבוא לבלשנות");
        with_schedule.schedule.push(Lesson {
            location: "רבין 2001".to_string(),
            passing_type: String::new(),
            time: "12:45-11:00".to_string(),
            day: "יום א'".to_string(),
            semester: Semester::A,
            group: "(א)".to_string(),
            kind: "שעור".to_string(),
            lecturers: vec!["פרופ' נועה לוי".to_string()],
            row: 0,
        });
        with_schedule.attach_exams(vec![Exam {
            date: "28/01/2025".to_string(),
            hour: "09:00".to_string(),
            notes: String::new(),
            location: String::new(),
            moed: "א".to_string(),
            semester: Semester::A,
        }]);
        let courses = vec![with_schedule, course("41801", "תחביר")];

        let mut buffer = Vec::new();
        write_json(&ScrapeOutput::new(2025, &courses), &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["year"], 2025);
        assert!(value["scraped_at"].is_string());
        assert_eq!(value["courses"][0]["course_id"], "41800");
        assert_eq!(value["courses"][0]["semester"], "A");
        assert_eq!(value["courses"][0]["schedule"][0]["type"], "שעור");
        assert_eq!(value["courses"][0]["schedule"][0]["lecturers"][0], "פרופ' נועה לוי");
        assert_eq!(value["courses"][0]["exams"][0]["moed"], "א");
        assert!(value["courses"][1]["exams"].is_null());
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        let courses = vec![course("41800", "מבוא")];

        export(&ScrapeOutput::new(2025, &courses), Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"course_id\": \"41800\""));
        assert!(written.ends_with('\n'));
    }
}
