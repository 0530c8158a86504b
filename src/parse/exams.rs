use crate::model::{Exam, Semester};
use crate::parse::dom::{selector, text_of};
use crate::ParseError;
use scraper::Html;

/// Cells of one exam row, in page order
const EXAM_CELLS: usize = 6;

/// Parses the exam-dates page of one course
///
/// The first `<table>` on the page lists one sitting per row after a header
/// row. Cells are, in order: semester, moed, date, hour, location, notes.
///
/// # Returns
///
/// * `Ok(Vec<Exam>)` - Exams in page order; empty when the page has no table
/// * `Err(ParseError::FieldCount)` - A row did not have exactly six cells
pub fn parse_exams(html: &str) -> Result<Vec<Exam>, ParseError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(Vec::new());
    };

    let mut exams = Vec::new();
    for (index, row) in table.select(&row_selector).enumerate().skip(1) {
        let cells: Vec<String> = row.select(&cell_selector).map(text_of).collect();
        if cells.is_empty() {
            continue;
        }

        let [semester, moed, date, hour, location, notes]: [String; EXAM_CELLS] =
            cells.try_into().map_err(|cells: Vec<String>| ParseError::FieldCount {
                context: format!("exam row {}", index),
                expected: EXAM_CELLS,
                found: cells.len(),
            })?;

        exams.push(Exam {
            date,
            hour,
            notes,
            location,
            moed,
            semester: Semester::from_hebrew(&semester),
        });
    }

    Ok(exams)
}
