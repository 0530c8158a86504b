//! Parser for the older, table-based course layout
//!
//! Fields are found by position rather than by class:
//! 1. `div.courseTitle` holds the faculty
//! 2. the next `<table>` holds three `<b>` cells: English name, Hebrew name,
//!    course id; a red `<font>` there marks a course not given this year
//! 3. the table after that holds six cells: exam length, exam type, (unused),
//!    points, semester, language
//! 4. the table following the `CourseDetails` div is the schedule: a header
//!    row, one row per group and lesson kind, then Hebrew and English notes

use crate::config::LayoutKind;
use crate::model::{Course, Lesson, Semester};
use crate::parse::course::LinkSelectors;
use crate::parse::dom::{
    collapsed_text, digit_runs, find_next, first, first_decimal, first_number, selector,
    split_school, text_of,
};
use crate::parse::layout::CourseParser;
use crate::parse::schedule::{sort_lessons, ScheduleColumns};
use crate::ParseError;
use scraper::{ElementRef, Node, Selector};

const LOCATION: usize = 0;
const PASSING_TYPE: usize = 1;
const TIME: usize = 2;
const DAY: usize = 3;
const SEMESTER: usize = 4;
const GROUP: usize = 5;
const LESSON_KIND: usize = 6;
const LECTURER: usize = 7;
const SCHEDULE_CELLS: usize = 8;
const DETAIL_CELLS: usize = 6;

struct Selectors {
    course_title: Selector,
    table: Selector,
    bold: Selector,
    red_font: Selector,
    td: Selector,
    tr: Selector,
    details_anchor: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            course_title: selector("div.courseTitle")?,
            table: selector("table")?,
            bold: selector("b")?,
            red_font: selector(r#"font[color="red"]"#)?,
            td: selector("td")?,
            tr: selector("tr")?,
            details_anchor: selector(r#"div[id*="CourseDetails"]"#)?,
        })
    }
}

/// Parser for the table-based layout
pub struct TableLayoutParser {
    origin: String,
    selectors: Selectors,
    links: LinkSelectors,
}

impl TableLayoutParser {
    pub fn new(origin: &str) -> Result<Self, ParseError> {
        Ok(Self {
            origin: origin.to_string(),
            selectors: Selectors::new()?,
            links: LinkSelectors::new()?,
        })
    }

    /// Splits one schedule cell into its separate values
    ///
    /// Values are separated by `<br>`. A `<span>` whose text was truncated
    /// with "..." carries the full value in a `<b>`.
    fn cell_values(&self, cell: ElementRef<'_>) -> Vec<String> {
        let mut values = Vec::new();

        for child in cell.children() {
            let value = match child.value() {
                Node::Text(text) => text.trim().to_string(),
                Node::Element(element) if element.name() == "br" => continue,
                Node::Element(_) => match ElementRef::wrap(child) {
                    Some(element) if element.value().name() == "span" => {
                        let text = text_of(element);
                        if text.contains("...") {
                            first(element, &self.selectors.bold)
                                .or_else(|| find_next(element, &self.selectors.bold))
                                .map(text_of)
                                .unwrap_or(text)
                        } else {
                            text
                        }
                    }
                    Some(element) => text_of(element),
                    None => continue,
                },
                _ => continue,
            };

            if !value.is_empty() {
                values.push(value);
            }
        }

        values
    }

    fn schedule_row(&self, row: ElementRef<'_>, row_index: usize) -> Result<Vec<Lesson>, ParseError> {
        let cells: Vec<_> = row.select(&self.selectors.td).collect();
        if cells.is_empty() {
            return Ok(Vec::new());
        }
        if cells.len() < SCHEDULE_CELLS {
            return Err(ParseError::FieldCount {
                context: format!("schedule row {}", row_index),
                expected: SCHEDULE_CELLS,
                found: cells.len(),
            });
        }

        let mut values: Vec<Vec<String>> = cells
            .iter()
            .take(SCHEDULE_CELLS)
            .map(|cell| self.cell_values(*cell))
            .collect();

        let count = values[LOCATION..=SEMESTER]
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let columns = ScheduleColumns {
            lecturers: std::mem::take(&mut values[LECTURER]),
            kinds: std::mem::take(&mut values[LESSON_KIND]),
            groups: std::mem::take(&mut values[GROUP]),
            semesters: std::mem::take(&mut values[SEMESTER]),
            days: std::mem::take(&mut values[DAY]),
            times: std::mem::take(&mut values[TIME]),
            passing_types: std::mem::take(&mut values[PASSING_TYPE]),
            locations: std::mem::take(&mut values[LOCATION]),
        };

        Ok(columns.into_lessons(row_index, count))
    }
}

impl CourseParser for TableLayoutParser {
    fn layout(&self) -> LayoutKind {
        LayoutKind::Table
    }

    fn parse_fragment(&self, fragment: ElementRef<'_>) -> Result<Course, ParseError> {
        let s = &self.selectors;

        let title = first(fragment, &s.course_title)
            .ok_or_else(|| ParseError::MissingElement("div.courseTitle".to_string()))?;
        let (faculty, department) = split_school(&collapsed_text(title));

        let course_table = find_next(title, &s.table)
            .ok_or_else(|| ParseError::MissingElement("course name table".to_string()))?;

        // Bold text inside <font> is the "not given" notice, not a field
        let names: Vec<String> = course_table
            .select(&s.bold)
            .filter(|b| {
                b.parent()
                    .and_then(ElementRef::wrap)
                    .map_or(true, |parent| parent.value().name() != "font")
            })
            .map(text_of)
            .collect();
        let [english_name, hebrew_name, id_text]: [String; 3] =
            names.try_into().map_err(|names: Vec<String>| ParseError::FieldCount {
                context: "course name table".to_string(),
                expected: 3,
                found: names.len(),
            })?;

        let course_id = digit_runs(&id_text)?
            .first()
            .map(|digits| digits.to_string())
            .ok_or_else(|| ParseError::InvalidNumber {
                field: "course id".to_string(),
                value: id_text.clone(),
            })?;
        let is_running = first(course_table, &s.red_font).is_none();

        let details_table = find_next(course_table, &s.table)
            .ok_or_else(|| ParseError::MissingElement("course details table".to_string()))?;
        let details: Vec<String> = details_table.select(&s.td).map(text_of).collect();
        let [exam_length, exam_type, _unused, points, semester, language]: [String; DETAIL_CELLS] =
            details
                .try_into()
                .map_err(|details: Vec<String>| ParseError::FieldCount {
                    context: "course details table".to_string(),
                    expected: DETAIL_CELLS,
                    found: details.len(),
                })?;

        let exam_length = match first_decimal(&exam_length)? {
            hours if hours > 0.0 => hours,
            _ => first_number(&exam_length, "exam length")?.map_or(0.0, f64::from),
        };
        let credits = first_number(&points, "points")?.unwrap_or(0);

        let mut schedule = Vec::new();
        let mut hebrew_notes = String::new();
        let mut english_notes = String::new();

        if let Some(schedule_table) =
            first(fragment, &s.details_anchor).and_then(|anchor| find_next(anchor, &s.table))
        {
            let rows: Vec<_> = schedule_table.select(&s.tr).skip(1).collect();
            let split = rows.len().saturating_sub(2);
            let (schedule_rows, note_rows) = rows.split_at(split);

            for (row_index, row) in schedule_rows.iter().enumerate() {
                schedule.extend(self.schedule_row(*row, row_index)?);
            }

            let mut notes = note_rows
                .iter()
                .map(|row| first(*row, &s.td).map(text_of).unwrap_or_default());
            hebrew_notes = notes.next().unwrap_or_default();
            english_notes = notes.next().unwrap_or_default();
        }
        sort_lessons(&mut schedule);

        let (syllabus_url, moodle_url) = self.links.extract(fragment, &self.origin);

        Ok(Course {
            faculty,
            department,
            course_id,
            english_name,
            hebrew_name,
            semester: Semester::from_hebrew(&semester),
            weekly_hours: 0,
            credits,
            language,
            exam_length,
            exam_type,
            schedule,
            exams: None,
            hebrew_notes,
            english_notes,
            is_running,
            syllabus_url,
            moodle_url,
        })
    }
}
