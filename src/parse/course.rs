//! Parser for the current, div-based course layout
//!
//! The page is made of fixed-class containers:
//!
//! | Container | Field |
//! |-----------|-------|
//! | `div.data-school` | "faculty: department" |
//! | `div.title` | title text ending with the course id |
//! | `div.subtitle` / `div.subtitle-eng` | Hebrew / English name |
//! | `div.additional-data` | semester, hours, points, exam, language |
//! | `div#comments-course-NumCourse` | notes |
//! | `div.row` (all but the first) | one schedule block each |
//!
//! Only the faculty and title containers are required.

use crate::config::LayoutKind;
use crate::model::{Course, Semester};
use crate::parse::dom::{
    collapsed_text, first, first_decimal, first_number, first_text, open_url_target, selector,
    split_school, text_of,
};
use crate::parse::layout::CourseParser;
use crate::parse::schedule::{sort_lessons, ScheduleColumns};
use crate::ParseError;
use scraper::{ElementRef, Selector};

/// Syllabus and Moodle anchors, shared by both layouts
pub(crate) struct LinkSelectors {
    syllabus: Selector,
    moodle: Selector,
}

impl LinkSelectors {
    pub(crate) fn new() -> Result<Self, ParseError> {
        Ok(Self {
            syllabus: selector(".cyllabus-cource")?,
            moodle: selector(".moodle-cource")?,
        })
    }

    /// Returns `(syllabus_url, moodle_url)`, empty strings when absent
    pub(crate) fn extract(&self, scope: ElementRef<'_>, origin: &str) -> (String, String) {
        let syllabus = first(scope, &self.syllabus)
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| open_url_target(href, origin))
            .unwrap_or_default();
        let moodle = first(scope, &self.moodle)
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
            .unwrap_or_default();
        (syllabus, moodle)
    }
}

struct Selectors {
    school: Selector,
    title: Selector,
    subtitle: Selector,
    subtitle_eng: Selector,
    additional: Selector,
    semester: Selector,
    weekly_hours: Selector,
    credits: Selector,
    test: Selector,
    language: Selector,
    notes: Selector,
    row: Selector,
    lecturer: Selector,
    groups: Selector,
    semesters: Selector,
    days: Selector,
    day: Selector,
    hours: Selector,
    lessons: Selector,
    places: Selector,
    place: Selector,
    passing: Selector,
    div: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            school: selector("div.data-school")?,
            title: selector("div.title")?,
            subtitle: selector("div.subtitle")?,
            subtitle_eng: selector("div.subtitle-eng")?,
            additional: selector("div.additional-data")?,
            semester: selector("div.additional-data-semester")?,
            weekly_hours: selector("div.additional-data-points")?,
            credits: selector("div.additional-data-student-points")?,
            test: selector("div.additional-data-test")?,
            language: selector("div.additional-data-language")?,
            notes: selector("div#comments-course-NumCourse")?,
            row: selector("div.row")?,
            lecturer: selector("div.lecturer-name")?,
            groups: selector("div.groups")?,
            semesters: selector("div.semester")?,
            days: selector("div.days")?,
            day: selector("div.day")?,
            hours: selector("div.hour")?,
            lessons: selector("div.lesson")?,
            places: selector("div.places")?,
            place: selector("div.place-item")?,
            passing: selector("div.note")?,
            div: selector("div")?,
        })
    }
}

/// Parser for the div-based layout
pub struct DivLayoutParser {
    origin: String,
    selectors: Selectors,
    links: LinkSelectors,
}

impl DivLayoutParser {
    pub fn new(origin: &str) -> Result<Self, ParseError> {
        Ok(Self {
            origin: origin.to_string(),
            selectors: Selectors::new()?,
            links: LinkSelectors::new()?,
        })
    }

    /// Trimmed texts of `item`s inside the first `container` of `row`
    fn column(
        &self,
        row: ElementRef<'_>,
        container: &Selector,
        item: &Selector,
        keep_empty: bool,
    ) -> Vec<String> {
        first(row, container)
            .map(|block| {
                block
                    .select(item)
                    .map(text_of)
                    .filter(|text| keep_empty || !text.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn schedule_columns(&self, row: ElementRef<'_>) -> ScheduleColumns {
        let s = &self.selectors;

        let lecturers = first(row, &s.lecturer)
            .map(|div| text_of(div).replace('\n', ""))
            .filter(|text| !text.is_empty())
            .into_iter()
            .collect();

        ScheduleColumns {
            locations: self.column(row, &s.places, &s.place, true),
            passing_types: self.column(row, &s.passing, &s.div, false),
            times: self.column(row, &s.hours, &s.div, false),
            days: self.column(row, &s.days, &s.day, true),
            semesters: self.column(row, &s.semesters, &s.div, true),
            groups: self.column(row, &s.groups, &s.div, true),
            kinds: self.column(row, &s.lessons, &s.div, true),
            lecturers,
        }
    }
}

impl CourseParser for DivLayoutParser {
    fn layout(&self) -> LayoutKind {
        LayoutKind::Div
    }

    fn parse_fragment(&self, fragment: ElementRef<'_>) -> Result<Course, ParseError> {
        let s = &self.selectors;

        let school = first(fragment, &s.school)
            .ok_or_else(|| ParseError::MissingElement("div.data-school".to_string()))?;
        let (faculty, department) = split_school(&text_of(school));

        let title = first(fragment, &s.title)
            .ok_or_else(|| ParseError::MissingElement("div.title".to_string()))?;
        let course_id = collapsed_text(title)
            .split_whitespace()
            .last()
            .map(str::to_string)
            .ok_or_else(|| ParseError::MissingElement("course id in div.title".to_string()))?;

        let hebrew_name = first_text(fragment, &s.subtitle);
        let english_name = first_text(fragment, &s.subtitle_eng);

        let mut semester = Semester::from_hebrew("");
        let mut weekly_hours = 0;
        let mut credits = 0;
        let mut exam_type = String::new();
        let mut exam_length = 0.0;
        let mut language = String::new();

        if let Some(additional) = first(fragment, &s.additional) {
            semester = Semester::from_hebrew(&first_text(additional, &s.semester));
            weekly_hours =
                first_number(&first_text(additional, &s.weekly_hours), "weekly hours")?.unwrap_or(0);
            credits = first_number(&first_text(additional, &s.credits), "credits")?.unwrap_or(0);
            exam_type = first_text(additional, &s.test);
            exam_length = first_decimal(&exam_type)?;
            language = first_text(additional, &s.language);
        }

        let hebrew_notes = first_text(fragment, &s.notes);
        let (syllabus_url, moodle_url) = self.links.extract(fragment, &self.origin);

        // The first row is the column header
        let mut schedule = Vec::new();
        for (row_index, row) in fragment.select(&s.row).skip(1).enumerate() {
            let columns = self.schedule_columns(row);
            let count = [
                columns.semesters.len(),
                columns.days.len(),
                columns.times.len(),
                columns.locations.len(),
            ]
            .into_iter()
            .max()
            .unwrap_or(0);
            schedule.extend(columns.into_lessons(row_index, count));
        }
        sort_lessons(&mut schedule);

        Ok(Course {
            faculty,
            department,
            course_id,
            english_name,
            hebrew_name,
            semester,
            weekly_hours,
            credits,
            language,
            exam_length,
            exam_type,
            schedule,
            exams: None,
            hebrew_notes,
            english_notes: String::new(),
            is_running: true,
            syllabus_url,
            moodle_url,
        })
    }
}
