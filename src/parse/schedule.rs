//! Lesson reconstruction from column-aligned schedule blocks
//!
//! A schedule block lists its fields as parallel columns that need not have
//! the same length: one group label and one lecturer line can sit next to
//! three day/hour/place entries. Each block expands to `count` lessons; the
//! group and lesson kind are broadcast, the other columns are read by index
//! with missing entries left empty.

use crate::model::{Lesson, Semester};

/// Parallel text columns of one schedule block
#[derive(Debug, Clone, Default)]
pub struct ScheduleColumns {
    pub locations: Vec<String>,
    pub passing_types: Vec<String>,
    pub times: Vec<String>,
    pub days: Vec<String>,
    pub semesters: Vec<String>,
    pub groups: Vec<String>,
    pub kinds: Vec<String>,
    pub lecturers: Vec<String>,
}

fn nth_or_empty(values: &[String], index: usize) -> String {
    values.get(index).cloned().unwrap_or_default()
}

impl ScheduleColumns {
    /// Expands the block into `count` lessons tagged with `row`
    pub fn into_lessons(self, row: usize, count: usize) -> Vec<Lesson> {
        let group = nth_or_empty(&self.groups, 0);
        let kind = nth_or_empty(&self.kinds, 0);

        (0..count)
            .map(|index| Lesson {
                location: nth_or_empty(&self.locations, index),
                passing_type: nth_or_empty(&self.passing_types, index),
                time: nth_or_empty(&self.times, index),
                day: nth_or_empty(&self.days, index),
                semester: Semester::from_hebrew(&nth_or_empty(&self.semesters, index)),
                group: group.clone(),
                kind: kind.clone(),
                lecturers: self.lecturers.clone(),
                row,
            })
            .collect()
    }
}

/// Orders lessons by semester, day, start, end, passing type and location
///
/// Day and times compare as raw text, so the result is stable across runs
/// even where it is not chronological.
pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
