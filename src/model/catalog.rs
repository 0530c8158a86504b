use serde::{Serialize, Serializer};
use std::fmt;

/// Academic semester a course or lesson runs in
///
/// Ordering follows declaration order; lesson sorting relies on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semester {
    A,
    B,
    AB,
    Summer,
    Yearly,
    /// Text the catalog printed that matches none of the above, kept verbatim
    Unknown(String),
}

impl Semester {
    /// Interprets the semester text printed by the catalog
    ///
    /// Accepts the Hebrew forms ("סמסטר א'", "סמסטר א' או ב'", "שנתי", "קיץ")
    /// as well as their English equivalents.
    pub fn from_hebrew(text: &str) -> Self {
        let text = text.trim();
        let lower = text.to_lowercase();

        if text.contains("קיץ") || lower.contains("summer") {
            return Semester::Summer;
        }
        if text.contains("שנתי") || lower.contains("year") {
            return Semester::Yearly;
        }

        let mut has_a = false;
        let mut has_b = false;
        for token in lower.split(|c: char| !c.is_alphanumeric()) {
            match token {
                "א" | "a" => has_a = true,
                "ב" | "b" => has_b = true,
                _ => {}
            }
        }

        match (has_a, has_b) {
            (true, true) => Semester::AB,
            (true, false) => Semester::A,
            (false, true) => Semester::B,
            (false, false) => Semester::Unknown(text.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Semester::A => "A",
            Semester::B => "B",
            Semester::AB => "AB",
            Semester::Summer => "Summer",
            Semester::Yearly => "Yearly",
            Semester::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Semester {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Degree type filter of the program search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toar {
    #[default]
    Any = 0,
    /// Bachelor's degree
    Boger = 1,
}

impl Toar {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Toar::Any),
            1 => Some(Toar::Boger),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Year within the degree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToarYear {
    #[default]
    Any = 0,
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
}

impl ToarYear {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ToarYear::Any),
            1 => Some(ToarYear::First),
            2 => Some(ToarYear::Second),
            3 => Some(ToarYear::Third),
            4 => Some(ToarYear::Fourth),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Detail level of search results ("prisa")
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Prisa {
    Minimal = 0,
    Medium = 1,
    #[default]
    Maximal = 2,
}

impl Prisa {
    pub fn code(self) -> u8 {
        self as u8
    }
}
