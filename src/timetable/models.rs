use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// A CATe course, identified by the code shown in blue in the left margin
/// of the timetable, i.e. `395`
#[derive(Clone, Debug, Eq)]
pub struct Course {
    /// Course code
    pub id: String,

    /// Human readable name
    pub name: String,
}

impl Course {
    /// Year of study the course belongs to, read off the first digit of
    /// the course code
    pub fn level(&self) -> Option<u8> {
        self.id
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
    }
}

// Two courses are the same course iff they carry the same code
impl PartialEq for Course {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Course {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}

/// How an exercise has to be handed in, encoded on CATe as the background
/// color of its timetable cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionType {
    /// Nothing to hand in
    Unassessed,
    /// Unassessed but a submission is still expected
    UnassessedSubmissionRequired,
    /// Assessed, submitted alone
    AssessedIndividual,
    /// Assessed, submitted as a group
    AssessedGroup,
}

impl SubmissionType {
    /// Map a cell's `bgcolor` to a submission type. Colors outside the
    /// fixed palette mean the cell is not an exercise at all.
    pub fn from_color(color: &str) -> Option<Self> {
        match color {
            "white" => Some(Self::Unassessed),
            "#cdcdcd" => Some(Self::UnassessedSubmissionRequired),
            "#ccffcc" => Some(Self::AssessedIndividual),
            "#f0ccf0" => Some(Self::AssessedGroup),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unassessed => "unassessed",
            Self::UnassessedSubmissionRequired => "unassessed (submission required)",
            Self::AssessedIndividual => "assessed (individual)",
            Self::AssessedGroup => "assessed (group)",
        };
        write!(f, "{text}")
    }
}

/// One exercise cell of the timetable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exercise {
    /// Exercise number within its course
    pub number: u32,

    /// Free text title, missing on some cells
    pub title: Option<String>,

    /// Short type code, i.e. `CW` or `TUT`
    pub kind: String,

    pub submission_type: SubmissionType,

    /// First day of the exercise window
    pub start: NaiveDate,

    /// Last day of the exercise window, same as `start` unless the cell
    /// spans several columns
    pub end: NaiveDate,
}

/// A fully parsed timetable page
#[derive(Clone, Debug)]
pub struct Timetable {
    /// Teaching period shown in the page title, i.e. `Autumn`
    pub period: String,

    /// Calendar year the academic year starts in
    pub start_year: i32,

    /// Calendar year the academic year ends in
    pub end_year: i32,

    /// Courses with their exercises, in document order, each course at
    /// most once
    courses: Vec<(Course, Vec<Exercise>)>,
}

impl Timetable {
    pub fn new(
        period: String,
        start_year: i32,
        end_year: i32,
        courses: Vec<(Course, Vec<Exercise>)>,
    ) -> Self {
        Self {
            period,
            start_year,
            end_year,
            courses,
        }
    }

    /// All courses, in the order they appear on the page
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().map(|(course, _)| course)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Course, Vec<Exercise>)> {
        self.courses.iter()
    }

    /// Exercises of one course
    pub fn exercises_for(&self, course: &Course) -> Result<&[Exercise]> {
        self.courses
            .iter()
            .find(|(c, _)| c == course)
            .map(|(_, exercises)| exercises.as_slice())
            .ok_or_else(|| Error::CourseNotFound(course.id.clone()))
    }
}
