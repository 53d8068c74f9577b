use crate::error::{ReportError, Result};
use crate::models::{CourseSummary, StudentCourse, StudentSummary};
use crate::store::{Catalog, Store};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    // US month-first wins over day-first when both would parse
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Parse a user-supplied date, dropping any time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|timestamp| timestamp.date())
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportCriteria {
    /// `None` means every student is considered
    pub pins: Option<HashSet<String>>,
    pub minimum_credit: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportCriteria {
    /// PINs are split on commas as given; surrounding whitespace is not trimmed.
    pub fn parse(
        pins: Option<&str>,
        minimum_credit: u32,
        start_date: &str,
        end_date: &str,
    ) -> Result<Self> {
        let pins = pins
            .filter(|pins| !pins.trim().is_empty())
            .map(|pins| pins.split(',').map(str::to_string).collect());

        let start = parse_date(start_date).ok_or_else(|| ReportError::InvalidDate {
            field: "start",
            value: start_date.to_string(),
        })?;
        let end = parse_date(end_date).ok_or_else(|| ReportError::InvalidDate {
            field: "end",
            value: end_date.to_string(),
        })?;

        Ok(Self {
            pins,
            minimum_credit,
            start,
            end,
        })
    }

    pub fn includes_student(&self, pin: &str) -> bool {
        self.pins.as_ref().map_or(true, |pins| pins.contains(pin))
    }

    /// Completed, and completed on a day inside `[start, end]`.
    pub fn is_qualifying(&self, completion: &StudentCourse) -> bool {
        completion
            .completion_date
            .map(|completed| completed.date())
            .is_some_and(|day| day >= self.start && day <= self.end)
    }
}

/// Join, filter and aggregate the catalog into per-student summaries.
///
/// Student order follows the catalog; each course list follows completion order.
pub fn summarize(catalog: &Catalog, criteria: &ReportCriteria) -> Result<Vec<StudentSummary>> {
    let mut qualifying_by_student: HashMap<&str, Vec<&StudentCourse>> = HashMap::new();
    for completion in &catalog.completions {
        if criteria.is_qualifying(completion) {
            qualifying_by_student
                .entry(completion.student_pin.as_str())
                .or_insert_with(Vec::new)
                .push(completion);
        }
    }

    let mut summaries = Vec::new();
    for student in &catalog.students {
        if !criteria.includes_student(&student.pin) {
            continue;
        }

        let courses = qualifying_by_student
            .get(student.pin.as_str())
            .map(|completions| {
                completions
                    .iter()
                    .map(|completion| course_summary(catalog, completion))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        // Summed from the listed courses so the displayed total always matches them
        let total_credit: u32 = courses.iter().map(|course| u32::from(course.credit)).sum();
        if total_credit < criteria.minimum_credit {
            debug!(pin = %student.pin, total_credit, "Student below minimum credit");
            continue;
        }

        summaries.push(StudentSummary {
            name: student.full_name(),
            total_credit,
            courses,
        });
    }

    Ok(summaries)
}

fn course_summary(catalog: &Catalog, completion: &StudentCourse) -> Result<CourseSummary> {
    let course = catalog
        .courses
        .get(&completion.course_id)
        .ok_or_else(|| ReportError::MissingCourse {
            student_pin: completion.student_pin.clone(),
            course_id: completion.course_id,
        })?;
    let instructor = catalog
        .instructors
        .get(&course.instructor_id)
        .ok_or(ReportError::MissingInstructor {
            course_id: course.id,
            instructor_id: course.instructor_id,
        })?;

    Ok(CourseSummary {
        name: course.name.clone(),
        total_time: course.total_time,
        credit: course.credit,
        instructor_name: instructor.full_name(),
    })
}

pub struct DataProvider<'a> {
    store: &'a Store,
}

impl<'a> DataProvider<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Students whose qualifying credit within the date range reaches `minimum_credit`.
    ///
    /// Unparseable dates fail with [`ReportError::InvalidDate`] before the database is read.
    #[instrument(skip(self))]
    pub async fn get_students(
        &self,
        pins: Option<&str>,
        minimum_credit: u32,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<StudentSummary>> {
        let criteria = ReportCriteria::parse(pins, minimum_credit, start_date, end_date)?;
        let catalog = self.store.load_catalog().await?;
        let students = summarize(&catalog, &criteria)?;

        info!(
            qualifying = students.len(),
            start = %criteria.start,
            end = %criteria.end,
            "Selected qualifying students"
        );
        Ok(students)
    }
}
