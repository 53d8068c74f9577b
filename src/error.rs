//! Error types for report generation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    /// A date-range boundary could not be parsed; no report is produced
    #[error("Invalid {field} date: '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("Completion record for student '{student_pin}' references missing course {course_id}")]
    MissingCourse { student_pin: String, course_id: i64 },

    #[error("Course {course_id} references missing instructor {instructor_id}")]
    MissingInstructor { course_id: i64, instructor_id: i64 },

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}
