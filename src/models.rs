use anyhow::Context;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;

const CONFIG_HEADER: &str = "\
# The database named by database_url must already exist; it is never created.
# run_migrations = true applies the bundled schema to it before the report query.
";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    // Applies the bundled schema before querying
    pub run_migrations: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://coursera.db".to_string(),
            run_migrations: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read configuration file: {}", file_path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", file_path))?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = format!("{}{}", CONFIG_HEADER, toml::to_string_pretty(self)?);
        std::fs::write(file_path, content)
            .with_context(|| format!("Failed to write configuration file: {}", file_path))?;
        Ok(())
    }

    /// Environment variables (including ones loaded from `.env`) take precedence over the file.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(level) = std::env::var("CREDIT_REPORT_LOG") {
            self.log_level = level;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Html,
    Both,
}

impl OutputFormat {
    /// Anything other than `csv` or `html` (case-insensitive), including an
    /// empty line, selects both reports.
    pub fn from_input(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "csv" => OutputFormat::Csv,
            "html" => OutputFormat::Html,
            _ => OutputFormat::Both,
        }
    }
}

/// The six parameters of one report run, in the order they are read from input.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub pins: String,
    pub minimum_credit: u32,
    pub start_date: String,
    pub end_date: String,
    pub output_format: OutputFormat,
    pub output_directory: PathBuf,
}

impl ReportRequest {
    pub fn read_from<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut lines = reader.lines();
        let mut next_line = |field: &str| -> anyhow::Result<String> {
            lines
                .next()
                .with_context(|| format!("Missing input line: {}", field))?
                .with_context(|| format!("Failed to read input line: {}", field))
        };

        let pins = next_line("student PINs")?;
        let minimum_credit_raw = next_line("minimum credit")?;
        let minimum_credit = minimum_credit_raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid minimum credit: {:?}", minimum_credit_raw))?;
        let start_date = next_line("start date")?;
        let end_date = next_line("end date")?;
        let output_format = OutputFormat::from_input(&next_line("output format")?);
        let output_directory = PathBuf::from(next_line("output directory")?);

        Ok(Self {
            pins,
            minimum_credit,
            start_date,
            end_date,
            output_format,
            output_directory,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Student {
    pub pin: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Instructor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub instructor_id: i64,
    #[sqlx(try_from = "i64")]
    pub total_time: u8,
    #[sqlx(try_from = "i64")]
    pub credit: u8,
}

/// A student's enrollment in a course; `completion_date` is empty until the course is finished.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StudentCourse {
    pub student_pin: String,
    pub course_id: i64,
    pub completion_date: Option<NaiveDateTime>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Instructor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub name: String,
    pub total_time: u8,
    pub credit: u8,
    pub instructor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSummary {
    pub name: String,
    pub total_credit: u32,
    pub courses: Vec<CourseSummary>,
}
