use crate::error::Result;
use crate::models::{OutputFormat, StudentSummary};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Kept as `repost.csv` so existing consumers of the report keep finding it.
pub const CSV_FILE_NAME: &str = "repost.csv";
pub const HTML_FILE_NAME: &str = "report.html";

pub trait ReportWriter {
    fn file_name(&self) -> &'static str;

    /// Overwrites `<output_dir>/<file_name>`. The directory must already exist.
    fn write(&self, students: &[StudentSummary], output_dir: &Path) -> Result<PathBuf>;
}

pub struct CsvReport;

pub struct HtmlReport;

pub fn writers_for(format: OutputFormat) -> Vec<Box<dyn ReportWriter>> {
    match format {
        OutputFormat::Csv => vec![Box::new(CsvReport)],
        OutputFormat::Html => vec![Box::new(HtmlReport)],
        OutputFormat::Both => vec![Box::new(CsvReport), Box::new(HtmlReport)],
    }
}

impl ReportWriter for CsvReport {
    fn file_name(&self) -> &'static str {
        CSV_FILE_NAME
    }

    fn write(&self, students: &[StudentSummary], output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(self.file_name());
        let file = fs::File::create(&path)?;
        write_csv(students, file)?;
        Ok(path)
    }
}

/// Two header lines, then a `Name,TotalCredit` line per student followed by
/// its course lines. Fields are written verbatim, without quoting.
pub fn write_csv<W: Write>(students: &[StudentSummary], out: W) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(["Student", "TotalCredit"])?;
    writer.write_record(["CourseName", "Time", "Credit", "Instructor"])?;

    for student in students {
        writer.write_record(&[&student.name, &student.total_credit.to_string()])?;

        for course in &student.courses {
            writer.write_record(&[
                &course.name,
                &course.total_time.to_string(),
                &course.credit.to_string(),
                &course.instructor_name,
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

impl ReportWriter for HtmlReport {
    fn file_name(&self) -> &'static str {
        HTML_FILE_NAME
    }

    fn write(&self, students: &[StudentSummary], output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(self.file_name());
        fs::write(&path, render_html(students))?;
        Ok(path)
    }
}

/// A single `<table>`: student rows carry name and total, course rows are
/// indented by one empty cell. Names are not HTML-escaped.
pub fn render_html(students: &[StudentSummary]) -> String {
    let mut html = String::new();
    html.push_str("<table>");

    html.push_str("<thead><tr>");
    html.push_str("<th>Student</th>");
    html.push_str("<th>Total Credit</th>");
    html.push_str("<th></th><th></th><th></th>");
    html.push_str("</tr>");
    html.push_str("<tr><th></th>");
    html.push_str("<th>Course Name</th>");
    html.push_str("<th>Time</th>");
    html.push_str("<th>Credit</th>");
    html.push_str("<th>Instructor</th>");
    html.push_str("</tr></thead>");

    html.push_str("<tbody>");
    for student in students {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", student.name));
        html.push_str(&format!("<td>{}</td>", student.total_credit));
        html.push_str("<td></td><td></td><td></td>");
        html.push_str("</tr>");

        for course in &student.courses {
            html.push_str("<tr>");
            html.push_str("<td></td>");
            html.push_str(&format!("<td>{}</td>", course.name));
            html.push_str(&format!("<td>{}</td>", course.total_time));
            html.push_str(&format!("<td>{}</td>", course.credit));
            html.push_str(&format!("<td>{}</td>", course.instructor_name));
            html.push_str("</tr>");
        }
    }
    html.push_str("</tbody>");

    html.push_str("</table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::CourseSummary;
    use scraper::{Html, Selector};

    fn jane_doe() -> Vec<StudentSummary> {
        vec![StudentSummary {
            name: "Jane Doe".to_string(),
            total_credit: 6,
            courses: vec![CourseSummary {
                name: "Algebra".to_string(),
                total_time: 10,
                credit: 6,
                instructor_name: "John Smith".to_string(),
            }],
        }]
    }

    fn csv_text(students: &[StudentSummary]) -> String {
        let mut buffer = Vec::new();
        write_csv(students, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_csv_layout() {
        assert_eq!(
            csv_text(&jane_doe()),
            "Student,TotalCredit\n\
             CourseName,Time,Credit,Instructor\n\
             Jane Doe,6\n\
             Algebra,10,6,John Smith\n"
        );
    }

    #[test]
    fn test_csv_empty_report_has_only_headers() {
        assert_eq!(
            csv_text(&[]),
            "Student,TotalCredit\nCourseName,Time,Credit,Instructor\n"
        );
    }

    #[test]
    fn test_csv_does_not_quote_delimiters() {
        let mut students = jane_doe();
        students[0].name = "Doe, Jane".to_string();
        students[0].courses[0].name = "Algebra \"I\"".to_string();

        let text = csv_text(&students);
        assert!(text.contains("\nDoe, Jane,6\n"));
        assert!(text.contains("\nAlgebra \"I\",10,6,John Smith\n"));
    }

    #[test]
    fn test_csv_student_without_courses() {
        let students = vec![StudentSummary {
            name: "Dan Idle".to_string(),
            total_credit: 0,
            courses: Vec::new(),
        }];
        assert!(csv_text(&students).ends_with("CourseName,Time,Credit,Instructor\nDan Idle,0\n"));
    }

    #[test]
    fn test_html_rows() {
        let html = render_html(&jane_doe());

        assert!(html.contains(
            "<tr><td>Jane Doe</td><td>6</td><td></td><td></td><td></td></tr>\
             <tr><td></td><td>Algebra</td><td>10</td><td>6</td><td>John Smith</td></tr>"
        ));
        assert!(html.starts_with("<table><thead>"));
        assert!(html.ends_with("</tbody></table>"));
    }

    #[test]
    fn test_html_structure() {
        let mut students = jane_doe();
        students.push(StudentSummary {
            name: "Cleo Clark".to_string(),
            total_credit: 0,
            courses: Vec::new(),
        });

        let document = Html::parse_fragment(&render_html(&students));
        let header_rows = Selector::parse("thead tr").unwrap();
        let body_rows = Selector::parse("tbody tr").unwrap();
        let header_cells = Selector::parse("th").unwrap();

        let headers: Vec<Vec<String>> = document
            .select(&header_rows)
            .map(|row| row.select(&header_cells).map(|c| c.text().collect()).collect())
            .collect();
        assert_eq!(
            headers,
            vec![
                vec!["Student", "Total Credit", "", "", ""],
                vec!["", "Course Name", "Time", "Credit", "Instructor"],
            ]
        );
        assert_eq!(document.select(&body_rows).count(), 3);
    }

    #[test]
    fn test_html_does_not_escape_names() {
        let mut students = jane_doe();
        students[0].courses[0].name = "R&D <basics>".to_string();
        assert!(render_html(&students).contains("<td>R&D <basics></td>"));
    }

    #[test]
    fn test_writers_for_format() {
        let names = |format| {
            writers_for(format)
                .iter()
                .map(|w| w.file_name())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(OutputFormat::Csv), vec![CSV_FILE_NAME]);
        assert_eq!(names(OutputFormat::Html), vec![HTML_FILE_NAME]);
        assert_eq!(names(OutputFormat::Both), vec![CSV_FILE_NAME, HTML_FILE_NAME]);
    }

    #[test]
    fn test_write_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CSV_FILE_NAME), "stale").unwrap();

        let csv_path = CsvReport.write(&jane_doe(), dir.path()).unwrap();
        let html_path = HtmlReport.write(&jane_doe(), dir.path()).unwrap();

        assert_eq!(csv_path, dir.path().join("repost.csv"));
        assert_eq!(html_path, dir.path().join("report.html"));
        assert!(fs::read_to_string(csv_path).unwrap().starts_with("Student,TotalCredit\n"));
        assert_eq!(fs::read_to_string(html_path).unwrap(), render_html(&jane_doe()));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(
            CsvReport.write(&jane_doe(), &missing),
            Err(ReportError::Io(_))
        ));
        assert!(matches!(
            HtmlReport.write(&jane_doe(), &missing),
            Err(ReportError::Io(_))
        ));
        assert!(!missing.exists());
    }
}
