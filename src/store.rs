use crate::error::Result;
use crate::models::{Course, Instructor, Student, StudentCourse};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Everything one report run reads from the database, held in memory for the join.
#[derive(Debug)]
pub struct Catalog {
    pub students: Vec<Student>,
    pub instructors: HashMap<i64, Instructor>,
    pub courses: HashMap<i64, Course>,
    pub completions: Vec<StudentCourse>,
}

/// A database session scoped to a single report run.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str, run_migrations: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        debug!(database_url, "Opened database session");

        let store = Self { pool };
        if run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn load_catalog(&self) -> Result<Catalog> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT pin, first_name, last_name FROM students ORDER BY pin",
        )
        .fetch_all(&self.pool)
        .await?;

        let instructors = sqlx::query_as::<_, Instructor>(
            "SELECT id, first_name, last_name FROM instructors",
        )
        .fetch_all(&self.pool)
        .await?;

        let courses = sqlx::query_as::<_, Course>(
            "SELECT id, name, instructor_id, total_time, credit FROM courses",
        )
        .fetch_all(&self.pool)
        .await?;

        let completions = sqlx::query_as::<_, StudentCourse>(
            r#"
            SELECT student_pin, course_id, datetime(completion_date) AS completion_date
            FROM students_courses_xref
            ORDER BY student_pin, course_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        info!(
            students = students.len(),
            courses = courses.len(),
            completions = completions.len(),
            "Loaded course catalog"
        );

        Ok(Catalog {
            students,
            instructors: instructors.into_iter().map(|i| (i.id, i)).collect(),
            courses: courses.into_iter().map(|c| (c.id, c)).collect(),
            completions,
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
        debug!("Closed database session");
    }
}
