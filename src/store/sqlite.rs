use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use time::OffsetDateTime;

use crate::assignment::{AssignmentStatus, CourseAssignment};
use crate::course::{CourseSection, CourseSummary};
use crate::progress::{CourseProgressRecord, ProgressStatus, SectionProgress};
use crate::store::{AssignmentStore, CourseCatalog, ProgressStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS course_progress (
    user_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    enrollment_date TEXT NOT NULL,
    overall_progress INTEGER NOT NULL,
    status TEXT NOT NULL,
    sections TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    PRIMARY KEY (user_id, course_id)
);
CREATE TABLE IF NOT EXISTS course_assignment (
    user_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    manager_id TEXT NOT NULL,
    manager_name TEXT NOT NULL,
    note TEXT,
    due_date TEXT,
    status TEXT NOT NULL,
    PRIMARY KEY (user_id, course_id)
);
CREATE TABLE IF NOT EXISTS course (
    course_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    teacher_name TEXT,
    sections TEXT NOT NULL
);
"#;

/// SQLite-backed store. The section trees are persisted as JSON document
/// columns, keyed by (user_id, course_id) like the document store the
/// deployment targets.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a database file and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Single-connection in-memory database, one per call.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn progress_from_row(row: &SqliteRow) -> anyhow::Result<CourseProgressRecord> {
    let sections: Vec<SectionProgress> = serde_json::from_str(row.try_get("sections")?)?;
    let status: &str = row.try_get("status")?;
    Ok(CourseProgressRecord {
        user_id: row.try_get("user_id")?,
        course_id: row.try_get("course_id")?,
        enrollment_date: row.try_get::<OffsetDateTime, _>("enrollment_date")?,
        overall_progress: row.try_get::<i64, _>("overall_progress")? as u8,
        status: ProgressStatus::from(status),
        sections,
        last_accessed_timestamp: row.try_get::<OffsetDateTime, _>("last_accessed")?,
    })
}

fn assignment_from_row(row: &SqliteRow) -> anyhow::Result<CourseAssignment> {
    let status: &str = row.try_get("status")?;
    Ok(CourseAssignment {
        user_id: row.try_get("user_id")?,
        course_id: row.try_get("course_id")?,
        manager_id: row.try_get("manager_id")?,
        manager_name: row.try_get("manager_name")?,
        note: row.try_get("note")?,
        due_date: row.try_get::<Option<OffsetDateTime>, _>("due_date")?,
        status: AssignmentStatus::from(status),
    })
}

fn course_from_row(row: &SqliteRow) -> anyhow::Result<CourseSummary> {
    let sections: Vec<CourseSection> = serde_json::from_str(row.try_get("sections")?)?;
    Ok(CourseSummary {
        course_id: row.try_get("course_id")?,
        title: row.try_get("title")?,
        teacher_name: row.try_get("teacher_name")?,
        sections,
    })
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseProgressRecord>> {
        let row = sqlx::query(
            "SELECT user_id, course_id, enrollment_date, overall_progress, status, sections, \
             last_accessed FROM course_progress WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(progress_from_row).transpose()
    }

    async fn put(&self, record: &CourseProgressRecord) -> anyhow::Result<()> {
        let sections = serde_json::to_string(&record.sections)?;
        sqlx::query(
            "REPLACE INTO course_progress (user_id, course_id, enrollment_date, \
             overall_progress, status, sections, last_accessed) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.user_id)
        .bind(&record.course_id)
        .bind(record.enrollment_date)
        .bind(record.overall_progress as i64)
        .bind(record.status.as_str())
        .bind(sections)
        .bind(record.last_accessed_timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseProgressRecord>> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, enrollment_date, overall_progress, status, sections, \
             last_accessed FROM course_progress WHERE user_id = ? ORDER BY course_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(progress_from_row).collect()
    }

    async fn scan(&self) -> anyhow::Result<Vec<CourseProgressRecord>> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, enrollment_date, overall_progress, status, sections, \
             last_accessed FROM course_progress ORDER BY user_id, course_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(progress_from_row).collect()
    }
}

#[async_trait]
impl AssignmentStore for SqliteStore {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseAssignment>> {
        let row = sqlx::query(
            "SELECT user_id, course_id, manager_id, manager_name, note, due_date, status \
             FROM course_assignment WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn put(&self, assignment: &CourseAssignment) -> anyhow::Result<()> {
        sqlx::query(
            "REPLACE INTO course_assignment (user_id, course_id, manager_id, manager_name, \
             note, due_date, status) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&assignment.user_id)
        .bind(&assignment.course_id)
        .bind(&assignment.manager_id)
        .bind(&assignment.manager_name)
        .bind(&assignment.note)
        .bind(assignment.due_date)
        .bind(assignment.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseAssignment>> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, manager_id, manager_name, note, due_date, status \
             FROM course_assignment WHERE user_id = ? ORDER BY course_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(assignment_from_row).collect()
    }

    async fn list_for_manager(&self, manager_id: &str) -> anyhow::Result<Vec<CourseAssignment>> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, manager_id, manager_name, note, due_date, status \
             FROM course_assignment WHERE manager_id = ? ORDER BY user_id, course_id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(assignment_from_row).collect()
    }

    async fn scan(&self) -> anyhow::Result<Vec<CourseAssignment>> {
        let rows = sqlx::query(
            "SELECT user_id, course_id, manager_id, manager_name, note, due_date, status \
             FROM course_assignment ORDER BY user_id, course_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(assignment_from_row).collect()
    }
}

#[async_trait]
impl CourseCatalog for SqliteStore {
    async fn get(&self, course_id: &str) -> anyhow::Result<Option<CourseSummary>> {
        let row = sqlx::query(
            "SELECT course_id, title, teacher_name, sections FROM course WHERE course_id = ?",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn batch_get(&self, course_ids: &[String]) -> anyhow::Result<Vec<CourseSummary>> {
        // No IN-list binding without a query builder; course lists are small.
        let mut courses = Vec::with_capacity(course_ids.len());
        for id in course_ids {
            if let Some(course) = CourseCatalog::get(self, id).await? {
                courses.push(course);
            }
        }
        Ok(courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ChapterProgress, ProgressStatus};
    use crate::utils::now_local;

    fn record(user_id: &str, course_id: &str) -> CourseProgressRecord {
        let mut record = CourseProgressRecord::new(user_id, course_id);
        record.sections = vec![SectionProgress {
            section_id: "s1".to_string(),
            chapters: vec![ChapterProgress {
                chapter_id: "ch1".to_string(),
                completed: true,
            }],
        }];
        record.overall_progress = 100;
        record.status = ProgressStatus::Completed;
        record
    }

    #[tokio::test]
    async fn progress_roundtrip() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let record = record("u1", "c1");
        ProgressStore::put(&store, &record).await.unwrap();
        let loaded = ProgressStore::get(&store, "u1", "c1").await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.overall_progress, 100);
        assert_eq!(loaded.status, ProgressStatus::Completed);
        assert_eq!(loaded.sections.len(), 1);
        assert_eq!(loaded.sections[0].chapters[0].chapter_id, "ch1");

        assert!(ProgressStore::get(&store, "u1", "c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_creates_file_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.db");

        let store = SqliteStore::open(&path).await.unwrap();
        ProgressStore::put(&store, &record("u1", "c1")).await.unwrap();
        store.pool().close().await;

        // schema init is idempotent and the data lives in the file
        let store = SqliteStore::open(&path).await.unwrap();
        let loaded = ProgressStore::get(&store, "u1", "c1").await.unwrap().unwrap();
        assert_eq!(loaded.overall_progress, 100);
        assert_eq!(loaded.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn replace_keeps_one_record_per_key() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut record = record("u1", "c1");
        ProgressStore::put(&store, &record).await.unwrap();
        record.overall_progress = 50;
        record.status = ProgressStatus::InProgress;
        ProgressStore::put(&store, &record).await.unwrap();

        let all = ProgressStore::scan(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].overall_progress, 50);
    }

    #[tokio::test]
    async fn assignment_roundtrip_with_optional_fields() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let assignment = CourseAssignment {
            user_id: "u1".to_string(),
            course_id: "c1".to_string(),
            manager_id: "m1".to_string(),
            manager_name: "Morgan".to_string(),
            note: None,
            due_date: Some(now_local()),
            status: AssignmentStatus::Assigned,
        };
        AssignmentStore::put(&store, &assignment).await.unwrap();
        let loaded = AssignmentStore::get(&store, "u1", "c1").await.unwrap().unwrap();
        assert_eq!(loaded.status, AssignmentStatus::Assigned);
        assert!(loaded.note.is_none());
        assert!(loaded.due_date.is_some());

        let by_manager = store.list_for_manager("m1").await.unwrap();
        assert_eq!(by_manager.len(), 1);
    }

    #[tokio::test]
    async fn catalog_batch_get_skips_missing() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO course (course_id, title, teacher_name, sections) VALUES (?, ?, ?, ?)")
            .bind("c1")
            .bind("Rust Basics")
            .bind(Option::<String>::None)
            .bind("[]")
            .execute(store.pool())
            .await
            .unwrap();
        let courses = store
            .batch_get(&["c1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "Rust Basics");
    }
}
