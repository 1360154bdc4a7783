use async_trait::async_trait;
use dashmap::DashMap;

use crate::assignment::CourseAssignment;
use crate::course::CourseSummary;
use crate::progress::CourseProgressRecord;
use crate::store::{AssignmentStore, CourseCatalog, ProgressStore};

type UserCourseKey = (String, String);

/// In-memory store over `DashMap`, one map per collection. Used by the unit
/// and route tests, and handy for running the server without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    progress: DashMap<UserCourseKey, CourseProgressRecord>,
    assignments: DashMap<UserCourseKey, CourseAssignment>,
    courses: DashMap<String, CourseSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog entry. The catalog is read-only for the server itself.
    pub fn insert_course(&self, course: CourseSummary) {
        self.courses.insert(course.course_id.clone(), course);
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseProgressRecord>> {
        let key = (user_id.to_string(), course_id.to_string());
        Ok(self.progress.get(&key).map(|r| r.value().clone()))
    }

    async fn put(&self, record: &CourseProgressRecord) -> anyhow::Result<()> {
        let key = (record.user_id.clone(), record.course_id.clone());
        self.progress.insert(key, record.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseProgressRecord>> {
        Ok(self
            .progress
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn scan(&self) -> anyhow::Result<Vec<CourseProgressRecord>> {
        Ok(self.progress.iter().map(|e| e.value().clone()).collect())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseAssignment>> {
        let key = (user_id.to_string(), course_id.to_string());
        Ok(self.assignments.get(&key).map(|a| a.value().clone()))
    }

    async fn put(&self, assignment: &CourseAssignment) -> anyhow::Result<()> {
        let key = (assignment.user_id.clone(), assignment.course_id.clone());
        self.assignments.insert(key, assignment.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseAssignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list_for_manager(&self, manager_id: &str) -> anyhow::Result<Vec<CourseAssignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|e| e.value().manager_id == manager_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn scan(&self) -> anyhow::Result<Vec<CourseAssignment>> {
        Ok(self.assignments.iter().map(|e| e.value().clone()).collect())
    }
}

#[async_trait]
impl CourseCatalog for MemoryStore {
    async fn get(&self, course_id: &str) -> anyhow::Result<Option<CourseSummary>> {
        Ok(self.courses.get(course_id).map(|c| c.value().clone()))
    }

    async fn batch_get(&self, course_ids: &[String]) -> anyhow::Result<Vec<CourseSummary>> {
        Ok(course_ids
            .iter()
            .filter_map(|id| self.courses.get(id).map(|c| c.value().clone()))
            .collect())
    }
}
