pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::assignment::CourseAssignment;
use crate::course::CourseSummary;
use crate::progress::CourseProgressRecord;

/// Key-addressed access to progress records, composite key (userId, courseId).
/// Implementations only need per-record atomicity; the aggregator never asks
/// for cross-record transactions.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseProgressRecord>>;
    async fn put(&self, record: &CourseProgressRecord) -> anyhow::Result<()>;
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseProgressRecord>>;
    async fn scan(&self) -> anyhow::Result<Vec<CourseProgressRecord>>;
}

/// Same key pair, separate collection. Assignments are created by
/// assignment management; the aggregator only flips `status` to `Completed`.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> anyhow::Result<Option<CourseAssignment>>;
    async fn put(&self, assignment: &CourseAssignment) -> anyhow::Result<()>;
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<CourseAssignment>>;
    async fn list_for_manager(&self, manager_id: &str) -> anyhow::Result<Vec<CourseAssignment>>;
    async fn scan(&self) -> anyhow::Result<Vec<CourseAssignment>>;
}

/// Read-only course lookup, used to resolve titles and shapes for the
/// dashboard endpoints.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn get(&self, course_id: &str) -> anyhow::Result<Option<CourseSummary>>;
    async fn batch_get(&self, course_ids: &[String]) -> anyhow::Result<Vec<CourseSummary>>;
}
