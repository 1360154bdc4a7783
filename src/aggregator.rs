use std::sync::Arc;

use tracing::{info, warn};

use crate::assignment::AssignmentStatus;
use crate::error::Error;
use crate::progress::{
    CourseProgressRecord, ProgressStatus, SectionProgress, compute_overall_progress,
    merge_sections, validate_sections,
};
use crate::store::{AssignmentStore, CourseCatalog, ProgressStore};
use crate::utils::now_local;

/// Maintains the derived progress state for (user, course) pairs and
/// propagates completion to any linked assignment.
///
/// Each call is one read-modify-write over a single progress record; the
/// assignment side effect runs only after that write is durable and its
/// failure never rolls the progress update back.
#[derive(Clone)]
pub struct ProgressAggregator {
    progress: Arc<dyn ProgressStore>,
    assignments: Arc<dyn AssignmentStore>,
    catalog: Option<Arc<dyn CourseCatalog>>,
}

impl ProgressAggregator {
    pub fn new(progress: Arc<dyn ProgressStore>, assignments: Arc<dyn AssignmentStore>) -> Self {
        Self {
            progress,
            assignments,
            catalog: None,
        }
    }

    /// With a catalog attached, a record created on first write starts from
    /// the course's full section/chapter shape (all incomplete) instead of
    /// an empty tree, so the percentage counts unvisited chapters too.
    pub fn with_catalog(mut self, catalog: Arc<dyn CourseCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Read-through to the store. `NotFound` means "not yet enrolled", an
    /// expected state callers should not retry.
    pub async fn get_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<CourseProgressRecord, Error> {
        self.progress
            .get(user_id, course_id)
            .await
            .map_err(Error::Store)?
            .ok_or(Error::NotFound)
    }

    /// Merge a partial snapshot into the stored record (creating it on first
    /// write), recompute the derived fields, persist, and flip any linked
    /// assignment to `Completed` once the course reaches 100%.
    pub async fn apply_update(
        &self,
        user_id: &str,
        course_id: &str,
        incoming: Vec<SectionProgress>,
    ) -> Result<CourseProgressRecord, Error> {
        validate_sections(&incoming).map_err(Error::Validation)?;

        let mut record = match self
            .progress
            .get(user_id, course_id)
            .await
            .map_err(Error::Store)?
        {
            Some(record) => record,
            None => {
                info!(user_id, course_id, "creating progress record on first update");
                let mut record = CourseProgressRecord::new(user_id, course_id);
                if let Some(catalog) = &self.catalog {
                    if let Some(course) =
                        catalog.get(course_id).await.map_err(Error::Store)?
                    {
                        record.sections = course.initial_progress();
                    }
                }
                record
            }
        };

        merge_sections(&mut record.sections, incoming);
        record.overall_progress = compute_overall_progress(&record.sections);
        record.status = if record.overall_progress == 100 {
            ProgressStatus::Completed
        } else {
            ProgressStatus::InProgress
        };
        record.last_accessed_timestamp = now_local();

        self.progress.put(&record).await.map_err(Error::Store)?;

        // One-way ratchet: runs on every completed update so a lost attempt
        // is retried by the next call, and never reverses on un-completion.
        if record.status == ProgressStatus::Completed {
            if let Err(e) = self.complete_assignment(user_id, course_id).await {
                warn!(
                    user_id,
                    course_id,
                    error = %e,
                    "progress saved but assignment completion failed"
                );
            }
        }

        Ok(record)
    }

    async fn complete_assignment(&self, user_id: &str, course_id: &str) -> anyhow::Result<()> {
        let Some(mut assignment) = self.assignments.get(user_id, course_id).await? else {
            return Ok(());
        };
        if assignment.status == AssignmentStatus::Completed {
            return Ok(());
        }
        assignment.status = AssignmentStatus::Completed;
        self.assignments.put(&assignment).await?;
        info!(user_id, course_id, "assignment marked completed");
        Ok(())
    }
}
