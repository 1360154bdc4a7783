use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::progress::{ChapterProgress, SectionProgress};

/// Catalog view of a course: its identity and section/chapter shape.
/// Authoring lives elsewhere; this core only ever reads it.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub sections: Vec<CourseSection>,
}

impl CourseSummary {
    /// The progress tree a newly enrolled user starts from: every chapter of
    /// the course, none completed.
    pub fn initial_progress(&self) -> Vec<SectionProgress> {
        self.sections
            .iter()
            .map(|section| SectionProgress {
                section_id: section.section_id.clone(),
                chapters: section
                    .chapters
                    .iter()
                    .map(|chapter| ChapterProgress {
                        chapter_id: chapter.chapter_id.clone(),
                        completed: false,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSection {
    pub section_id: String,
    pub section_title: String,
    #[serde(default)]
    pub chapters: Vec<CourseChapter>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseChapter {
    pub chapter_id: String,
    pub title: String,
}
