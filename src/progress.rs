use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::utils::now_local;

/// Completion state of a single chapter, the smallest trackable unit.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    /// Identifier of the chapter, unique within its section
    pub chapter_id: String,
    pub completed: bool,
}

/// Per-section slice of a progress record. Chapters keep the order of
/// their first write so the dashboard renders them stably.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    /// Identifier of the section, unique within the course
    pub section_id: String,
    #[serde(default)]
    pub chapters: Vec<ChapterProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl From<&str> for ProgressStatus {
    fn from(value: &str) -> Self {
        match value {
            "completed" => ProgressStatus::Completed,
            _ => ProgressStatus::InProgress,
        }
    }
}

/// Authoritative progress state for one (user, course) pair.
///
/// `overall_progress` and `status` are derived from `sections` and are
/// recomputed on every merge; nothing else writes them.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressRecord {
    pub user_id: String,
    pub course_id: String,
    /// Set once when the record is first created, immutable afterwards
    #[serde(with = "time::serde::rfc3339")]
    pub enrollment_date: OffsetDateTime,
    /// Derived percentage 0..=100
    pub overall_progress: u8,
    pub status: ProgressStatus,
    #[serde(default)]
    pub sections: Vec<SectionProgress>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed_timestamp: OffsetDateTime,
}

impl CourseProgressRecord {
    /// Fresh record for a first progress update, before any merge.
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        let now = now_local();
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            enrollment_date: now,
            overall_progress: 0,
            status: ProgressStatus::InProgress,
            sections: Vec::new(),
            last_accessed_timestamp: now,
        }
    }
}

/// Merge a partial snapshot into the stored sections tree.
///
/// Sections and chapters are matched by id. A matched chapter takes the
/// incoming `completed` value as-is (last writer wins, un-completing
/// included); unmatched incoming entries are appended; stored entries the
/// payload does not mention are left untouched.
pub fn merge_sections(existing: &mut Vec<SectionProgress>, incoming: Vec<SectionProgress>) {
    for section in incoming {
        match existing
            .iter_mut()
            .find(|s| s.section_id == section.section_id)
        {
            Some(current) => {
                for chapter in section.chapters {
                    match current
                        .chapters
                        .iter_mut()
                        .find(|c| c.chapter_id == chapter.chapter_id)
                    {
                        Some(c) => c.completed = chapter.completed,
                        None => current.chapters.push(chapter),
                    }
                }
            }
            None => existing.push(section),
        }
    }
}

/// Percentage of completed chapters over the whole tree, rounded half-up.
/// A tree with no chapters counts as 0, never a division error.
pub fn compute_overall_progress(sections: &[SectionProgress]) -> u8 {
    let total: usize = sections.iter().map(|s| s.chapters.len()).sum();
    if total == 0 {
        return 0;
    }
    let completed = sections
        .iter()
        .flat_map(|s| &s.chapters)
        .filter(|c| c.completed)
        .count();
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Reject a payload before it touches the stored record. Serde already
/// guarantees the field types; this catches empty identifiers.
pub fn validate_sections(sections: &[SectionProgress]) -> Result<(), String> {
    for section in sections {
        if section.section_id.is_empty() {
            return Err("sectionId must not be empty".to_string());
        }
        for chapter in &section.chapters {
            if chapter.chapter_id.is_empty() {
                return Err(format!(
                    "chapterId must not be empty in section {}",
                    section.section_id
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, chapters: &[(&str, bool)]) -> SectionProgress {
        SectionProgress {
            section_id: id.to_string(),
            chapters: chapters
                .iter()
                .map(|(id, completed)| ChapterProgress {
                    chapter_id: id.to_string(),
                    completed: *completed,
                })
                .collect(),
        }
    }

    #[test]
    fn rounding_matches_half_up() {
        let sections = vec![section("s1", &[("c1", true), ("c2", false), ("c3", false)])];
        assert_eq!(compute_overall_progress(&sections), 33);
        let sections = vec![section("s1", &[("c1", true), ("c2", true), ("c3", false)])];
        assert_eq!(compute_overall_progress(&sections), 67);
        let sections = vec![section("s1", &[("c1", true), ("c2", false)])];
        assert_eq!(compute_overall_progress(&sections), 50);
    }

    #[test]
    fn rounding_half_goes_up_not_to_even() {
        // 1/8 = 12.5% and 3/8 = 37.5%: half-up gives 13/38, half-even 12/38
        let chapters: Vec<(String, bool)> = (0..8).map(|i| (format!("c{i}"), i < 1)).collect();
        let refs: Vec<(&str, bool)> = chapters.iter().map(|(id, c)| (id.as_str(), *c)).collect();
        assert_eq!(compute_overall_progress(&[section("s1", &refs)]), 13);
        let chapters: Vec<(String, bool)> = (0..8).map(|i| (format!("c{i}"), i < 3)).collect();
        let refs: Vec<(&str, bool)> = chapters.iter().map(|(id, c)| (id.as_str(), *c)).collect();
        assert_eq!(compute_overall_progress(&[section("s1", &refs)]), 38);

        // 199/200 = 99.5% rounds up to 100, which marks the course completed
        let chapters: Vec<(String, bool)> = (0..200).map(|i| (format!("c{i}"), i < 199)).collect();
        let refs: Vec<(&str, bool)> = chapters.iter().map(|(id, c)| (id.as_str(), *c)).collect();
        assert_eq!(compute_overall_progress(&[section("s1", &refs)]), 100);
    }

    #[test]
    fn empty_tree_is_zero() {
        assert_eq!(compute_overall_progress(&[]), 0);
        let sections = vec![section("s1", &[]), section("s2", &[])];
        assert_eq!(compute_overall_progress(&sections), 0);
    }

    #[test]
    fn full_tree_is_hundred() {
        let sections = vec![
            section("s1", &[("c1", true), ("c2", true)]),
            section("s2", &[("c3", true)]),
        ];
        assert_eq!(compute_overall_progress(&sections), 100);
    }

    #[test]
    fn merge_adds_new_section_and_keeps_old() {
        let mut existing = vec![section("a", &[("a1", true), ("a2", true)])];
        merge_sections(&mut existing, vec![section("b", &[("b1", true)])]);
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].section_id, "a");
        assert!(existing[0].chapters.iter().all(|c| c.completed));
        assert_eq!(existing[1].section_id, "b");
        assert_eq!(compute_overall_progress(&existing), 100);
    }

    #[test]
    fn merge_overwrites_matched_chapter_last_writer_wins() {
        let mut existing = vec![section("s1", &[("c1", true), ("c2", false)])];
        merge_sections(&mut existing, vec![section("s1", &[("c1", false)])]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].chapters.len(), 2);
        assert!(!existing[0].chapters[0].completed);
        assert!(!existing[0].chapters[1].completed);
    }

    #[test]
    fn merge_appends_unknown_chapter() {
        let mut existing = vec![section("s1", &[("c1", true)])];
        merge_sections(&mut existing, vec![section("s1", &[("c2", true)])]);
        assert_eq!(existing[0].chapters.len(), 2);
        assert_eq!(existing[0].chapters[1].chapter_id, "c2");
    }

    #[test]
    fn merge_preserves_first_write_order() {
        let mut existing = vec![section("s2", &[("c3", false)]), section("s1", &[("c1", false)])];
        merge_sections(
            &mut existing,
            vec![section("s1", &[("c1", true)]), section("s3", &[("c9", false)])],
        );
        let order: Vec<&str> = existing.iter().map(|s| s.section_id.as_str()).collect();
        assert_eq!(order, ["s2", "s1", "s3"]);
    }

    #[test]
    fn validation_rejects_empty_ids() {
        assert!(validate_sections(&[section("", &[("c1", true)])]).is_err());
        assert!(validate_sections(&[section("s1", &[("", true)])]).is_err());
        assert!(validate_sections(&[section("s1", &[("c1", true)])]).is_ok());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let record = CourseProgressRecord::new("u1", "c1");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("overallProgress").is_some());
        assert!(json.get("lastAccessedTimestamp").is_some());
        assert_eq!(json["status"], "in_progress");
    }
}
