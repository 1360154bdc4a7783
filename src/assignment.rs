use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Lifecycle of a manager-assigned course. Only the transition to
/// `Completed` is owned by the progress core; everything else is driven by
/// assignment management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub enum AssignmentStatus {
    Assigned,
    Enrolled,
    Canceled,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "Assigned",
            AssignmentStatus::Enrolled => "Enrolled",
            AssignmentStatus::Canceled => "Canceled",
            AssignmentStatus::Completed => "Completed",
        }
    }
}

impl From<&str> for AssignmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "Enrolled" => AssignmentStatus::Enrolled,
            "Canceled" => AssignmentStatus::Canceled,
            "Completed" => AssignmentStatus::Completed,
            _ => AssignmentStatus::Assigned,
        }
    }
}

/// A manager's directive that a user complete a course. Shares the
/// (user, course) key pair with the progress record but lives independently:
/// either side may exist without the other.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub user_id: String,
    pub course_id: String,
    pub manager_id: String,
    pub manager_name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub status: AssignmentStatus,
}
