use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::info;
use utoipa::ToSchema;

use crate::api::{AppState, AuthUser, error_response, ok_response, store_failure};
use crate::assignment::{AssignmentStatus, CourseAssignment};
use crate::course::CourseSummary;
use crate::progress::CourseProgressRecord;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub user_id: String,
    pub course_id: String,
    pub manager_id: String,
    pub manager_name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsQuery {
    pub user_id: Option<String>,
}

/// A user's assigned course: catalog data plus the assignment metadata the
/// dashboard card shows.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignedCourse {
    #[serde(flatten)]
    pub course: CourseSummary,
    pub assignment: AssignmentInfo,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInfo {
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub status: AssignmentStatus,
}

/// Manager view row: the assignment joined with the assignee's progress
/// record and the course title.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagerAssignmentRow {
    #[serde(flatten)]
    pub assignment: CourseAssignment,
    pub progress: Option<CourseProgressRecord>,
    pub course_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/assign-course",
    responses((status = 200), (status = 403))
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateAssignmentRequest>,
) -> Response {
    if !auth.role.is_manager() {
        return error_response(
            StatusCode::FORBIDDEN,
            "Access denied. Manager or admin role required.",
        );
    }
    let assignment = CourseAssignment {
        user_id: req.user_id,
        course_id: req.course_id,
        manager_id: req.manager_id,
        manager_name: req.manager_name,
        note: req.note,
        due_date: req.due_date,
        status: AssignmentStatus::Assigned,
    };
    match state.assignments.put(&assignment).await {
        Ok(()) => {
            info!(
                user_id = %assignment.user_id,
                course_id = %assignment.course_id,
                manager_id = %assignment.manager_id,
                "course assigned"
            );
            ok_response(
                "Assign Course successfully",
                json!({ "assignCourse": assignment }),
            )
        }
        Err(e) => store_failure("Error assigning", e),
    }
}

#[utoipa::path(get, path = "/assign-course", responses((status = 200)))]
pub async fn list_assignments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListAssignmentsQuery>,
) -> Response {
    let result = match query.user_id.as_deref() {
        Some("all") | None => state.assignments.scan().await,
        Some(user_id) => state.assignments.list_for_user(user_id).await,
    };
    match result {
        Ok(assignments) => ok_response("Assignment retrieved successfully", assignments),
        Err(e) => store_failure("Error retrieving assignment", e),
    }
}

#[utoipa::path(
    get,
    path = "/assign-course/{user_id}/courses/{course_id}",
    responses((status = 200), (status = 404))
)]
pub async fn get_user_assignment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Response {
    if auth.user_id != user_id {
        return error_response(StatusCode::FORBIDDEN, "get user assigned course Access denied");
    }
    match state.assignments.get(&user_id, &course_id).await {
        Ok(Some(assignment)) => ok_response("Assignment retrieved successfully", assignment),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Assignment not found for this user"),
        Err(e) => store_failure("Error retrieving assigned courses", e),
    }
}

#[utoipa::path(
    get,
    path = "/assign-course/{user_id}/assigned",
    responses((status = 200), (status = 403))
)]
pub async fn get_user_assigned_courses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Response {
    if auth.user_id != user_id {
        return error_response(
            StatusCode::FORBIDDEN,
            "get user assigned courses Access denied",
        );
    }
    let assignments = match state.assignments.list_for_user(&user_id).await {
        Ok(assignments) => assignments,
        Err(e) => return store_failure("Error retrieving assigned courses", e),
    };
    let course_ids: Vec<String> = assignments.iter().map(|a| a.course_id.clone()).collect();
    let courses = if course_ids.is_empty() {
        Vec::new()
    } else {
        match state.catalog.batch_get(&course_ids).await {
            Ok(courses) => courses,
            Err(e) => return store_failure("Error retrieving assigned courses", e),
        }
    };
    let merged: Vec<AssignedCourse> = courses
        .into_iter()
        .filter_map(|course| {
            assignments
                .iter()
                .find(|a| a.course_id == course.course_id)
                .map(|a| AssignedCourse {
                    course,
                    assignment: AssignmentInfo {
                        note: a.note.clone(),
                        due_date: a.due_date,
                        status: a.status,
                    },
                })
        })
        .collect();
    ok_response("Assigned courses retrieved successfully", merged)
}

#[utoipa::path(
    get,
    path = "/assign-course/manager/{manager_id}",
    responses((status = 200), (status = 403))
)]
pub async fn get_manager_assigned_courses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(manager_id): Path<String>,
) -> Response {
    if auth.user_id != manager_id {
        return error_response(
            StatusCode::FORBIDDEN,
            "get manager assigned courses Access denied.",
        );
    }
    let assignments = match state.assignments.list_for_manager(&manager_id).await {
        Ok(assignments) => assignments,
        Err(e) => return store_failure("Error retrieving assignments with progress", e),
    };
    let mut rows = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let course_name = match state.catalog.get(&assignment.course_id).await {
            Ok(course) => course.map(|c| c.title),
            Err(e) => return store_failure("Error retrieving assignments with progress", e),
        };
        let progress = match state
            .progress
            .get(&assignment.user_id, &assignment.course_id)
            .await
        {
            Ok(progress) => progress,
            Err(e) => return store_failure("Error retrieving assignments with progress", e),
        };
        rows.push(ManagerAssignmentRow {
            assignment,
            progress,
            course_name,
        });
    }
    ok_response("Assigned courses with progress retrieved successfully", rows)
}
