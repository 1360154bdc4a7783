use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::api::{AppState, AuthUser, error_response, ok_response, store_failure};
use crate::error::Error;
use crate::progress::{ProgressStatus, SectionProgress};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProgressRequest {
    #[serde(default)]
    pub sections: Vec<SectionProgress>,
}

/// One row of the manager dashboard, a progress record joined with the
/// course title.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgressRow {
    pub user_id: String,
    pub course_id: String,
    pub course_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub enrollment_date: OffsetDateTime,
    pub overall_progress: u8,
    pub status: ProgressStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_accessed: OffsetDateTime,
}

#[utoipa::path(
    get,
    path = "/users/course-progress/{user_id}/courses/{course_id}",
    responses((status = 200), (status = 404))
)]
pub async fn get_user_course_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(String, String)>,
) -> Response {
    if auth.user_id != user_id {
        return error_response(StatusCode::FORBIDDEN, "Access denied");
    }
    match state.aggregator.get_progress(&user_id, &course_id).await {
        Ok(progress) => ok_response("Course progress retrieved successfully", progress),
        Err(Error::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            "Course progress not found for this user",
        ),
        Err(e) => store_failure("Error retrieving user course progress", e),
    }
}

#[utoipa::path(
    put,
    path = "/users/course-progress/{user_id}/courses/{course_id}",
    responses((status = 200), (status = 400))
)]
pub async fn update_user_course_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, course_id)): Path<(String, String)>,
    Json(req): Json<UpdateProgressRequest>,
) -> Response {
    if auth.user_id != user_id {
        return error_response(StatusCode::FORBIDDEN, "Access denied");
    }
    match state
        .aggregator
        .apply_update(&user_id, &course_id, req.sections)
        .await
    {
        Ok(progress) => ok_response("", progress),
        Err(Error::Validation(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => store_failure("Error updating user course progress", e),
    }
}

#[utoipa::path(
    get,
    path = "/users/course-progress/{user_id}/enrolled-courses",
    responses((status = 200))
)]
pub async fn get_user_enrolled_courses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Response {
    if auth.user_id != user_id {
        return error_response(StatusCode::FORBIDDEN, "get user enrolled courses Access denied");
    }
    let records = match state.progress.list_for_user(&user_id).await {
        Ok(records) => records,
        Err(e) => return store_failure("Error retrieving enrolled courses", e),
    };
    let course_ids: Vec<String> = records.into_iter().map(|r| r.course_id).collect();
    if course_ids.is_empty() {
        return ok_response("Enrolled courses retrieved successfully", Vec::<()>::new());
    }
    match state.catalog.batch_get(&course_ids).await {
        Ok(courses) => ok_response("Enrolled courses retrieved successfully", courses),
        Err(e) => store_failure("Error retrieving enrolled courses", e),
    }
}

#[utoipa::path(
    get,
    path = "/users/course-progress/all-progress",
    responses((status = 200), (status = 403))
)]
pub async fn get_all_students_progress(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Response {
    if !auth.role.is_manager() {
        return error_response(
            StatusCode::FORBIDDEN,
            "Access denied. Manager or admin role required.",
        );
    }
    let records = match state.progress.scan().await {
        Ok(records) => records,
        Err(e) => return store_failure("Error retrieving student progress data", e),
    };
    let course_ids: Vec<String> = records
        .iter()
        .map(|r| r.course_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let courses = if course_ids.is_empty() {
        Vec::new()
    } else {
        match state.catalog.batch_get(&course_ids).await {
            Ok(courses) => courses,
            Err(e) => return store_failure("Error retrieving student progress data", e),
        }
    };
    let rows: Vec<StudentProgressRow> = records
        .into_iter()
        .map(|record| {
            let course_name = courses
                .iter()
                .find(|c| c.course_id == record.course_id)
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "Unknown Course".to_string());
            StudentProgressRow {
                user_id: record.user_id,
                course_id: record.course_id,
                course_name,
                enrollment_date: record.enrollment_date,
                overall_progress: record.overall_progress,
                status: record.status,
                last_accessed: record.last_accessed_timestamp,
            }
        })
        .collect();
    ok_response("Student progress data retrieved successfully", rows)
}
