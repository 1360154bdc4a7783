pub mod assignment;
pub mod progress;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use serde_json::json;

use crate::aggregator::ProgressAggregator;
use crate::store::{AssignmentStore, CourseCatalog, ProgressStore};

/// Shared handler state: the aggregator plus direct handles on the stores
/// for the plain read endpoints.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: ProgressAggregator,
    pub progress: Arc<dyn ProgressStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub catalog: Arc<dyn CourseCatalog>,
}

impl AppState {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        assignments: Arc<dyn AssignmentStore>,
        catalog: Arc<dyn CourseCatalog>,
    ) -> Self {
        let aggregator = ProgressAggregator::new(progress.clone(), assignments.clone())
            .with_catalog(catalog.clone());
        Self {
            aggregator,
            progress,
            assignments,
            catalog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Student,
    Teacher,
    Manager,
    Admin,
}

impl UserRole {
    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "manager" => UserRole::Manager,
            "admin" => UserRole::Admin,
            "teacher" => UserRole::Teacher,
            _ => UserRole::Student,
        }
    }
}

/// Caller identity, injected by the upstream identity layer as `X-User-Id`
/// and `X-User-Type` headers. The server trusts these as given; verifying
/// the token itself is the identity provider's job.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: UserRole,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty());
        let Some(user_id) = user_id else {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "No authentication token provided",
            ));
        };
        let role = parts
            .headers
            .get("x-user-type")
            .and_then(|v| v.to_str().ok())
            .map(UserRole::from)
            .unwrap_or(UserRole::Student);
        Ok(AuthUser {
            user_id: user_id.to_string(),
            role,
        })
    }
}

/// Success envelope, `{ message, data }`.
pub fn ok_response<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "message": message, "data": data })),
    )
        .into_response()
}

/// Failure envelope without a cause, `{ message }`.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Store failures get logged and surfaced as a retryable server error with
/// the cause in the `error` field.
pub fn store_failure(message: &str, error: impl std::fmt::Display) -> Response {
    tracing::error!("{message}: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message, "error": error.to_string() })),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "course-server" }))
        .route(
            "/users/course-progress/all-progress",
            get(progress::get_all_students_progress),
        )
        .route(
            "/users/course-progress/{user_id}/enrolled-courses",
            get(progress::get_user_enrolled_courses),
        )
        .route(
            "/users/course-progress/{user_id}/courses/{course_id}",
            get(progress::get_user_course_progress).put(progress::update_user_course_progress),
        )
        .route(
            "/assign-course",
            get(assignment::list_assignments).post(assignment::create_assignment),
        )
        .route(
            "/assign-course/{user_id}/assigned",
            get(assignment::get_user_assigned_courses),
        )
        .route(
            "/assign-course/{user_id}/courses/{course_id}",
            get(assignment::get_user_assignment),
        )
        .route(
            "/assign-course/manager/{manager_id}",
            get(assignment::get_manager_assigned_courses),
        )
        .with_state(state)
}
