use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::submissions::Submission,
    error::{AppError, ErrorResponse},
    handler::session::CurrentAdmin,
    service::submissions::{ReviewStepInput, SubmitStepInput},
    state::AppState,
};

/// Partial step data. Every field besides `id` is optional; each one present
/// is recorded and its step goes back to `pending`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStepRequest {
    pub id: Option<String>,
    pub tiktok_username: Option<String>,
    pub verification_code: Option<String>,
    /// Free-form number, ignored when `phoneNumberId` is given.
    pub phone_number: Option<String>,
    /// Id of a number from the pool; claimed for this submission.
    pub phone_number_id: Option<String>,
    pub final_code: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStepRequest {
    /// `tiktokUsername`, `verificationCode`, `phoneNumber` or `finalCode`;
    /// the `...Status` key form is accepted too.
    pub step: String,
    /// `pending`, `approved` or `rejected`.
    pub status: String,
    pub rejection_reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct WatchQuery {
    /// Last version the caller has seen.
    pub since: Option<u64>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/submissions", post(submit_step).get(list_submissions))
        .route("/api/v1/submissions/:id", get(get_submission).delete(delete_submission))
        .route("/api/v1/submissions/:id/watch", get(watch_submission))
        .route("/api/v1/submissions/:id/status", patch(review_step))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/submissions",
    request_body = SubmitStepRequest,
    responses(
        (status = 200, description = "Submission after the update", body = Submission),
        (status = 400, description = "Missing id or empty value", body = ErrorResponse),
        (status = 409, description = "Phone number taken", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn submit_step(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitStepRequest>,
) -> Result<Json<Submission>, AppError> {
    let input = SubmitStepInput {
        id: payload.id,
        tiktok_username: payload.tiktok_username,
        verification_code: payload.verification_code,
        phone_number: payload.phone_number,
        phone_number_id: payload.phone_number_id,
        final_code: payload.final_code,
    };

    let submission = state.submissions().submit(input).await?;
    Ok(Json(submission))
}

#[utoipa::path(
    get,
    path = "/api/v1/submissions/{id}",
    params(
        ("id" = String, Path, description = "Submission id")
    ),
    responses(
        (status = 200, description = "Submission", body = Submission),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Submission>, AppError> {
    Ok(Json(state.submissions().get(&id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/submissions/{id}/watch",
    params(
        ("id" = String, Path, description = "Submission id"),
        WatchQuery
    ),
    responses(
        (
            status = 200,
            description = "Submission once its version passes `since`, or at timeout",
            body = Submission
        ),
        (status = 404, description = "Not found or deleted while waiting", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn watch_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WatchQuery>,
) -> Result<Json<Submission>, AppError> {
    let timeout = Duration::from_secs(state.config().values().watch_timeout_seconds);
    let submission = state
        .submissions()
        .watch(&id, query.since.unwrap_or(0), timeout)
        .await?;
    Ok(Json(submission))
}

#[utoipa::path(
    get,
    path = "/api/v1/submissions",
    responses(
        (status = 200, description = "All submissions, newest first", body = [Submission]),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<Submission>>, AppError> {
    Ok(Json(state.submissions().list().await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/submissions/{id}/status",
    request_body = ReviewStepRequest,
    params(
        ("id" = String, Path, description = "Submission id")
    ),
    responses(
        (status = 200, description = "Updated", body = Submission),
        (status = 400, description = "Unknown step or status", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn review_step(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Path(id): Path<String>,
    Json(payload): Json<ReviewStepRequest>,
) -> Result<Json<Submission>, AppError> {
    let input = ReviewStepInput {
        id,
        step: payload.step,
        status: payload.status,
        rejection_reason: payload.rejection_reason,
    };
    Ok(Json(state.submissions().review(input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/submissions/{id}",
    params(
        ("id" = String, Path, description = "Submission id")
    ),
    responses(
        (status = 204, description = "Deleted, or already absent"),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "submissions"
)]
pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.submissions().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
