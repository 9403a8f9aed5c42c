use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    entities::phone_numbers::PhoneNumber,
    error::{AppError, ErrorResponse},
    handler::session::CurrentAdmin,
    service::phone_numbers::CreatePhoneNumberInput,
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneNumber {
    pub phone_number: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub disadvantages: Vec<String>,
    #[serde(default)]
    pub bonuses: Vec<String>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/phone-numbers", get(list_available))
        .route("/api/v1/admin/phone-numbers", get(list_all).post(create_phone_number))
        .route("/api/v1/admin/phone-numbers/:id", delete(delete_phone_number))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/phone-numbers",
    responses(
        (status = 200, description = "Numbers open for claiming", body = [PhoneNumber])
    ),
    tag = "phone-numbers"
)]
pub async fn list_available(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PhoneNumber>>, AppError> {
    Ok(Json(state.phone_numbers().list_available().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/phone-numbers",
    responses(
        (status = 200, description = "Whole pool", body = [PhoneNumber]),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "phone-numbers"
)]
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<PhoneNumber>>, AppError> {
    Ok(Json(state.phone_numbers().list_all().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/phone-numbers",
    request_body = CreatePhoneNumber,
    responses(
        (status = 201, description = "Added", body = PhoneNumber),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "phone-numbers"
)]
pub async fn create_phone_number(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Json(payload): Json<CreatePhoneNumber>,
) -> Result<(StatusCode, Json<PhoneNumber>), AppError> {
    let input = CreatePhoneNumberInput {
        phone_number: payload.phone_number,
        region: payload.region,
        state: payload.state,
        benefits: payload.benefits,
        disadvantages: payload.disadvantages,
        bonuses: payload.bonuses,
    };
    let number = state.phone_numbers().create(input).await?;
    Ok((StatusCode::CREATED, Json(number)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/phone-numbers/{id}",
    params(
        ("id" = String, Path, description = "Phone number id")
    ),
    responses(
        (status = 204, description = "Deleted, or already absent"),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "phone-numbers"
)]
pub async fn delete_phone_number(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.phone_numbers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
