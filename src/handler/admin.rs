use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use cookie::time::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::admin_users::AdminUser,
    error::{AppError, ErrorResponse},
    handler::session::{CurrentAdmin, SESSION_COOKIE},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub id: Uuid,
    pub email: String,
    pub is_main_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AdminUser> for AdminResponse {
    fn from(admin: AdminUser) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            is_main_admin: admin.is_main_admin,
            is_verified: admin.is_verified,
            created_at: admin.created_at,
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/admin/auth/register", post(register))
        .route("/api/v1/admin/auth/login", post(login))
        .route("/api/v1/admin/auth/logout", post(logout))
        .route("/api/v1/admin/admins", get(list_admins))
        .route("/api/v1/admin/admins/:id/approve", post(approve_admin))
        .route("/api/v1/admin/admins/:id", delete(delete_admin))
        .with_state(state)
}

fn session_cookie(state: &AppState, value: String, max_age_seconds: i64) -> Cookie<'static> {
    let config = state.config().values();
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_seconds));
    if config.cookie_secure {
        cookie.set_secure(true);
    }
    if let Some(domain) = &config.cookie_domain {
        cookie.set_domain(domain.to_string());
    }
    cookie
}

fn parse_admin_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::validation("invalid_admin_id", "invalid admin id"))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Created", body = AdminResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AdminResponse>), AppError> {
    let admin = state
        .admins()
        .register(&payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(admin.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AdminResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Admin not yet approved", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let output = state
        .admins()
        .login(&payload.email, &payload.password)
        .await?;

    let ttl = state.config().values().session_ttl_seconds;
    let cookie = session_cookie(
        &state,
        output.session_token,
        i64::try_from(ttl).unwrap_or(i64::MAX),
    );
    let jar = CookieJar::new().add(cookie);
    let body: AdminResponse = output.admin.into();
    Ok((StatusCode::OK, jar, Json(body)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/auth/logout",
    responses(
        (status = 204, description = "Logged out"),
        (status = 500, description = "Session delete failed", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    state.admins().logout(cookie.value()).await?;

    let cleared = session_cookie(&state, String::new(), 0);
    let jar = jar.add(cleared);
    Ok((StatusCode::NO_CONTENT, jar).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/admins",
    responses(
        (status = 200, description = "All admins, oldest first", body = [AdminResponse]),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
) -> Result<Json<Vec<AdminResponse>>, AppError> {
    let admins = state.admins().list(&actor).await?;
    Ok(Json(admins.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/admins/{id}/approve",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    responses(
        (status = 200, description = "Approved", body = AdminResponse),
        (status = 403, description = "Main admin required", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn approve_admin(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Path(id): Path<String>,
) -> Result<Json<AdminResponse>, AppError> {
    let id = parse_admin_id(&id)?;
    let admin = state.admins().approve(&actor, id).await?;
    Ok(Json(admin.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/admins/{id}",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Main admin required", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_admin(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_admin_id(&id)?;
    state.admins().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
