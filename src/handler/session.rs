use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::{
    entities::admin_users::AdminUser,
    error::{AppError, ErrorResponse},
    handler::admin::AdminResponse,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "sid";

/// A verified admin resolved from the `sid` cookie.
pub struct CurrentAdmin(pub AdminUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Err(AppError::unauthorized("missing_session", "missing session"));
        };
        let admin = state.admins().authenticate(cookie.value()).await?;
        Ok(CurrentAdmin(admin))
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/admin/me", get(me))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/me",
    responses(
        (status = 200, description = "Current admin", body = AdminResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn me(CurrentAdmin(admin): CurrentAdmin) -> Json<AdminResponse> {
    Json(admin.into())
}
