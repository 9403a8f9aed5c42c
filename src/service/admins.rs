use argon2::{password_hash::PasswordHash, Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    entities::admin_users::AdminUser,
    error::AppError,
    repo::admin_users::AdminUsersRepo,
    service::session::SessionService,
};

#[derive(Debug)]
pub struct LoginOutput {
    pub admin: AdminUser,
    pub session_token: String,
}

#[async_trait]
pub trait AdminsService: Send + Sync {
    /// The first account becomes the main admin and is verified on the spot.
    async fn register(&self, email: &str, password: &str) -> Result<AdminUser, AppError>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutput, AppError>;
    async fn logout(&self, token: &str) -> Result<(), AppError>;
    /// Resolves a session token to a verified admin.
    async fn authenticate(&self, token: &str) -> Result<AdminUser, AppError>;
    async fn list(&self, actor: &AdminUser) -> Result<Vec<AdminUser>, AppError>;
    async fn approve(&self, actor: &AdminUser, id: Uuid) -> Result<AdminUser, AppError>;
    async fn delete(&self, actor: &AdminUser, id: Uuid) -> Result<(), AppError>;
}

pub struct AdminsServiceImpl {
    admins_repo: Arc<dyn AdminUsersRepo>,
    sessions: Arc<dyn SessionService>,
}

impl AdminsServiceImpl {
    pub fn new(admins_repo: Arc<dyn AdminUsersRepo>, sessions: Arc<dyn SessionService>) -> Self {
        Self {
            admins_repo,
            sessions,
        }
    }

    fn normalize_email(email: &str) -> Result<String, AppError> {
        let value = email.trim().to_lowercase();
        if value.is_empty() || !value.contains('@') {
            return Err(AppError::validation("invalid_email", "invalid email"));
        }
        Ok(value)
    }

    fn validate_password(password: &str) -> Result<(), AppError> {
        if password.len() < 8 {
            return Err(AppError::validation(
                "invalid_password",
                "password must be at least 8 characters",
            ));
        }
        let mut has_upper = false;
        let mut has_lower = false;
        let mut has_digit = false;
        let mut has_special = false;
        for ch in password.chars() {
            if ch.is_ascii_uppercase() {
                has_upper = true;
            } else if ch.is_ascii_lowercase() {
                has_lower = true;
            } else if ch.is_ascii_digit() {
                has_digit = true;
            } else {
                has_special = true;
            }
        }
        if !(has_upper && has_lower && has_digit && has_special) {
            return Err(AppError::validation(
                "invalid_password",
                "password must include upper, lower, digit, and special character",
            ));
        }
        Ok(())
    }

    fn hash_password(password: &str) -> Result<String, AppError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = argon2::password_hash::SaltString::encode_b64(&salt)
            .map_err(|err| AppError::internal("password_hash_failed", err.to_string()))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AppError::internal("password_hash_failed", err.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn verify_password(hash: &str, password: &str) -> Result<(), AppError> {
        let invalid = || AppError::unauthorized("invalid_credentials", "invalid credentials");
        let parsed = PasswordHash::new(hash).map_err(|_| invalid())?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| invalid())
    }

    fn require_main(actor: &AdminUser) -> Result<(), AppError> {
        if !actor.is_main_admin {
            return Err(AppError::forbidden(
                "main_admin_required",
                "only the main admin can do this",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminsService for AdminsServiceImpl {
    async fn register(&self, email: &str, password: &str) -> Result<AdminUser, AppError> {
        let email = Self::normalize_email(email)?;
        Self::validate_password(password)?;
        let password_hash = Self::hash_password(password)?;

        // The emptiness check and the insert share one lock, so two racing
        // registrations cannot both become main admin.
        let admin = self
            .admins_repo
            .insert_with(Box::new(move |existing: Vec<AdminUser>| {
                if existing.iter().any(|admin| admin.email == email) {
                    return Err(AppError::conflict("email_taken", "email already registered"));
                }
                let is_first = existing.is_empty();
                Ok(AdminUser {
                    id: Uuid::new_v4(),
                    email,
                    password_hash,
                    is_main_admin: is_first,
                    is_verified: is_first,
                    created_at: Utc::now(),
                })
            }))
            .await?;

        info!(
            admin = %admin.id,
            main = admin.is_main_admin,
            "admin registered"
        );
        Ok(admin)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutput, AppError> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::unauthorized("invalid_credentials", "invalid credentials"));
        }

        let Some(admin) = self.admins_repo.find_by_email(&normalized).await? else {
            return Err(AppError::unauthorized("invalid_credentials", "invalid credentials"));
        };
        Self::verify_password(&admin.password_hash, password)?;

        if !admin.is_verified {
            return Err(AppError::forbidden(
                "admin_not_verified",
                "admin account awaits approval",
            ));
        }

        let session_token = self.sessions.create(admin.id).await?;
        Ok(LoginOutput {
            admin,
            session_token,
        })
    }

    async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    async fn authenticate(&self, token: &str) -> Result<AdminUser, AppError> {
        let Some(session) = self.sessions.get(token).await? else {
            return Err(AppError::unauthorized("invalid_session", "invalid session"));
        };
        let Some(admin) = self.admins_repo.find_by_id(session.admin_id).await? else {
            return Err(AppError::unauthorized("invalid_session", "admin not found"));
        };
        if !admin.is_verified {
            return Err(AppError::forbidden(
                "admin_not_verified",
                "admin account awaits approval",
            ));
        }
        Ok(admin)
    }

    async fn list(&self, _actor: &AdminUser) -> Result<Vec<AdminUser>, AppError> {
        let mut all = self.admins_repo.list().await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn approve(&self, actor: &AdminUser, id: Uuid) -> Result<AdminUser, AppError> {
        Self::require_main(actor)?;
        let approved = self
            .admins_repo
            .update(
                id,
                Box::new(|mut admin: AdminUser| {
                    admin.is_verified = true;
                    Ok(admin)
                }),
            )
            .await?;
        info!(admin = %approved.id, approved_by = %actor.id, "admin approved");
        Ok(approved)
    }

    async fn delete(&self, actor: &AdminUser, id: Uuid) -> Result<(), AppError> {
        Self::require_main(actor)?;
        let Some(target) = self.admins_repo.find_by_id(id).await? else {
            return Err(AppError::not_found("admin_not_found", "admin not found"));
        };
        if target.is_main_admin {
            return Err(AppError::forbidden(
                "cannot_delete_main_admin",
                "the main admin cannot be deleted",
            ));
        }
        self.admins_repo.delete(id).await?;
        info!(admin = %id, deleted_by = %actor.id, "admin deleted");
        Ok(())
    }
}
