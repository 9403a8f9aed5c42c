use async_trait::async_trait;
use std::{collections::BTreeMap, path::Path};
use uuid::Uuid;

use crate::{
    entities::admin_users::AdminUser,
    error::AppError,
    repo::Mutation,
    store::{JsonStore, LockRegistry, StoreError},
};

#[async_trait]
pub trait AdminUsersRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError>;
    async fn list(&self) -> Result<Vec<AdminUser>, StoreError>;
    /// `build` receives every existing admin and returns the record to insert.
    async fn insert_with(
        &self,
        build: Mutation<Vec<AdminUser>, AdminUser>,
    ) -> Result<AdminUser, AppError>;
    async fn update(
        &self,
        id: Uuid,
        mutation: Mutation<AdminUser, AdminUser>,
    ) -> Result<AdminUser, AppError>;
    async fn delete(&self, id: Uuid) -> Result<Option<AdminUser>, StoreError>;
}

pub struct JsonAdminUsersRepo {
    store: JsonStore<BTreeMap<Uuid, AdminUser>>,
}

impl JsonAdminUsersRepo {
    pub fn new(registry: &LockRegistry, data_dir: &Path) -> Self {
        Self {
            store: JsonStore::new(registry, data_dir.join("admins.json")),
        }
    }
}

#[async_trait]
impl AdminUsersRepo for JsonAdminUsersRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.store.read().await?.remove(&id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError> {
        Ok(self
            .store
            .read()
            .await?
            .into_values()
            .find(|admin| admin.email.eq_ignore_ascii_case(email)))
    }

    async fn list(&self) -> Result<Vec<AdminUser>, StoreError> {
        Ok(self.store.read().await?.into_values().collect())
    }

    async fn insert_with(
        &self,
        build: Mutation<Vec<AdminUser>, AdminUser>,
    ) -> Result<AdminUser, AppError> {
        self.store
            .update(|all| {
                let admin = build(all.values().cloned().collect())?;
                if all.contains_key(&admin.id) {
                    return Err(AppError::conflict("admin_exists", "admin id already exists"));
                }
                all.insert(admin.id, admin.clone());
                Ok(admin)
            })
            .await
    }

    async fn update(
        &self,
        id: Uuid,
        mutation: Mutation<AdminUser, AdminUser>,
    ) -> Result<AdminUser, AppError> {
        self.store
            .update(|all| {
                let Some(current) = all.get(&id).cloned() else {
                    return Err(AppError::not_found("admin_not_found", "admin not found"));
                };
                let mut next = mutation(current)?;
                next.id = id;
                all.insert(id, next.clone());
                Ok(next)
            })
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<AdminUser>, StoreError> {
        self.store.update(|all| Ok(all.remove(&id))).await
    }
}
