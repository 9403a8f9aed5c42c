use async_trait::async_trait;
use std::{collections::BTreeMap, path::Path};

use crate::{
    entities::submissions::Submission,
    error::AppError,
    repo::Mutation,
    store::{JsonStore, LockRegistry, StoreError},
};

#[async_trait]
pub trait SubmissionsRepo: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Submission>, StoreError>;
    async fn list(&self) -> Result<Vec<Submission>, StoreError>;
    /// Runs `mutation` on the current record (or `None`) and stores what it returns.
    async fn update(
        &self,
        id: &str,
        mutation: Mutation<Option<Submission>, Submission>,
    ) -> Result<Submission, AppError>;
    async fn delete(&self, id: &str) -> Result<Option<Submission>, StoreError>;
}

pub struct JsonSubmissionsRepo {
    store: JsonStore<BTreeMap<String, Submission>>,
}

impl JsonSubmissionsRepo {
    pub fn new(registry: &LockRegistry, data_dir: &Path) -> Self {
        Self {
            store: JsonStore::new(registry, data_dir.join("submissions.json")),
        }
    }
}

#[async_trait]
impl SubmissionsRepo for JsonSubmissionsRepo {
    async fn get(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        let mut all = self.store.read().await?;
        Ok(all.remove(id))
    }

    async fn list(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.store.read().await?.into_values().collect())
    }

    async fn update(
        &self,
        id: &str,
        mutation: Mutation<Option<Submission>, Submission>,
    ) -> Result<Submission, AppError> {
        self.store
            .update(|all| {
                let current = all.get(id).cloned();
                let next = mutation(current)?;
                if next.id != id {
                    return Err(AppError::validation(
                        "id_mismatch",
                        "submission id cannot change",
                    ));
                }
                all.insert(id.to_string(), next.clone());
                Ok(next)
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        self.store.update(|all| Ok(all.remove(id))).await
    }
}
