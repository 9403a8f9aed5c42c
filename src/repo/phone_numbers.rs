use async_trait::async_trait;
use std::{collections::BTreeMap, path::Path};

use crate::{
    entities::phone_numbers::PhoneNumber,
    error::AppError,
    store::{JsonStore, LockRegistry, StoreError},
};

/// Outcome of a claim. `fresh` is false when the submission already held the number.
#[derive(Clone, Debug, PartialEq)]
pub struct Claim {
    pub number: PhoneNumber,
    pub fresh: bool,
}

#[async_trait]
pub trait PhoneNumbersRepo: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PhoneNumber>, StoreError>;
    async fn list(&self) -> Result<Vec<PhoneNumber>, StoreError>;
    async fn put(&self, number: PhoneNumber) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<Option<PhoneNumber>, StoreError>;
    /// Marks the number unavailable for `holder` in one locked step.
    async fn claim_if_available(&self, id: &str, holder: &str) -> Result<Claim, AppError>;
    /// Frees `id` if `holder` still holds it.
    async fn release(&self, id: &str, holder: &str) -> Result<bool, StoreError>;
    /// Frees every number held by `holder` except `keep`; returns the freed ids.
    async fn release_all_except(
        &self,
        holder: &str,
        keep: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;
}

pub struct JsonPhoneNumbersRepo {
    store: JsonStore<BTreeMap<String, PhoneNumber>>,
}

impl JsonPhoneNumbersRepo {
    pub fn new(registry: &LockRegistry, data_dir: &Path) -> Self {
        Self {
            store: JsonStore::new(registry, data_dir.join("phone_numbers.json")),
        }
    }
}

fn free(number: &mut PhoneNumber) {
    number.is_available = true;
    number.assigned_to = None;
}

#[async_trait]
impl PhoneNumbersRepo for JsonPhoneNumbersRepo {
    async fn get(&self, id: &str) -> Result<Option<PhoneNumber>, StoreError> {
        Ok(self.store.read().await?.remove(id))
    }

    async fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        Ok(self.store.read().await?.into_values().collect())
    }

    async fn put(&self, number: PhoneNumber) -> Result<(), StoreError> {
        self.store
            .update(|all| {
                all.insert(number.id.clone(), number);
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<Option<PhoneNumber>, StoreError> {
        self.store.update(|all| Ok(all.remove(id))).await
    }

    async fn claim_if_available(&self, id: &str, holder: &str) -> Result<Claim, AppError> {
        self.store
            .update(|all| {
                let Some(number) = all.get_mut(id) else {
                    return Err(AppError::not_found(
                        "phone_number_not_found",
                        format!("phone number {} not found", id),
                    ));
                };
                if number.is_held_by(holder) {
                    return Ok(Claim {
                        number: number.clone(),
                        fresh: false,
                    });
                }
                if !number.is_available {
                    return Err(AppError::conflict(
                        "phone_number_unavailable",
                        "phone number is no longer available",
                    ));
                }
                number.is_available = false;
                number.assigned_to = Some(holder.to_string());
                Ok(Claim {
                    number: number.clone(),
                    fresh: true,
                })
            })
            .await
    }

    async fn release(&self, id: &str, holder: &str) -> Result<bool, StoreError> {
        self.store
            .update(|all| {
                Ok(match all.get_mut(id) {
                    Some(number) if number.is_held_by(holder) => {
                        free(number);
                        true
                    }
                    _ => false,
                })
            })
            .await
    }

    async fn release_all_except(
        &self,
        holder: &str,
        keep: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.store
            .update(|all| {
                let mut freed = Vec::new();
                for number in all.values_mut() {
                    if number.is_held_by(holder) && Some(number.id.as_str()) != keep {
                        free(number);
                        freed.push(number.id.clone());
                    }
                }
                Ok(freed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn number(id: &str) -> PhoneNumber {
        PhoneNumber {
            id: id.to_string(),
            phone_number: format!("+1555{}", id),
            is_available: true,
            region: "US".to_string(),
            state: "CA".to_string(),
            benefits: vec!["Local presence".to_string()],
            disadvantages: Vec::new(),
            bonuses: Vec::new(),
            assigned_to: None,
        }
    }

    #[tokio::test]
    async fn claim_marks_number_unavailable() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPhoneNumbersRepo::new(&LockRegistry::new(), dir.path());
        repo.put(number("0100")).await.unwrap();

        let claim = repo.claim_if_available("0100", "alice").await.unwrap();
        assert!(claim.fresh);
        assert!(!claim.number.is_available);

        let again = repo.claim_if_available("0100", "alice").await.unwrap();
        assert!(!again.fresh);

        let err = repo.claim_if_available("0100", "bob").await.unwrap_err();
        assert_eq!(err.code(), "phone_number_unavailable");
    }

    #[tokio::test]
    async fn claiming_unknown_number_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPhoneNumbersRepo::new(&LockRegistry::new(), dir.path());

        let err = repo.claim_if_available("nope", "alice").await.unwrap_err();
        assert_eq!(err.code(), "phone_number_not_found");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_claims_have_exactly_one_winner() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(JsonPhoneNumbersRepo::new(&LockRegistry::new(), dir.path()));
        repo.put(number("0100")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.claim_if_available("0100", &format!("user{}", i)).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(claim) => {
                    assert!(claim.fresh);
                    winners += 1;
                }
                Err(err) => assert_eq!(err.code(), "phone_number_unavailable"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn release_only_frees_for_the_holder() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPhoneNumbersRepo::new(&LockRegistry::new(), dir.path());
        repo.put(number("0100")).await.unwrap();
        repo.claim_if_available("0100", "alice").await.unwrap();

        assert!(!repo.release("0100", "bob").await.unwrap());
        assert!(repo.release("0100", "alice").await.unwrap());
        let stored = repo.get("0100").await.unwrap().unwrap();
        assert!(stored.is_available);
        assert_eq!(stored.assigned_to, None);
    }

    #[tokio::test]
    async fn release_all_except_keeps_current_claim() {
        let dir = TempDir::new().unwrap();
        let repo = JsonPhoneNumbersRepo::new(&LockRegistry::new(), dir.path());
        repo.put(number("0100")).await.unwrap();
        repo.put(number("0200")).await.unwrap();
        repo.claim_if_available("0100", "alice").await.unwrap();
        repo.claim_if_available("0200", "alice").await.unwrap();

        let freed = repo.release_all_except("alice", Some("0200")).await.unwrap();
        assert_eq!(freed, vec!["0100".to_string()]);
        assert!(repo.get("0100").await.unwrap().unwrap().is_available);
        assert!(!repo.get("0200").await.unwrap().unwrap().is_available);
    }
}
