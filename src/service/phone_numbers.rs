use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    entities::phone_numbers::PhoneNumber, error::AppError, repo::phone_numbers::PhoneNumbersRepo,
};

#[derive(Clone, Debug, Default)]
pub struct CreatePhoneNumberInput {
    pub phone_number: String,
    pub region: String,
    pub state: String,
    pub benefits: Vec<String>,
    pub disadvantages: Vec<String>,
    pub bonuses: Vec<String>,
}

#[async_trait]
pub trait PhoneNumbersService: Send + Sync {
    async fn list_available(&self) -> Result<Vec<PhoneNumber>, AppError>;
    async fn list_all(&self) -> Result<Vec<PhoneNumber>, AppError>;
    async fn create(&self, input: CreatePhoneNumberInput) -> Result<PhoneNumber, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

pub struct PhoneNumbersServiceImpl {
    repo: Arc<dyn PhoneNumbersRepo>,
}

impl PhoneNumbersServiceImpl {
    pub fn new(repo: Arc<dyn PhoneNumbersRepo>) -> Self {
        Self { repo }
    }

    fn clean_list(values: Vec<String>) -> Vec<String> {
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    async fn sorted(&self) -> Result<Vec<PhoneNumber>, AppError> {
        let mut all = self.repo.list().await?;
        all.sort_by(|a, b| {
            (a.region.as_str(), a.state.as_str(), a.phone_number.as_str()).cmp(&(
                b.region.as_str(),
                b.state.as_str(),
                b.phone_number.as_str(),
            ))
        });
        Ok(all)
    }
}

#[async_trait]
impl PhoneNumbersService for PhoneNumbersServiceImpl {
    async fn list_available(&self) -> Result<Vec<PhoneNumber>, AppError> {
        let mut all = self.sorted().await?;
        all.retain(|number| number.is_available);
        Ok(all)
    }

    async fn list_all(&self) -> Result<Vec<PhoneNumber>, AppError> {
        self.sorted().await
    }

    async fn create(&self, input: CreatePhoneNumberInput) -> Result<PhoneNumber, AppError> {
        let phone_number = input.phone_number.trim().to_string();
        if phone_number.is_empty() {
            return Err(AppError::validation(
                "invalid_phone_number",
                "phone number is required",
            ));
        }

        let number = PhoneNumber {
            id: Uuid::new_v4().to_string(),
            phone_number,
            is_available: true,
            region: input.region.trim().to_string(),
            state: input.state.trim().to_string(),
            benefits: Self::clean_list(input.benefits),
            disadvantages: Self::clean_list(input.disadvantages),
            bonuses: Self::clean_list(input.bonuses),
            assigned_to: None,
        };
        self.repo.put(number.clone()).await?;
        info!(phone_number_id = %number.id, "phone number added to pool");
        Ok(number)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        if let Some(removed) = self.repo.delete(id).await? {
            info!(phone_number_id = %removed.id, "phone number removed from pool");
        }
        Ok(())
    }
}
