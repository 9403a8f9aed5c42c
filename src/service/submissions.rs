use async_trait::async_trait;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast::error::RecvError, oneshot},
    time::Instant,
};
use tracing::{info, warn};

use crate::{
    entities::submissions::{Step, StepData, StepStatus, Submission},
    error::AppError,
    repo::{phone_numbers::PhoneNumbersRepo, submissions::SubmissionsRepo},
    service::events::{SubmissionEvent, SubmissionEvents},
};

#[derive(Clone, Debug, Default)]
pub struct SubmitStepInput {
    pub id: Option<String>,
    pub tiktok_username: Option<String>,
    pub verification_code: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_id: Option<String>,
    pub final_code: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ReviewStepInput {
    pub id: String,
    pub step: String,
    pub status: String,
    pub rejection_reason: Option<String>,
}

#[async_trait]
pub trait SubmissionsService: Send + Sync {
    /// Creates the submission if needed and records every step present in `input`.
    async fn submit(&self, input: SubmitStepInput) -> Result<Submission, AppError>;
    async fn get(&self, id: &str) -> Result<Submission, AppError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Submission>, AppError>;
    async fn review(&self, input: ReviewStepInput) -> Result<Submission, AppError>;
    /// Hard delete. Deleting an unknown id succeeds.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    /// Waits until the record's version exceeds `since` or `timeout` passes,
    /// then returns the record as it stands.
    async fn watch(
        &self,
        id: &str,
        since: u64,
        timeout: Duration,
    ) -> Result<Submission, AppError>;
}

pub struct SubmissionsServiceImpl {
    submissions: Arc<dyn SubmissionsRepo>,
    phone_numbers: Arc<dyn PhoneNumbersRepo>,
    events: Arc<SubmissionEvents>,
}

impl SubmissionsServiceImpl {
    pub fn new(
        submissions: Arc<dyn SubmissionsRepo>,
        phone_numbers: Arc<dyn PhoneNumbersRepo>,
        events: Arc<SubmissionEvents>,
    ) -> Self {
        Self {
            submissions,
            phone_numbers,
            events,
        }
    }

    fn normalize_id(id: Option<&str>) -> Result<String, AppError> {
        let value = id.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(AppError::validation("missing_id", "submission id is required"));
        }
        Ok(value.to_string())
    }

    fn field(name: &str, value: Option<String>) -> Result<Option<String>, AppError> {
        match value {
            None => Ok(None),
            Some(value) => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(AppError::validation(
                        "empty_value",
                        format!("{} must not be empty", name),
                    ));
                }
                Ok(Some(value.to_string()))
            }
        }
    }

    fn not_found(id: &str) -> AppError {
        AppError::not_found(
            "submission_not_found",
            format!("submission {} not found", id),
        )
    }
}

#[async_trait]
impl SubmissionsService for SubmissionsServiceImpl {
    async fn submit(&self, input: SubmitStepInput) -> Result<Submission, AppError> {
        let id = Self::normalize_id(input.id.as_deref())?;

        let mut steps = Vec::new();
        if let Some(username) = Self::field("tiktokUsername", input.tiktok_username)? {
            steps.push(StepData::TiktokUsername(username));
        }
        if let Some(code) = Self::field("verificationCode", input.verification_code)? {
            steps.push(StepData::VerificationCode(code));
        }
        let raw_number = Self::field("phoneNumber", input.phone_number)?;
        let number_id = Self::field("phoneNumberId", input.phone_number_id)?;
        let final_code = Self::field("finalCode", input.final_code)?;

        // A pooled number is claimed before the submission is touched.
        let claim = match &number_id {
            Some(number_id) => Some(self.phone_numbers.claim_if_available(number_id, &id).await?),
            None => None,
        };
        let phone_step = match (&claim, raw_number) {
            (Some(claim), _) => Some(StepData::PhoneNumber {
                number: claim.number.phone_number.clone(),
                number_id: Some(claim.number.id.clone()),
            }),
            (None, Some(number)) => Some(StepData::PhoneNumber {
                number,
                number_id: None,
            }),
            (None, None) => None,
        };
        steps.extend(phone_step);
        if let Some(code) = final_code {
            steps.push(StepData::FinalCode(code));
        }

        let now = Utc::now();
        let record_id = id.clone();
        // The pooled number held before this write, read under the store lock.
        let (previous_tx, previous_rx) = oneshot::channel();
        let result = self
            .submissions
            .update(
                &id,
                Box::new(move |current: Option<Submission>| {
                    let mut submission =
                        current.unwrap_or_else(|| Submission::new(record_id, now));
                    let _ = previous_tx.send(submission.phone_number_id.clone());
                    for step in steps {
                        submission.submit(step, now);
                    }
                    Ok(submission)
                }),
            )
            .await;

        let submission = match result {
            Ok(submission) => submission,
            Err(err) => {
                if let Some(claim) = claim.as_ref().filter(|claim| claim.fresh) {
                    if let Err(release_err) =
                        self.phone_numbers.release(&claim.number.id, &id).await
                    {
                        warn!(
                            submission = %id,
                            phone_number = %claim.number.id,
                            error = %release_err,
                            "failed to release phone number after aborted submission"
                        );
                    }
                }
                return Err(err);
            }
        };

        self.events.publish(SubmissionEvent::Updated {
            id: submission.id.clone(),
            version: submission.version,
        });

        let previous = previous_rx.await.ok().flatten();
        if let Some(previous) = previous.filter(|previous| {
            submission.phone_number_id.as_deref() != Some(previous.as_str())
        }) {
            match self.phone_numbers.release(&previous, &id).await {
                Ok(true) => info!(
                    submission = %id,
                    phone_number = %previous,
                    "released previous phone number"
                ),
                Ok(false) => {}
                Err(err) => warn!(
                    submission = %id,
                    phone_number = %previous,
                    error = %err,
                    "failed to release previous phone number"
                ),
            }
        }

        Ok(submission)
    }

    async fn get(&self, id: &str) -> Result<Submission, AppError> {
        self.submissions
            .get(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn list(&self) -> Result<Vec<Submission>, AppError> {
        let mut all = self.submissions.list().await?;
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all)
    }

    async fn review(&self, input: ReviewStepInput) -> Result<Submission, AppError> {
        let step = Step::parse(&input.step).ok_or_else(|| {
            AppError::validation("invalid_step", format!("unknown step '{}'", input.step))
        })?;
        let status = StepStatus::parse(&input.status).ok_or_else(|| {
            AppError::validation(
                "invalid_status",
                format!("unknown status '{}'", input.status),
            )
        })?;
        let id = Self::normalize_id(Some(&input.id))?;

        let now = Utc::now();
        let reason = input.rejection_reason;
        let missing = Self::not_found(&id);
        let submission = self
            .submissions
            .update(
                &id,
                Box::new(move |current: Option<Submission>| {
                    let Some(mut submission) = current else {
                        return Err(missing);
                    };
                    submission.review(step, status, reason, now);
                    Ok(submission)
                }),
            )
            .await?;

        info!(
            submission = %submission.id,
            step = step.as_str(),
            status = ?status,
            verified = submission.is_verified,
            "step reviewed"
        );
        self.events.publish(SubmissionEvent::Updated {
            id: submission.id.clone(),
            version: submission.version,
        });
        Ok(submission)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        // Numbers go back to the pool first so a failed delete can be retried.
        let freed = self.phone_numbers.release_all_except(id, None).await?;
        if !freed.is_empty() {
            info!(submission = %id, freed = ?freed, "released phone numbers");
        }

        let Some(removed) = self.submissions.delete(id).await? else {
            return Ok(());
        };
        info!(submission = %removed.id, "submission deleted");
        self.events.publish(SubmissionEvent::Deleted { id: removed.id });
        Ok(())
    }

    async fn watch(
        &self,
        id: &str,
        since: u64,
        timeout: Duration,
    ) -> Result<Submission, AppError> {
        // Subscribe first so a change between the read and the wait is not lost.
        let mut rx = self.events.subscribe();
        let current = self.get(id).await?;
        if current.version > since {
            return Ok(current);
        }

        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(event)) if event.id() == id => match event {
                    SubmissionEvent::Updated { version, .. } if version <= since => continue,
                    _ => break,
                },
                Ok(Ok(_)) => continue,
                Ok(Err(RecvError::Lagged(_))) | Ok(Err(RecvError::Closed)) | Err(_) => break,
            }
        }

        self.get(id).await
    }
}
