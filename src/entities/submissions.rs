//! Bridging submissions and the four-step approval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl StepStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The approval gates, in the order a user walks through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    TiktokUsername,
    VerificationCode,
    PhoneNumber,
    FinalCode,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::TiktokUsername,
        Step::VerificationCode,
        Step::PhoneNumber,
        Step::FinalCode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::TiktokUsername => "tiktokUsername",
            Step::VerificationCode => "verificationCode",
            Step::PhoneNumber => "phoneNumber",
            Step::FinalCode => "finalCode",
        }
    }

    /// Accepts the step name (`phoneNumber`) or its status key (`phoneNumberStatus`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let name = value.strip_suffix("Status").unwrap_or(value);
        Self::ALL.into_iter().find(|step| step.as_str() == name)
    }
}

/// Data carried by a single step submission.
#[derive(Clone, Debug, PartialEq)]
pub enum StepData {
    TiktokUsername(String),
    VerificationCode(String),
    PhoneNumber {
        number: String,
        number_id: Option<String>,
    },
    FinalCode(String),
}

impl StepData {
    pub fn step(&self) -> Step {
        match self {
            StepData::TiktokUsername(_) => Step::TiktokUsername,
            StepData::VerificationCode(_) => Step::VerificationCode,
            StepData::PhoneNumber { .. } => Step::PhoneNumber,
            StepData::FinalCode(_) => Step::FinalCode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub tiktok_username: String,
    pub tiktok_username_status: StepStatus,
    pub verification_code_status: StepStatus,
    pub phone_number_status: StepStatus,
    pub final_code_status: StepStatus,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub final_code: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every mutation; watchers compare against it.
    #[serde(default)]
    pub version: u64,
}

impl Submission {
    /// A fresh record: every step pending, the username defaulting to the id.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            tiktok_username: id.clone(),
            id,
            tiktok_username_status: StepStatus::Pending,
            verification_code_status: StepStatus::Pending,
            phone_number_status: StepStatus::Pending,
            final_code_status: StepStatus::Pending,
            verification_code: None,
            phone_number: None,
            phone_number_id: None,
            final_code: None,
            rejection_reason: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[cfg(test)]
    fn status(&self, step: Step) -> StepStatus {
        match step {
            Step::TiktokUsername => self.tiktok_username_status,
            Step::VerificationCode => self.verification_code_status,
            Step::PhoneNumber => self.phone_number_status,
            Step::FinalCode => self.final_code_status,
        }
    }

    fn status_mut(&mut self, step: Step) -> &mut StepStatus {
        match step {
            Step::TiktokUsername => &mut self.tiktok_username_status,
            Step::VerificationCode => &mut self.verification_code_status,
            Step::PhoneNumber => &mut self.phone_number_status,
            Step::FinalCode => &mut self.final_code_status,
        }
    }

    /// Stores the user's data for a step and puts it back in review.
    pub fn submit(&mut self, data: StepData, now: DateTime<Utc>) {
        let step = data.step();
        match data {
            StepData::TiktokUsername(username) => self.tiktok_username = username,
            StepData::VerificationCode(code) => self.verification_code = Some(code),
            StepData::PhoneNumber { number, number_id } => {
                self.phone_number = Some(number);
                self.phone_number_id = number_id;
            }
            StepData::FinalCode(code) => self.final_code = Some(code),
        }

        *self.status_mut(step) = StepStatus::Pending;
        self.rejection_reason = None;
        if self.final_code_status != StepStatus::Approved {
            self.is_verified = false;
        }
        self.touch(now);
    }

    /// Applies an administrator decision to a step.
    pub fn review(
        &mut self,
        step: Step,
        status: StepStatus,
        rejection_reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        *self.status_mut(step) = status;
        match status {
            StepStatus::Approved => {
                self.rejection_reason = None;
                if step == Step::FinalCode {
                    self.is_verified = true;
                }
            }
            StepStatus::Rejected => {
                let reason = rejection_reason
                    .map(|reason| reason.trim().to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| format!("{} was rejected", step.as_str()));
                self.rejection_reason = Some(reason);
                self.is_verified = false;
            }
            StepStatus::Pending => {
                self.rejection_reason = None;
                if self.final_code_status != StepStatus::Approved {
                    self.is_verified = false;
                }
            }
        }
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}
