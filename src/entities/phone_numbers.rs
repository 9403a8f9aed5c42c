use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub id: String,
    pub phone_number: String,
    pub is_available: bool,
    pub region: String,
    pub state: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub disadvantages: Vec<String>,
    #[serde(default)]
    pub bonuses: Vec<String>,
    /// Submission currently holding the number.
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl PhoneNumber {
    pub fn is_held_by(&self, submission_id: &str) -> bool {
        self.assigned_to.as_deref() == Some(submission_id)
    }
}
