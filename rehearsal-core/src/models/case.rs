use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer persona used as a training scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    pub customer_name: String,
    pub intro: String,
    pub avatar: String,
    /// Position in the training sequence. Unique across cases.
    pub order_index: i64,
    pub meta_data: CaseMetaData,
    pub script: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseMetaData {
    pub budget: String,
    #[serde(alias = "decision_level")]
    pub decision_level: String,
    #[serde(default)]
    pub personality: Vec<String>,
    #[serde(default)]
    pub points: Vec<String>,
    pub background: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseInput {
    pub customer_name: String,
    pub intro: String,
    pub avatar: String,
    pub order_index: i64,
    #[serde(alias = "meta_data")]
    pub meta_data: CaseMetaData,
    #[serde(default)]
    pub script: Option<String>,
}

impl CreateCaseInput {
    /// Checks the fields the store refuses to persist empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customerName is required".into());
        }
        if self.intro.trim().is_empty() {
            return Err("intro is required".into());
        }
        if self.avatar.trim().is_empty() {
            return Err("avatar is required".into());
        }
        Ok(())
    }
}
