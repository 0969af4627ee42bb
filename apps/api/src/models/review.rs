use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Workflow status of a persisted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    InputsComplete,
    Generated,
    Reviewed,
    Finalized,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Draft => "draft",
            ReviewStatus::InputsComplete => "inputs_complete",
            ReviewStatus::Generated => "generated",
            ReviewStatus::Reviewed => "reviewed",
            ReviewStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReviewStatus::Draft),
            "inputs_complete" => Ok(ReviewStatus::InputsComplete),
            "generated" => Ok(ReviewStatus::Generated),
            "reviewed" => Ok(ReviewStatus::Reviewed),
            "finalized" => Ok(ReviewStatus::Finalized),
            other => Err(format!("unknown review status '{other}'")),
        }
    }
}

/// One review per (employee, cycle). Uniqueness is enforced by the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub cycle_id: Uuid,
    pub employee_humble: Option<i16>,
    pub employee_hungry: Option<i16>,
    pub employee_smart: Option<i16>,
    pub manager_humble: Option<i16>,
    pub manager_hungry: Option<i16>,
    pub manager_smart: Option<i16>,
    pub ai_strengths: Option<String>,
    pub ai_development_feedback: Option<String>,
    pub ai_goals: Option<String>,
    pub ai_overall_assessment: Option<String>,
    pub final_strengths: Option<String>,
    pub final_development_feedback: Option<String>,
    pub final_goals: Option<String>,
    pub final_overall_assessment: Option<String>,
    pub inputs_used: Option<Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewHistoryRow {
    pub id: Uuid,
    pub review_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
