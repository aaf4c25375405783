use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Employee-initiated dispute over a missing or wrong punch. Resolved
/// exactly once; the linked attendance row is amended only on accept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CorrectionRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-01-05T09:02:00", format = "date-time", value_type = String, nullable = true)]
    pub claimed_check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T17:45:00", format = "date-time", value_type = String, nullable = true)]
    pub claimed_check_out: Option<NaiveDateTime>,
    #[schema(example = "Forgot to punch out, left at 17:45")]
    pub message: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = 7, nullable = true)]
    pub resolved_by: Option<u64>,
    #[schema(example = "2026-01-06T08:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(example = "2026-01-06T10:00:00Z", format = "date-time", value_type = String, nullable = true)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionOutcome {
    Accept,
    Reject,
}
