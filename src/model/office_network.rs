use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Administrator-registered trusted workplace: an exact IP plus an optional
/// geolocation anchor for the proximity fallback. Read-only to the
/// verification path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OfficeNetwork {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "HQ 4th floor")]
    pub name: String,
    #[schema(example = "203.0.113.17")]
    pub ip_address: String,
    #[schema(example = 90.4125, nullable = true)]
    pub anchor_lon: Option<f64>,
    #[schema(example = 23.8103, nullable = true)]
    pub anchor_lat: Option<f64>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}
