use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row per (employee, calendar date in the organization's local zone).
/// Created by the first successful check-in of the day, mutated once by the
/// matching check-out, amended only through the correction workflow.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-01-05T08:58:00", format = "date-time", value_type = String)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T17:31:00", format = "date-time", value_type = String)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "203.0.113.17")]
    pub check_in_ip: Option<String>,
    pub check_out_ip: Option<String>,
    pub check_in_lon: Option<f64>,
    pub check_in_lat: Option<f64>,
    pub check_out_lon: Option<f64>,
    pub check_out_lat: Option<f64>,
    pub check_in_fingerprint: Option<String>,
    pub check_out_fingerprint: Option<String>,
    #[schema(example = "trusted")]
    pub check_in_trust: Option<String>,
    #[schema(example = "network-allowlist")]
    pub check_in_trust_reason: Option<String>,
    pub check_out_trust: Option<String>,
    pub check_out_trust_reason: Option<String>,
    #[schema(example = "original")]
    pub check_in_source: String,
    #[schema(example = "original")]
    pub check_out_source: String,
}

/// Client-reported longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geolocation {
    #[schema(example = 90.4125)]
    pub lon: f64,
    #[schema(example = 23.8103)]
    pub lat: f64,
}

impl Geolocation {
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
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
pub enum TrustLevel {
    Trusted,
    Untrusted,
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
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TrustReason {
    NetworkAllowlist,
    GeoProximity,
    DevLoopback,
    NoMatch,
}

/// Verdict attached to every punch for later audit review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrustResult {
    pub level: TrustLevel,
    pub reason: TrustReason,
}

impl TrustResult {
    pub fn is_trusted(&self) -> bool {
        self.level == TrustLevel::Trusted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PunchKind {
    CheckIn,
    CheckOut,
}

/// Whether a punch field holds the original value or a corrected amendment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PunchSource {
    Original,
    Corrected,
}
