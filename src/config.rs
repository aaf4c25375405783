use crate::attendance::trust::TrustPolicy;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    /// Base URL the QR payload points at, e.g. "https://hr.example.com".
    pub public_base_url: String,
    pub qr_ttl_secs: i64,

    /// Organization-local calendar boundary, as a fixed offset from UTC.
    /// Applied to both the attendance date and the punch timestamps so a
    /// punch near midnight never lands on the wrong day.
    pub org_utc_offset_minutes: i32,

    pub trust_policy: TrustPolicy,
    pub geo_radius_m: f64,
    pub trust_dev_loopback: bool,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_report_per_min: u32,
    pub rate_admin_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            qr_ttl_secs: env::var("QR_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string()) // default 5 min
                .parse()
                .unwrap(),

            org_utc_offset_minutes: env::var("ORG_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap(),

            trust_policy: env::var("TRUST_POLICY")
                .unwrap_or_else(|_| "audit-only".to_string())
                .parse()
                .expect("TRUST_POLICY must be 'audit-only' or 'strict'"),
            geo_radius_m: env::var("GEO_RADIUS_M")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap(),
            trust_dev_loopback: env::var("TRUST_DEV_LOOPBACK")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap(),

            rate_punch_per_min: env::var("RATE_PUNCH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_report_per_min: env::var("RATE_REPORT_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_admin_per_min: env::var("RATE_ADMIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }

    fn org_offset(&self) -> FixedOffset {
        // Offset validated here rather than at every call site.
        FixedOffset::east_opt(self.org_utc_offset_minutes * 60)
            .expect("ORG_UTC_OFFSET_MINUTES out of range")
    }

    /// Server-side "now" in the organization's local zone. The attendance
    /// date is always derived from this, never from client input.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.org_offset()).naive_local()
    }

    pub fn local_today(&self) -> NaiveDate {
        self.local_now().date()
    }
}
