use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ephemeral issuance. Nothing here is persisted or survives a restart,
/// and the payload carries no employee identity: the identity comes from
/// the authenticated session at submission time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QrIssuance {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub token: String,
    #[schema(example = "https://hr.example.com/attendance/check-in?t=550e8400-e29b-41d4-a716-446655440000")]
    pub attendance_url: String,
    /// The string clients encode as the QR image.
    pub qr_payload: String,
    #[schema(example = "2026-01-05T09:05:00Z", format = "date-time", value_type = String)]
    pub expires_at: DateTime<Utc>,
}

/// Safe to call repeatedly, e.g. from a kiosk refresh timer.
pub fn issue(public_base_url: &str, ttl_secs: i64) -> QrIssuance {
    let token = Uuid::new_v4().to_string();
    let attendance_url = format!(
        "{}/attendance/check-in?t={}",
        public_base_url.trim_end_matches('/'),
        token
    );
    QrIssuance {
        qr_payload: attendance_url.clone(),
        attendance_url,
        token,
        expires_at: Utc::now() + Duration::seconds(ttl_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_issuance_gets_a_fresh_token() {
        let a = issue("https://hr.example.com", 300);
        let b = issue("https://hr.example.com", 300);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn url_embeds_the_token_and_normalizes_the_base() {
        let issued = issue("https://hr.example.com/", 300);
        assert!(issued.attendance_url.contains(&issued.token));
        assert!(
            issued
                .attendance_url
                .starts_with("https://hr.example.com/attendance/check-in?t=")
        );
        assert_eq!(issued.qr_payload, issued.attendance_url);
    }

    #[test]
    fn issuance_expires_in_the_future() {
        let issued = issue("https://hr.example.com", 300);
        assert!(issued.expires_at > Utc::now());
    }
}
