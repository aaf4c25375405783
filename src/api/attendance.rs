use crate::attendance::registry;
use crate::attendance::store::{self, PunchError, PunchEvidence};
use crate::attendance::trust::{self, TrustConfig};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{Geolocation, PunchKind};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use std::net::IpAddr;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct PunchPayload {
    /// Client device/browser identifier, weak corroborating evidence only
    #[schema(example = "fp-6c2a9f31")]
    pub fingerprint: String,
    pub geolocation: Option<Geolocation>,
}

fn validate_punch(payload: &PunchPayload) -> Result<(), &'static str> {
    if payload.fingerprint.trim().is_empty() || payload.fingerprint.len() > 128 {
        return Err("invalid-fingerprint");
    }
    if let Some(geo) = payload.geolocation {
        if !geo.is_valid() {
            return Err("invalid-geolocation");
        }
    }
    Ok(())
}

fn client_ip(req: &HttpRequest) -> Option<IpAddr> {
    req.connection_info()
        .realip_remote_addr()
        .and_then(trust::parse_client_ip)
}

async fn submit_punch(
    kind: PunchKind,
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<PunchPayload>,
) -> actix_web::Result<HttpResponse> {
    let employee_id: u64 = auth
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    if let Err(code) = validate_punch(&payload) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "code": code,
            "message": "Invalid punch payload"
        })));
    }

    let ip = client_ip(&req);
    let snapshot = match registry::snapshot(pool.get_ref()).await {
        Ok(s) => s,
        Err(_) => {
            return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "code": "registry-unavailable",
                "message": "Please try again"
            })));
        }
    };

    let trust_cfg = TrustConfig {
        policy: config.trust_policy,
        geo_radius_m: config.geo_radius_m,
        dev_trust_loopback: config.trust_dev_loopback,
    };
    let trust = trust::evaluate(&snapshot, &trust_cfg, ip, payload.geolocation);

    if trust_cfg.rejects(&trust) {
        warn!(employee_id, reason = %trust.reason, "Punch rejected by strict trust policy");
        return Ok(HttpResponse::Forbidden().json(serde_json::json!({
            "code": "untrusted-origin",
            "message": "Punch origin not recognized as a workplace network"
        })));
    }

    // Date and timestamps are server-derived in the org-local zone; a
    // client cannot backdate a punch.
    let now = config.local_now();
    let date = now.date();
    let evidence = PunchEvidence {
        ip: ip.map(|a| a.to_string()),
        geo: payload.geolocation.filter(|g| g.is_valid()),
        fingerprint: payload.fingerprint.clone(),
        trust,
    };

    let outcome = match kind {
        PunchKind::CheckIn => {
            store::record_check_in(pool.get_ref(), employee_id, date, now, &evidence).await
        }
        PunchKind::CheckOut => {
            store::record_check_out(pool.get_ref(), employee_id, date, now, &evidence).await
        }
    };

    match outcome {
        Ok(()) => {
            info!(
                target: "audit",
                employee_id,
                punch = %kind,
                date = %date,
                trust = %trust.level,
                trust_reason = %trust.reason,
                "Punch recorded"
            );
            let message = match kind {
                PunchKind::CheckIn => "Checked in successfully",
                PunchKind::CheckOut => "Checked out successfully",
            };
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": message,
                "trust": trust.level,
                "trust_reason": trust.reason
            })))
        }
        Err(PunchError::Conflict(conflict)) => Ok(HttpResponse::Conflict().json(
            serde_json::json!({
                "code": conflict.code(),
                "message": conflict.to_string()
            }),
        )),
        Err(PunchError::Unavailable) => Ok(HttpResponse::ServiceUnavailable().json(
            serde_json::json!({
                "code": "store-unavailable",
                "message": "Please try again"
            }),
        )),
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body(
        content = PunchPayload,
        description = "Check-in evidence",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "trust": "trusted",
            "trust_reason": "network-allowlist"
        })),
        (status = 400, description = "Invalid punch payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden or rejected by strict trust policy"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "code": "already-checked-in",
            "message": "already checked in today"
        })),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<PunchPayload>,
) -> actix_web::Result<impl Responder> {
    submit_punch(PunchKind::CheckIn, auth, req, pool, config, payload).await
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/v1/attendance",
    request_body(
        content = PunchPayload,
        description = "Check-out evidence",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "trust": "untrusted",
            "trust_reason": "no-match"
        })),
        (status = 400, description = "Invalid punch payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden or rejected by strict trust policy"),
        (status = 409, description = "No check-in yet, or already checked out", body = Object, example = json!({
            "code": "not-checked-in-yet",
            "message": "no active check-in found for today"
        })),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<PunchPayload>,
) -> actix_web::Result<impl Responder> {
    submit_punch(PunchKind::CheckOut, auth, req, pool, config, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_required_and_bounded() {
        let empty = PunchPayload {
            fingerprint: "  ".into(),
            geolocation: None,
        };
        assert_eq!(validate_punch(&empty), Err("invalid-fingerprint"));

        let oversized = PunchPayload {
            fingerprint: "x".repeat(129),
            geolocation: None,
        };
        assert_eq!(validate_punch(&oversized), Err("invalid-fingerprint"));

        let ok = PunchPayload {
            fingerprint: "fp-6c2a9f31".into(),
            geolocation: None,
        };
        assert!(validate_punch(&ok).is_ok());
    }

    #[test]
    fn out_of_range_geolocation_is_rejected_before_any_write() {
        let payload = PunchPayload {
            fingerprint: "fp-6c2a9f31".into(),
            geolocation: Some(Geolocation {
                lon: 0.0,
                lat: 91.0,
            }),
        };
        assert_eq!(validate_punch(&payload), Err("invalid-geolocation"));
    }
}
