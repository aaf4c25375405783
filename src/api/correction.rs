use crate::attendance::correction::{self, CorrectionError};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::correction::{CorrectionOutcome, CorrectionRequest, CorrectionStatus};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct SubmitCorrection {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-01-05T09:02:00", format = "date-time", value_type = String, nullable = true)]
    pub claimed_check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T17:45:00", format = "date-time", value_type = String, nullable = true)]
    pub claimed_check_out: Option<NaiveDateTime>,
    #[schema(example = "Forgot to punch out, left at 17:45")]
    pub message: String,
}

fn validate_submission(payload: &SubmitCorrection, today: NaiveDate) -> Result<(), &'static str> {
    if payload.message.trim().is_empty() {
        return Err("empty-message");
    }
    if payload.claimed_check_in.is_none() && payload.claimed_check_out.is_none() {
        return Err("no-claimed-times");
    }
    if let (Some(claimed_in), Some(claimed_out)) =
        (payload.claimed_check_in, payload.claimed_check_out)
    {
        if claimed_out <= claimed_in {
            return Err("invalid-claimed-times");
        }
    }
    if payload.date > today {
        return Err("future-date");
    }
    Ok(())
}

/// Dispute a missing or wrong punch
#[utoipa::path(
    post,
    path = "/api/v1/attendance/correction",
    request_body(
        content = SubmitCorrection,
        description = "Correction request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Correction request submitted", body = Object, example = json!({
            "message": "Correction request submitted",
            "id": 1,
            "status": "pending"
        })),
        (status = 400, description = "Invalid correction payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Correction"
)]
pub async fn submit_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<SubmitCorrection>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = auth
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    if let Err(code) = validate_submission(&payload, config.local_today()) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "code": code,
            "message": "Invalid correction payload"
        })));
    }

    let id = match correction::submit(
        pool.get_ref(),
        employee_id,
        payload.date,
        payload.claimed_check_in,
        payload.claimed_check_out,
        payload.message.trim(),
    )
    .await
    {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "code": "store-unavailable",
                "message": "Please try again"
            })));
        }
    };

    info!(
        target: "audit",
        employee_id,
        request_id = id,
        date = %payload.date,
        "Correction request submitted"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Correction request submitted",
        "id": id,
        "status": "pending"
    })))
}

#[derive(Deserialize, IntoParams)]
pub struct CorrectionFilter {
    /// Filter by status: pending, accepted, or rejected
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

/// List correction requests (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/attendance/correction",
    params(CorrectionFilter),
    responses(
        (status = 200, description = "Correction requests", body = [CorrectionRequest]),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Correction"
)]
pub async fn list_corrections(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CorrectionFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<CorrectionStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "code": "invalid-status",
                    "message": "status must be pending, accepted, or rejected"
                })));
            }
        },
        None => None,
    };

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    match correction::list(pool.get_ref(), status, per_page, offset).await {
        Ok(requests) => Ok(HttpResponse::Ok().json(requests)),
        Err(_) => Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "code": "store-unavailable",
            "message": "Please try again"
        }))),
    }
}

async fn resolve_correction(
    outcome: CorrectionOutcome,
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let request_id = path.into_inner();
    match correction::resolve(pool.get_ref(), request_id, outcome, auth.user_id).await {
        Ok(request) => {
            let resolution = match outcome {
                CorrectionOutcome::Accept => "accepted",
                CorrectionOutcome::Reject => "rejected",
            };
            info!(
                target: "audit",
                actor = auth.user_id,
                request_id,
                employee_id = request.employee_id,
                date = %request.date,
                resolution,
                "Correction request resolved"
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Correction request resolved",
                "status": resolution
            })))
        }
        Err(CorrectionError::AlreadyResolved) => {
            Ok(HttpResponse::Conflict().json(serde_json::json!({
                "code": "already-resolved",
                "message": "Correction request already resolved"
            })))
        }
        Err(CorrectionError::NotFound) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Correction request not found"
        }))),
        Err(CorrectionError::InvalidAmendment(reason)) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "code": "invalid-amendment",
                "message": reason.to_string()
            })))
        }
        Err(CorrectionError::Unavailable) => {
            Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "code": "store-unavailable",
                "message": "Please try again"
            })))
        }
    }
}

/// Accept a correction and amend the attendance record (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/attendance/correction/{request_id}/accept",
    params(
        ("request_id" = u64, Path, description = "Correction request to accept")
    ),
    responses(
        (status = 200, description = "Correction accepted and record amended"),
        (status = 400, description = "Amendment would violate record invariants"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction request not found"),
        (status = 409, description = "Already resolved"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Correction"
)]
pub async fn accept_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    resolve_correction(CorrectionOutcome::Accept, auth, pool, path).await
}

/// Reject a correction, leaving the record untouched (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/attendance/correction/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "Correction request to reject")
    ),
    responses(
        (status = 200, description = "Correction rejected"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction request not found"),
        (status = 409, description = "Already resolved"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Correction"
)]
pub async fn reject_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    resolve_correction(CorrectionOutcome::Reject, auth, pool, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 6).unwrap()
    }

    fn payload(
        claimed_check_in: Option<NaiveDateTime>,
        claimed_check_out: Option<NaiveDateTime>,
    ) -> SubmitCorrection {
        SubmitCorrection {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            claimed_check_in,
            claimed_check_out,
            message: "Forgot to punch out".into(),
        }
    }

    fn at(h: u32, m: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
    }

    #[test]
    fn submission_needs_at_least_one_claimed_time() {
        assert_eq!(
            validate_submission(&payload(None, None), today()),
            Err("no-claimed-times")
        );
        assert!(validate_submission(&payload(None, at(17, 45)), today()).is_ok());
    }

    #[test]
    fn claimed_pair_must_be_ordered() {
        assert_eq!(
            validate_submission(&payload(at(17, 45), at(9, 0)), today()),
            Err("invalid-claimed-times")
        );
        assert!(validate_submission(&payload(at(9, 0), at(17, 45)), today()).is_ok());
    }

    #[test]
    fn future_dates_and_empty_messages_are_rejected() {
        let mut p = payload(at(9, 0), None);
        p.date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert_eq!(validate_submission(&p, today()), Err("future-date"));

        let mut p = payload(at(9, 0), None);
        p.message = "   ".into();
        assert_eq!(validate_submission(&p, today()), Err("empty-message"));
    }
}
