use crate::attendance::aggregate;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{AttendanceRecord, PunchSource, TrustLevel};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// One attendance record shaped for report views.
#[derive(Serialize, ToSchema)]
pub struct RecordView {
    pub record: AttendanceRecord,
    /// Worked minutes; null while a punch is missing
    #[schema(example = 513, nullable = true)]
    pub work_minutes: Option<i64>,
    /// False means the check-in evidence matched no registered office and
    /// the record is flagged for review
    pub trusted: bool,
    /// True if any punch on the record came from an accepted correction
    pub corrected: bool,
}

fn view(record: AttendanceRecord) -> Result<RecordView, aggregate::IntegrityViolation> {
    let work_minutes = aggregate::work_hours(&record)?.map(|d| d.num_minutes());
    let trusted = record
        .check_in_trust
        .as_deref()
        .and_then(|s| s.parse::<TrustLevel>().ok())
        == Some(TrustLevel::Trusted);
    let corrected = [&record.check_in_source, &record.check_out_source]
        .iter()
        .any(|s| s.parse::<PunchSource>().ok() == Some(PunchSource::Corrected));
    Ok(RecordView {
        record,
        work_minutes,
        trusted,
        corrected,
    })
}

#[derive(Deserialize, IntoParams)]
pub struct RosterQuery {
    /// Roster date; defaults to today in the organization's zone
    #[param(example = "2026-01-05", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct RosterResponse {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub present: Vec<RecordView>,
    /// Anomalous records excluded from the view, for operator follow-up
    #[schema(example = 0)]
    pub excluded_records: u64,
}

/// Who is present on a given day
#[utoipa::path(
    get,
    path = "/api/v1/attendance/roster",
    params(RosterQuery),
    responses(
        (status = 200, description = "Roster for the date", body = RosterResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn roster(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<RosterQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let date = query.date.unwrap_or_else(|| config.local_today());

    let rows = match aggregate::daily_roster(pool.get_ref(), date).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, %date, "Failed to load roster");
            return Ok(store_unavailable());
        }
    };

    let mut present = Vec::with_capacity(rows.len());
    let mut excluded_records = 0u64;
    for record in rows {
        match view(record) {
            Ok(v) => present.push(v),
            Err(violation) => {
                error!(%violation, "Excluding anomalous attendance record from roster");
                excluded_records += 1;
            }
        }
    }

    Ok(HttpResponse::Ok().json(RosterResponse {
        date,
        present,
        excluded_records,
    }))
}

#[derive(Deserialize, IntoParams)]
pub struct LogQuery {
    /// How many days back to list (1..=31); defaults to 7
    pub days: Option<u32>,
    /// Another employee's log; HR/Admin only
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LogResponse {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 7)]
    pub days: u32,
    pub records: Vec<RecordView>,
    /// Present only for HR/Admin callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_records: Option<u64>,
}

/// Per-employee attendance history, most recent day first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/log",
    params(LogQuery),
    responses(
        (status = 200, description = "Attendance log", body = LogResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn employee_log(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<LogQuery>,
) -> actix_web::Result<impl Responder> {
    let target = match query.employee_id {
        Some(id) if auth.is_hr_or_admin() || auth.employee_id == Some(id) => id,
        Some(_) => {
            return Err(actix_web::error::ErrorForbidden(
                "Cannot view another employee's log",
            ));
        }
        None => auth
            .employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?,
    };
    let days = query.days.unwrap_or(7).clamp(1, 31);

    let rows =
        match aggregate::last_n_days_log(pool.get_ref(), target, config.local_today(), days).await
        {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, employee_id = target, "Failed to load attendance log");
            return Ok(store_unavailable());
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut excluded = 0u64;
    for record in rows {
        match view(record) {
            Ok(v) => records.push(v),
            Err(violation) => {
                error!(%violation, "Excluding anomalous attendance record from log");
                excluded += 1;
            }
        }
    }

    Ok(HttpResponse::Ok().json(LogResponse {
        employee_id: target,
        days,
        records,
        excluded_records: auth.is_hr_or_admin().then_some(excluded),
    }))
}

#[derive(Deserialize, IntoParams)]
pub struct RateQuery {
    /// Single day; shorthand for from = to = date
    #[param(example = "2026-01-05", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[param(example = "2026-01-01", value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(example = "2026-01-31", value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    /// Calendar month as YYYY-MM; averages daily rates over working days
    pub month: Option<String>,
    /// Headcount denominator, owned by the employee module
    pub total_employees: u64,
}

#[derive(Serialize, ToSchema)]
pub struct RateResponse {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: NaiveDate,
    #[schema(example = "range")]
    pub mode: &'static str,
    #[schema(example = 40.0)]
    pub rate_percent: f64,
    /// Distinct employees with a check-in; omitted for monthly averages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<i64>,
    #[schema(example = 20)]
    pub total_employees: u64,
    #[schema(example = 0)]
    pub excluded_records: i64,
}

fn parse_month(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = raw.split_once('-')?;
    aggregate::month_range(year.parse().ok()?, month.parse().ok()?)
}

/// Attendance rate over a range or a calendar month
#[utoipa::path(
    get,
    path = "/api/v1/attendance/rate",
    params(RateQuery),
    responses(
        (status = 200, description = "Attendance rate", body = RateResponse),
        (status = 400, description = "Invalid range, month, or headcount"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn attendance_rate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<RateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if query.total_employees == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "code": "invalid-total-employees",
            "message": "total_employees must be positive"
        })));
    }

    let (from, to, mode) = if let Some(raw) = query.month.as_deref() {
        match parse_month(raw) {
            Some((from, to)) => (from, to, "monthly-average"),
            None => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "code": "invalid-month",
                    "message": "month must be YYYY-MM"
                })));
            }
        }
    } else {
        let from = query
            .from
            .or(query.date)
            .unwrap_or_else(|| config.local_today());
        let to = query.to.or(query.date).unwrap_or(from);
        (from, to, "range")
    };

    if from > to {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "code": "invalid-range",
            "message": "from must not be after to"
        })));
    }

    let result: Result<(f64, Option<i64>), sqlx::Error> = if mode == "monthly-average" {
        aggregate::daily_present_counts(pool.get_ref(), from, to)
            .await
            .map(|counts| {
                let rate =
                    aggregate::monthly_rate_percent(&counts, query.total_employees, from, to);
                (rate, None)
            })
    } else {
        aggregate::distinct_present(pool.get_ref(), from, to)
            .await
            .map(|present| {
                let rate = aggregate::rate_percent(present.max(0) as u64, query.total_employees);
                (rate, Some(present))
            })
    };

    let (rate, present) = match result {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, %from, %to, "Failed to compute attendance rate");
            return Ok(store_unavailable());
        }
    };

    let excluded_records = match aggregate::integrity_violations(pool.get_ref(), from, to).await {
        Ok(n) => {
            if n > 0 {
                error!(excluded = n, %from, %to, "Anomalous attendance records excluded from rate");
            }
            n
        }
        Err(e) => {
            error!(error = %e, "Failed to count anomalous attendance records");
            return Ok(store_unavailable());
        }
    };

    Ok(HttpResponse::Ok().json(RateResponse {
        from,
        to,
        mode,
        rate_percent: rate,
        present,
        total_employees: query.total_employees,
        excluded_records,
    }))
}

fn store_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(serde_json::json!({
        "code": "store-unavailable",
        "message": "Please try again"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_param_parses_year_and_month() {
        let (from, to) = parse_month("2026-01").unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());

        assert!(parse_month("2026").is_none());
        assert!(parse_month("2026-13").is_none());
        assert!(parse_month("garbage-month").is_none());
    }
}
