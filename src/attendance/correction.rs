use crate::attendance::store;
use crate::model::attendance::PunchSource;
use crate::model::correction::{CorrectionOutcome, CorrectionRequest, CorrectionStatus};
use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use sqlx::MySqlPool;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AmendmentInvalid {
    #[display(fmt = "claimed check-out would not be after check-in")]
    OutNotAfterIn,
    #[display(fmt = "check-out cannot exist without a check-in")]
    OutWithoutIn,
}

#[derive(Debug, Display)]
pub enum CorrectionError {
    #[display(fmt = "correction request already resolved")]
    AlreadyResolved,
    #[display(fmt = "correction request not found")]
    NotFound,
    #[display(fmt = "{}", _0)]
    InvalidAmendment(AmendmentInvalid),
    #[display(fmt = "correction store unavailable")]
    Unavailable,
}

/// Checks the record as it would stand once the claimed times are applied
/// over the existing punches. The attendance invariants hold for amended
/// rows too.
pub fn validate_amendment(
    existing_in: Option<NaiveDateTime>,
    existing_out: Option<NaiveDateTime>,
    claimed_in: Option<NaiveDateTime>,
    claimed_out: Option<NaiveDateTime>,
) -> Result<(), AmendmentInvalid> {
    let effective_in = claimed_in.or(existing_in);
    let effective_out = claimed_out.or(existing_out);
    match (effective_in, effective_out) {
        (None, Some(_)) => Err(AmendmentInvalid::OutWithoutIn),
        (Some(check_in), Some(check_out)) if check_out <= check_in => {
            Err(AmendmentInvalid::OutNotAfterIn)
        }
        _ => Ok(()),
    }
}

pub async fn submit(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    claimed_check_in: Option<NaiveDateTime>,
    claimed_check_out: Option<NaiveDateTime>,
    message: &str,
) -> Result<u64, CorrectionError> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_corrections
            (employee_id, date, claimed_check_in, claimed_check_out, message)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .bind(claimed_check_in)
    .bind(claimed_check_out)
    .bind(message)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create correction request");
        CorrectionError::Unavailable
    })?;

    Ok(result.last_insert_id())
}

const CORRECTION_COLUMNS: &str = "id, employee_id, date, claimed_check_in, claimed_check_out, \
     message, status, resolved_by, created_at, resolved_at";

pub async fn fetch(
    pool: &MySqlPool,
    request_id: u64,
) -> Result<Option<CorrectionRequest>, CorrectionError> {
    let sql = format!("SELECT {CORRECTION_COLUMNS} FROM attendance_corrections WHERE id = ?");
    sqlx::query_as::<_, CorrectionRequest>(&sql)
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, request_id, "Failed to fetch correction request");
            CorrectionError::Unavailable
        })
}

pub async fn list(
    pool: &MySqlPool,
    status: Option<CorrectionStatus>,
    limit: u64,
    offset: u64,
) -> Result<Vec<CorrectionRequest>, CorrectionError> {
    let mut sql = format!("SELECT {CORRECTION_COLUMNS} FROM attendance_corrections");
    if status.is_some() {
        sql.push_str(" WHERE status = ?");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, CorrectionRequest>(&sql);
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }

    query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list correction requests");
            CorrectionError::Unavailable
        })
}

/// Terminal accept/reject, performed exactly once. The conditional update
/// on status = 'pending' is the exactly-once guard: a concurrent reviewer
/// loses with AlreadyResolved. Accept amends the attendance row; reject
/// leaves it untouched.
pub async fn resolve(
    pool: &MySqlPool,
    request_id: u64,
    outcome: CorrectionOutcome,
    resolver_user_id: u64,
) -> Result<CorrectionRequest, CorrectionError> {
    let Some(request) = fetch(pool, request_id).await? else {
        return Err(CorrectionError::NotFound);
    };
    if request.status != CorrectionStatus::Pending.to_string() {
        return Err(CorrectionError::AlreadyResolved);
    }

    if outcome == CorrectionOutcome::Accept {
        let record = store::fetch_record(pool, request.employee_id, request.date)
            .await
            .map_err(|_| CorrectionError::Unavailable)?;
        let (existing_in, existing_out) = record
            .map(|r| (r.check_in, r.check_out))
            .unwrap_or((None, None));
        validate_amendment(
            existing_in,
            existing_out,
            request.claimed_check_in,
            request.claimed_check_out,
        )
        .map_err(CorrectionError::InvalidAmendment)?;
    }

    // One transaction for the status flip and the amendment: a failed
    // amendment rolls the resolution back, so a retry after a transient
    // failure finds the request still pending instead of AlreadyResolved.
    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, request_id, "Resolve correction failed");
        CorrectionError::Unavailable
    })?;

    let result = sqlx::query(
        r#"
        UPDATE attendance_corrections
        SET status = ?, resolved_by = ?, resolved_at = NOW()
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(resolution_status(outcome).to_string())
    .bind(resolver_user_id)
    .bind(request_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, request_id, "Resolve correction failed");
        CorrectionError::Unavailable
    })?;

    if result.rows_affected() == 0 {
        return Err(CorrectionError::AlreadyResolved);
    }

    if outcome == CorrectionOutcome::Accept {
        apply_amendment(&mut tx, &request).await?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, request_id, "Resolve correction failed");
        CorrectionError::Unavailable
    })?;

    Ok(request)
}

fn resolution_status(outcome: CorrectionOutcome) -> CorrectionStatus {
    match outcome {
        CorrectionOutcome::Accept => CorrectionStatus::Accepted,
        CorrectionOutcome::Reject => CorrectionStatus::Rejected,
    }
}

/// Upserts the claimed times onto the attendance row, tagging every punch
/// it touches as corrected. Untouched punches keep their original tag, so
/// the audit trail distinguishes original from amended values.
async fn apply_amendment(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    request: &CorrectionRequest,
) -> Result<(), CorrectionError> {
    let in_source = source_for(request.claimed_check_in);
    let out_source = source_for(request.claimed_check_out);

    sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, date, check_in, check_out, check_in_source, check_out_source)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            check_in = COALESCE(VALUES(check_in), check_in),
            check_out = COALESCE(VALUES(check_out), check_out),
            check_in_source = IF(VALUES(check_in) IS NULL, check_in_source, VALUES(check_in_source)),
            check_out_source = IF(VALUES(check_out) IS NULL, check_out_source, VALUES(check_out_source))
        "#,
    )
    .bind(request.employee_id)
    .bind(request.date)
    .bind(request.claimed_check_in)
    .bind(request.claimed_check_out)
    .bind(in_source.to_string())
    .bind(out_source.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!(error = %e, request_id = request.id, "Failed to apply accepted correction");
        CorrectionError::Unavailable
    })?;

    Ok(())
}

fn source_for(claimed: Option<NaiveDateTime>) -> PunchSource {
    if claimed.is_some() {
        PunchSource::Corrected
    } else {
        PunchSource::Original
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
    }

    #[test]
    fn missing_check_out_can_be_claimed_against_an_existing_check_in() {
        assert!(validate_amendment(at(8, 58), None, None, at(17, 45)).is_ok());
    }

    #[test]
    fn claimed_pair_must_be_ordered() {
        assert_eq!(
            validate_amendment(None, None, at(17, 45), at(9, 0)),
            Err(AmendmentInvalid::OutNotAfterIn)
        );
        assert_eq!(
            validate_amendment(None, None, at(9, 0), at(9, 0)),
            Err(AmendmentInvalid::OutNotAfterIn)
        );
        assert!(validate_amendment(None, None, at(9, 0), at(17, 45)).is_ok());
    }

    #[test]
    fn check_out_claim_without_any_check_in_is_invalid() {
        assert_eq!(
            validate_amendment(None, None, None, at(17, 45)),
            Err(AmendmentInvalid::OutWithoutIn)
        );
    }

    #[test]
    fn claimed_times_override_existing_ones_for_validation() {
        // Existing 08:58-17:31; claiming a 08:00 check-out must fail.
        assert_eq!(
            validate_amendment(at(8, 58), at(17, 31), None, at(8, 0)),
            Err(AmendmentInvalid::OutNotAfterIn)
        );
        // Claiming an earlier check-in stays valid.
        assert!(validate_amendment(at(8, 58), at(17, 31), at(8, 30), None).is_ok());
    }

    #[test]
    fn untouched_punches_keep_their_original_tag() {
        assert_eq!(source_for(None), PunchSource::Original);
        assert_eq!(source_for(at(9, 0)), PunchSource::Corrected);
    }

    #[test]
    fn outcome_maps_to_its_terminal_status() {
        assert_eq!(
            resolution_status(CorrectionOutcome::Accept),
            CorrectionStatus::Accepted
        );
        assert_eq!(
            resolution_status(CorrectionOutcome::Reject),
            CorrectionStatus::Rejected
        );
    }
}
