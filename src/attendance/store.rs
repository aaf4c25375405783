use crate::attendance::state::{self, DayState, PunchConflict};
use crate::model::attendance::{AttendanceRecord, Geolocation, PunchKind, TrustResult};
use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use sqlx::MySqlPool;
use tracing::error;

#[derive(Debug, Display)]
pub enum PunchError {
    #[display(fmt = "{}", _0)]
    Conflict(PunchConflict),
    #[display(fmt = "attendance store unavailable")]
    Unavailable,
}

/// Everything recorded alongside a punch for later audit review.
#[derive(Debug, Clone)]
pub struct PunchEvidence {
    pub ip: Option<String>,
    pub geo: Option<Geolocation>,
    pub fingerprint: String,
    pub trust: TrustResult,
}

const RECORD_COLUMNS: &str = "id, employee_id, date, check_in, check_out, \
     check_in_ip, check_out_ip, check_in_lon, check_in_lat, check_out_lon, check_out_lat, \
     check_in_fingerprint, check_out_fingerprint, \
     check_in_trust, check_in_trust_reason, check_out_trust, check_out_trust_reason, \
     check_in_source, check_out_source";

pub async fn fetch_record(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, PunchError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
    sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(employee_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Attendance lookup failed");
            PunchError::Unavailable
        })
}

/// Creates the day's record. The unique key on (employee_id, date) is the
/// atomicity guarantee: of N concurrent check-ins exactly one insert wins
/// and the rest surface as AlreadyCheckedIn.
pub async fn record_check_in(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    at: NaiveDateTime,
    evidence: &PunchEvidence,
) -> Result<(), PunchError> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, date, check_in,
             check_in_ip, check_in_lon, check_in_lat,
             check_in_fingerprint, check_in_trust, check_in_trust_reason)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .bind(at)
    .bind(evidence.ip.as_deref())
    .bind(evidence.geo.map(|g| g.lon))
    .bind(evidence.geo.map(|g| g.lat))
    .bind(evidence.fingerprint.as_str())
    .bind(evidence.trust.level.to_string())
    .bind(evidence.trust.reason.to_string())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            let classified = classify_insert_error(&e);
            if matches!(classified, PunchError::Unavailable) {
                error!(error = %e, employee_id, "Check-in write failed");
            }
            Err(classified)
        }
    }
}

/// Duplicate (employee_id, date) means this check-in lost to a concurrent
/// or earlier one; anything else is transient.
fn classify_insert_error(e: &sqlx::Error) -> PunchError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.code().as_deref() == Some("23000") {
            return PunchError::Conflict(PunchConflict::AlreadyCheckedIn);
        }
    }
    PunchError::Unavailable
}

/// Stamps the check-out via a compare-and-set on `check_out IS NULL`; a
/// miss is re-read and classified rather than guessed at.
pub async fn record_check_out(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    at: NaiveDateTime,
    evidence: &PunchEvidence,
) -> Result<(), PunchError> {
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?,
            check_out_ip = ?,
            check_out_lon = ?,
            check_out_lat = ?,
            check_out_fingerprint = ?,
            check_out_trust = ?,
            check_out_trust_reason = ?
        WHERE employee_id = ?
          AND date = ?
          AND check_in IS NOT NULL
          AND check_out IS NULL
        "#,
    )
    .bind(at)
    .bind(evidence.ip.as_deref())
    .bind(evidence.geo.map(|g| g.lon))
    .bind(evidence.geo.map(|g| g.lat))
    .bind(evidence.fingerprint.as_str())
    .bind(evidence.trust.level.to_string())
    .bind(evidence.trust.reason.to_string())
    .bind(employee_id)
    .bind(date)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out write failed");
        PunchError::Unavailable
    })?;

    if result.rows_affected() == 0 {
        let record = fetch_record(pool, employee_id, date).await?;
        return match state::decide(PunchKind::CheckOut, DayState::of(record.as_ref())) {
            Err(conflict) => Err(PunchError::Conflict(conflict)),
            // Row reads as CheckedIn yet the update matched nothing: we
            // raced another writer. Safe to retry.
            Ok(()) => Err(PunchError::Unavailable),
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    // Minimal stand-in for the driver's duplicate-key error, carrying the
    // SQLSTATE a violated unique key reports.
    #[derive(Debug)]
    struct DuplicateKey;

    impl fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "Duplicate entry '1000-2026-01-05' for key 'uq_attendance_employee_date'"
            )
        }
    }

    impl StdError for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "Duplicate entry"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some("23000".into())
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn losing_a_concurrent_check_in_is_a_conflict_not_an_outage() {
        let e = sqlx::Error::Database(Box::new(DuplicateKey));
        assert!(matches!(
            classify_insert_error(&e),
            PunchError::Conflict(PunchConflict::AlreadyCheckedIn)
        ));
    }

    #[test]
    fn other_write_failures_stay_transient() {
        assert!(matches!(
            classify_insert_error(&sqlx::Error::PoolTimedOut),
            PunchError::Unavailable
        ));
        assert!(matches!(
            classify_insert_error(&sqlx::Error::RowNotFound),
            PunchError::Unavailable
        ));
    }
}
