use crate::model::attendance::AttendanceRecord;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use derive_more::Display;
use sqlx::MySqlPool;

/// A stored record that breaks the ordering invariant (check-out before
/// check-in). Never silently repaired: excluded from aggregates and
/// surfaced to operators as an anomalous-record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "attendance record {} has check-out before check-in", record_id)]
pub struct IntegrityViolation {
    pub record_id: u64,
}

/// Work duration for a record: None while either punch is missing.
pub fn work_hours(record: &AttendanceRecord) -> Result<Option<Duration>, IntegrityViolation> {
    match (record.check_in, record.check_out) {
        (Some(check_in), Some(check_out)) => {
            let worked = check_out - check_in;
            if worked < Duration::zero() {
                Err(IntegrityViolation {
                    record_id: record.id,
                })
            } else {
                Ok(Some(worked))
            }
        }
        _ => Ok(None),
    }
}

/// Presence percentage rounded to one decimal for display.
pub fn rate_percent(present: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = present as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Mon-Fri days in the inclusive range.
pub fn working_days(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = from;
    while day <= to {
        if is_working_day(day) {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// First and last day of the given calendar month.
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

/// Monthly rate: the daily rate averaged over working days in the range.
/// Working days with no check-ins weigh in as zero.
pub fn monthly_rate_percent(
    daily_present: &[(NaiveDate, i64)],
    total_employees: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> f64 {
    let days = working_days(from, to);
    if days == 0 || total_employees == 0 {
        return 0.0;
    }
    let sum: f64 = daily_present
        .iter()
        .filter(|(date, _)| *date >= from && *date <= to && is_working_day(*date))
        .map(|(_, present)| *present as f64 / total_employees as f64 * 100.0)
        .sum();
    let raw = sum / days as f64;
    (raw * 10.0).round() / 10.0
}

const RECORD_COLUMNS: &str = "id, employee_id, date, check_in, check_out, \
     check_in_ip, check_out_ip, check_in_lon, check_in_lat, check_out_lon, check_out_lat, \
     check_in_fingerprint, check_out_fingerprint, \
     check_in_trust, check_in_trust_reason, check_out_trust, check_out_trust_reason, \
     check_in_source, check_out_source";

/// All records for the date; absence is the logical complement. A pure
/// query by design, not cached "today" state.
pub async fn daily_roster(
    pool: &MySqlPool,
    date: NaiveDate,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let sql =
        format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE date = ? ORDER BY check_in ASC");
    sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(date)
        .fetch_all(pool)
        .await
}

/// Exclusive lower bound of an n-day window ending at `today`: dates
/// strictly after it and up to `today` span exactly n days.
pub fn log_window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(days as i64)
}

/// Records inside the n-day window ending at `today`, most recent first.
/// Deterministic for a fixed store: keyed and ordered by the unique
/// (employee, date) pair. Days the employee was absent simply yield no
/// row; older punches never pad the window out.
pub async fn last_n_days_log(
    pool: &MySqlPool,
    employee_id: u64,
    today: NaiveDate,
    n: u32,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance \
         WHERE employee_id = ? AND date > ? AND date <= ? \
         ORDER BY date DESC LIMIT ?"
    );
    sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(employee_id)
        .bind(log_window_start(today, n))
        .bind(today)
        .bind(n)
        .fetch_all(pool)
        .await
}

/// Distinct employees with a check-in over the range, integrity-violating
/// rows excluded.
pub async fn distinct_present(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT employee_id)
        FROM attendance
        WHERE date BETWEEN ? AND ?
          AND check_in IS NOT NULL
          AND (check_out IS NULL OR check_out >= check_in)
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

/// Per-day distinct-present counts over the range, for the monthly average.
pub async fn daily_present_counts(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(NaiveDate, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (NaiveDate, i64)>(
        r#"
        SELECT date, COUNT(DISTINCT employee_id)
        FROM attendance
        WHERE date BETWEEN ? AND ?
          AND check_in IS NOT NULL
          AND (check_out IS NULL OR check_out >= check_in)
        GROUP BY date
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Count of ordering-invariant violations in the range, for the
/// administrator-facing "excluded records" figure.
pub async fn integrity_violations(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM attendance
        WHERE date BETWEEN ? AND ?
          AND check_in IS NOT NULL
          AND check_out IS NOT NULL
          AND check_out < check_in
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(check_in: Option<(u32, u32)>, check_out: Option<(u32, u32)>) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        AttendanceRecord {
            id: 42,
            employee_id: 1000,
            date,
            check_in: check_in.map(|(h, m)| date.and_hms_opt(h, m, 0).unwrap()),
            check_out: check_out.map(|(h, m)| date.and_hms_opt(h, m, 0).unwrap()),
            check_in_ip: None,
            check_out_ip: None,
            check_in_lon: None,
            check_in_lat: None,
            check_out_lon: None,
            check_out_lat: None,
            check_in_fingerprint: None,
            check_out_fingerprint: None,
            check_in_trust: None,
            check_in_trust_reason: None,
            check_out_trust: None,
            check_out_trust_reason: None,
            check_in_source: "original".into(),
            check_out_source: "original".into(),
        }
    }

    #[test]
    fn work_hours_for_a_completed_day() {
        // 08:58 -> 17:31 is 8h33m.
        let worked = work_hours(&record(Some((8, 58)), Some((17, 31))))
            .unwrap()
            .unwrap();
        assert_eq!(worked.num_minutes(), 8 * 60 + 33);
    }

    #[test]
    fn work_hours_is_undefined_while_a_punch_is_missing() {
        assert_eq!(work_hours(&record(Some((8, 58)), None)).unwrap(), None);
        assert_eq!(work_hours(&record(None, None)).unwrap(), None);
    }

    #[test]
    fn inverted_punches_are_an_integrity_error_not_a_negative_duration() {
        let err = work_hours(&record(Some((17, 31)), Some((8, 58)))).unwrap_err();
        assert_eq!(err.record_id, 42);
    }

    #[test]
    fn rate_is_rounded_to_one_decimal() {
        assert_eq!(rate_percent(8, 20), 40.0);
        assert_eq!(rate_percent(1, 3), 33.3);
        assert_eq!(rate_percent(2, 3), 66.7);
        assert_eq!(rate_percent(0, 20), 0.0);
        assert_eq!(rate_percent(20, 20), 100.0);
    }

    #[test]
    fn zero_total_employees_never_divides_by_zero() {
        assert_eq!(rate_percent(5, 0), 0.0);
    }

    #[test]
    fn working_days_skip_weekends() {
        // 2026-01-05 is a Monday; the full week holds 5 working days.
        let mon = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let sun = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        assert_eq!(working_days(mon, sun), 5);
        assert_eq!(working_days(mon, mon), 1);

        let sat = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(working_days(sat, sun), 0);
    }

    #[test]
    fn log_window_spans_exactly_n_days_ending_today() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let start = log_window_start(today, 7);
        // Exclusive bound: the window is 2026-01-02..=2026-01-08.
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!((today - start).num_days(), 7);

        // A punch from months before the window must fall outside it.
        let stale = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        assert!(stale <= start);

        let one = log_window_start(today, 1);
        assert_eq!(one, NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
    }

    #[test]
    fn month_range_covers_whole_months() {
        let (from, to) = month_range(2026, 1).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());

        let (_, to) = month_range(2026, 12).unwrap();
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());

        // Leap February.
        let (_, to) = month_range(2028, 2).unwrap();
        assert_eq!(to, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());

        assert!(month_range(2026, 13).is_none());
    }

    #[test]
    fn monthly_rate_averages_over_working_days() {
        let mon = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let fri = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        // 10 of 10 present on two days, nobody otherwise: 2 * 100 / 5.
        let counts = vec![(mon, 10), (fri, 10)];
        assert_eq!(monthly_rate_percent(&counts, 10, mon, fri), 40.0);
    }

    #[test]
    fn monthly_rate_ignores_weekend_and_out_of_range_counts() {
        let mon = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let fri = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let sat = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let prev_week = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let counts = vec![(mon, 10), (sat, 10), (prev_week, 10)];
        assert_eq!(monthly_rate_percent(&counts, 10, mon, fri), 20.0);
    }

    #[test]
    fn monthly_rate_handles_empty_ranges() {
        let sat = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let sun = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        assert_eq!(monthly_rate_percent(&[], 10, sat, sun), 0.0);
        assert_eq!(monthly_rate_percent(&[], 0, sat, sun), 0.0);
    }
}
