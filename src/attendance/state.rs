use crate::model::attendance::{AttendanceRecord, PunchKind};
use derive_more::Display;

/// Per-(employee, date) punch state. CheckedOut is terminal for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    NoPunch,
    CheckedIn,
    CheckedOut,
}

impl DayState {
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => DayState::NoPunch,
            Some(r) if r.check_out.is_some() => DayState::CheckedOut,
            Some(r) if r.check_in.is_some() => DayState::CheckedIn,
            Some(_) => DayState::NoPunch,
        }
    }
}

/// Expected, caller-recoverable outcomes; kept apart from transient
/// infrastructure failures so clients can tell "don't retry" from "retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PunchConflict {
    #[display(fmt = "already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "no active check-in found for today")]
    NotCheckedInYet,
    #[display(fmt = "already checked out today")]
    AlreadyCheckedOut,
}

impl PunchConflict {
    pub fn code(&self) -> &'static str {
        match self {
            PunchConflict::AlreadyCheckedIn => "already-checked-in",
            PunchConflict::NotCheckedInYet => "not-checked-in-yet",
            PunchConflict::AlreadyCheckedOut => "already-checked-out",
        }
    }
}

/// Legal transitions: NoPunch -> CheckedIn -> CheckedOut. The durable
/// enforcement lives in the store (unique key + conditional update); this
/// is the decision table both paths agree on.
pub fn decide(kind: PunchKind, state: DayState) -> Result<(), PunchConflict> {
    match (kind, state) {
        (PunchKind::CheckIn, DayState::NoPunch) => Ok(()),
        (PunchKind::CheckIn, DayState::CheckedIn) => Err(PunchConflict::AlreadyCheckedIn),
        (PunchKind::CheckIn, DayState::CheckedOut) => Err(PunchConflict::AlreadyCheckedIn),
        (PunchKind::CheckOut, DayState::NoPunch) => Err(PunchConflict::NotCheckedInYet),
        (PunchKind::CheckOut, DayState::CheckedIn) => Ok(()),
        (PunchKind::CheckOut, DayState::CheckedOut) => Err(PunchConflict::AlreadyCheckedOut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(check_in: bool, check_out: bool) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        AttendanceRecord {
            id: 1,
            employee_id: 1000,
            date,
            check_in: check_in.then(|| date.and_hms_opt(8, 58, 0).unwrap()),
            check_out: check_out.then(|| date.and_hms_opt(17, 31, 0).unwrap()),
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
    fn state_derivation_from_record_snapshot() {
        assert_eq!(DayState::of(None), DayState::NoPunch);
        assert_eq!(DayState::of(Some(&record(true, false))), DayState::CheckedIn);
        assert_eq!(DayState::of(Some(&record(true, true))), DayState::CheckedOut);
    }

    #[test]
    fn check_in_allowed_only_from_no_punch() {
        assert!(decide(PunchKind::CheckIn, DayState::NoPunch).is_ok());
        assert_eq!(
            decide(PunchKind::CheckIn, DayState::CheckedIn),
            Err(PunchConflict::AlreadyCheckedIn)
        );
        assert_eq!(
            decide(PunchKind::CheckIn, DayState::CheckedOut),
            Err(PunchConflict::AlreadyCheckedIn)
        );
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        assert_eq!(
            decide(PunchKind::CheckOut, DayState::NoPunch),
            Err(PunchConflict::NotCheckedInYet)
        );
    }

    #[test]
    fn checked_out_is_terminal_for_the_day() {
        assert!(decide(PunchKind::CheckOut, DayState::CheckedIn).is_ok());
        assert_eq!(
            decide(PunchKind::CheckOut, DayState::CheckedOut),
            Err(PunchConflict::AlreadyCheckedOut)
        );
    }

    #[test]
    fn conflict_codes_are_stable() {
        assert_eq!(PunchConflict::AlreadyCheckedIn.code(), "already-checked-in");
        assert_eq!(PunchConflict::NotCheckedInYet.code(), "not-checked-in-yet");
        assert_eq!(PunchConflict::AlreadyCheckedOut.code(), "already-checked-out");
    }
}
