//! Late-entry validation: deciding whether a claimed effective time is in
//! the past, and building the justification metadata.
//!
//! "In past" is computed in the document's timezone: a claimed date
//! strictly before today is in the past; today with a claimed time strictly
//! before the current time is in the past; anything else is not. A claimed
//! time strictly after now is future-dated and rejected unconditionally;
//! an entry cannot be dated ahead, whatever the reason says.

use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time, UtcOffset};

use signet_core::{EngineError, LateEntry};

/// Where a claimed effective time falls relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimedTime {
    InPast,
    /// Equal to the current minute-of-truth; not late, not future.
    Current,
    Future,
}

/// Classify a claimed date/time against `now_utc`, both interpreted in the
/// document's fixed UTC offset (given in minutes).
pub fn classify(
    claimed_date: Date,
    claimed_time: Time,
    utc_offset_minutes: i32,
    now_utc: OffsetDateTime,
) -> Result<ClaimedTime, EngineError> {
    let offset = offset_from_minutes(utc_offset_minutes)?;
    let now_local = now_utc.to_offset(offset);

    let in_past = claimed_date < now_local.date()
        || (claimed_date == now_local.date() && claimed_time < now_local.time());
    let in_future = claimed_date > now_local.date()
        || (claimed_date == now_local.date() && claimed_time > now_local.time());

    Ok(if in_past {
        ClaimedTime::InPast
    } else if in_future {
        ClaimedTime::Future
    } else {
        ClaimedTime::Current
    })
}

/// Validate a claimed effective time and build the `LateEntry` metadata to
/// attach, if any.
///
/// - Future-dated: rejected regardless of reason.
/// - In the past: requires a non-empty reason; returns `Some(LateEntry)`.
/// - Current: not a late entry; returns `None`.
pub fn build_late_entry(
    claimed_date: Date,
    claimed_time: Time,
    reason: &str,
    utc_offset_minutes: i32,
    now_utc: OffsetDateTime,
) -> Result<Option<LateEntry>, EngineError> {
    match classify(claimed_date, claimed_time, utc_offset_minutes, now_utc)? {
        ClaimedTime::Future => Err(EngineError::ValidationError(
            "entry cannot be dated ahead of the current time".into(),
        )),
        ClaimedTime::Current => Ok(None),
        ClaimedTime::InPast => {
            if reason.trim().is_empty() {
                return Err(EngineError::ValidationError(
                    "late entry requires a non-empty reason".into(),
                ));
            }
            let offset = offset_from_minutes(utc_offset_minutes)?;
            let claimed_at = claimed_date
                .with_time(claimed_time)
                .assume_offset(offset)
                .format(&Rfc3339)
                .map_err(|e| EngineError::ValidationError(format!("bad claimed time: {e}")))?;
            Ok(Some(LateEntry {
                claimed_at,
                reason: reason.to_string(),
            }))
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Result<UtcOffset, EngineError> {
    UtcOffset::from_whole_seconds(minutes * 60)
        .map_err(|_| EngineError::ValidationError(format!("invalid UTC offset: {minutes} minutes")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    // Now: 2026-08-25 12:00 UTC.
    const NOW: OffsetDateTime = datetime!(2026-08-25 12:00:00 UTC);

    #[test]
    fn yesterday_is_in_past() {
        let c = classify(date!(2026 - 08 - 24), time!(23:59), 0, NOW).unwrap();
        assert_eq!(c, ClaimedTime::InPast);
    }

    #[test]
    fn today_earlier_time_is_in_past() {
        let c = classify(date!(2026 - 08 - 25), time!(11:59), 0, NOW).unwrap();
        assert_eq!(c, ClaimedTime::InPast);
    }

    #[test]
    fn today_later_time_is_future() {
        let c = classify(date!(2026 - 08 - 25), time!(12:01), 0, NOW).unwrap();
        assert_eq!(c, ClaimedTime::Future);
    }

    #[test]
    fn timezone_shifts_the_day_boundary() {
        // At UTC noon on the 25th it is already 02:00 on the 26th at +14:00,
        // so the whole of the 25th is in the past there.
        let c = classify(date!(2026 - 08 - 25), time!(23:00), 14 * 60, NOW).unwrap();
        assert_eq!(c, ClaimedTime::InPast);

        // At -11:00 it is still 01:00 on the 25th; 23:00 today is future.
        let c = classify(date!(2026 - 08 - 25), time!(23:00), -11 * 60, NOW).unwrap();
        assert_eq!(c, ClaimedTime::Future);
    }

    #[test]
    fn past_claim_without_reason_is_rejected() {
        let err = build_late_entry(date!(2026 - 08 - 20), time!(09:00), "", 0, NOW).unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[test]
    fn past_claim_with_reason_is_accepted() {
        let late = build_late_entry(
            date!(2026 - 08 - 20),
            time!(09:00),
            "instrument offline during run",
            0,
            NOW,
        )
        .unwrap()
        .expect("late entry");
        assert_eq!(late.claimed_at, "2026-08-20T09:00:00Z");
        assert_eq!(late.reason, "instrument offline during run");
    }

    #[test]
    fn future_claim_is_rejected_even_with_reason() {
        let err = build_late_entry(
            date!(2026 - 08 - 26),
            time!(09:00),
            "a very good reason",
            0,
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[test]
    fn current_moment_is_not_late() {
        let late = build_late_entry(date!(2026 - 08 - 25), time!(12:00), "", 0, NOW).unwrap();
        assert!(late.is_none());
    }
}
