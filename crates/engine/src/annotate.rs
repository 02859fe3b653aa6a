//! Quick-entry text composition.
//!
//! "Insert initials" produces a machine-composed text entry: the actor's
//! initials plus the current date in the document's timezone, in the fixed
//! day-month-year display format (e.g. "DS 25-Aug-2026"). The entry is
//! stored as plain text but flagged `machine_composed` so renderers can
//! show it distinctly from hand-typed text.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use signet_core::EngineError;

/// Compose the quick-entry initials text for `now` in the document's
/// timezone.
pub fn initials_entry_text(
    initials: &str,
    utc_offset_minutes: i32,
    now_utc: OffsetDateTime,
) -> Result<String, EngineError> {
    let offset = UtcOffset::from_whole_seconds(utc_offset_minutes * 60).map_err(|_| {
        EngineError::ValidationError(format!("invalid UTC offset: {utc_offset_minutes} minutes"))
    })?;
    let local = now_utc.to_offset(offset);
    let format = format_description!("[day]-[month repr:short]-[year]");
    let date = local
        .format(format)
        .map_err(|e| EngineError::ValidationError(format!("date format: {e}")))?;
    Ok(format!("{} {}", initials, date))
}
