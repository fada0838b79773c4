//! Deadline arithmetic.
//!
//! Pure functions only: everything here is determined by its arguments,
//! which keeps it easy to property-test.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ValidationError;

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Largest UTC offset, in minutes either side, that deadline input accepts.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 23 * 60 + 59;

/// Time left until a deadline, clamped at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Remaining {
    /// Whole hours left.
    pub hours: u64,
    /// Minutes left beyond `hours` (0-59).
    pub minutes: u64,
}

/// Returns the stored deadline, or derives one from the creation time.
///
/// A derived deadline (`created_at + days_remaining` days) must be persisted
/// by the caller so it is not recomputed on every pass.
#[must_use]
pub fn resolve_deadline(
    created_at: DateTime<Utc>,
    stored: Option<DateTime<Utc>>,
    days_remaining: u32,
) -> DateTime<Utc> {
    stored.unwrap_or_else(|| add_days(created_at, days_remaining))
}

/// Adds whole days, saturating at the largest representable instant.
#[must_use]
pub fn add_days(at: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    at.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time remaining until `deadline` as seen at `now`.
#[must_use]
pub fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Remaining {
    let total_minutes = u64::try_from((deadline - now).num_minutes()).unwrap_or(0);
    Remaining {
        hours: total_minutes / 60,
        minutes: total_minutes % 60,
    }
}

/// An active task whose deadline has been reached is overdue.
#[must_use]
pub fn is_overdue(deadline: DateTime<Utc>, completed: bool, now: DateTime<Utc>) -> bool {
    !completed && deadline <= now
}

/// Whole days from `now` until `deadline`, rounded up. Zero if already past.
#[must_use]
pub fn duration_days(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let Ok(millis) = u64::try_from((deadline - now).num_milliseconds()) else {
        return 0;
    };
    u32::try_from(millis.div_ceil(MILLIS_PER_DAY)).unwrap_or(u32::MAX)
}

/// Reset interval for a task due at `deadline`: [`duration_days`], at least 1.
#[must_use]
pub fn original_duration_days(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    duration_days(deadline, now).max(1)
}

/// Parses a `YYYY-MM-DD` date and `HH:MM` time given in a fixed UTC offset.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedDate`] or [`ValidationError::MalformedTime`]
/// for badly shaped input, [`ValidationError::OutOfRange`] for components
/// outside their range, [`ValidationError::NoSuchDate`] for dates that do
/// not exist in the calendar, and [`ValidationError::OffsetOutOfRange`] if
/// `utc_offset_minutes` exceeds [`MAX_UTC_OFFSET_MINUTES`].
pub fn parse_deadline(
    date: &str,
    time: &str,
    utc_offset_minutes: i32,
) -> Result<DateTime<Utc>, ValidationError> {
    if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&utc_offset_minutes) {
        return Err(ValidationError::OffsetOutOfRange(utc_offset_minutes));
    }
    let date = date.trim();
    let time = time.trim();
    if !has_shape(date, &[4, 7], b'-', 10) {
        return Err(ValidationError::MalformedDate(date.to_string()));
    }
    if !has_shape(time, &[2], b':', 5) {
        return Err(ValidationError::MalformedTime(time.to_string()));
    }

    let year = component(date, 0..4)?;
    let month = component(date, 5..7)?;
    let day = component(date, 8..10)?;
    let hour = component(time, 0..2)?;
    let minute = component(time, 3..5)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
        return Err(ValidationError::OutOfRange);
    }

    let year = i32::try_from(year).map_err(|_| ValidationError::OutOfRange)?;
    let naive_date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ValidationError::NoSuchDate(date.to_string()))?;
    let naive_time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ValidationError::OutOfRange)?;

    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .ok_or(ValidationError::OffsetOutOfRange(utc_offset_minutes))?;
    NaiveDateTime::new(naive_date, naive_time)
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ValidationError::OutOfRange)
}

/// Checks length, separator positions, and that every other byte is a digit.
fn has_shape(value: &str, separators: &[usize], separator: u8, len: usize) -> bool {
    value.len() == len
        && value.bytes().enumerate().all(|(i, b)| {
            if separators.contains(&i) {
                b == separator
            } else {
                b.is_ascii_digit()
            }
        })
}

fn component(value: &str, range: std::ops::Range<usize>) -> Result<u32, ValidationError> {
    value
        .get(range)
        .and_then(|digits| digits.parse().ok())
        .ok_or(ValidationError::OutOfRange)
}
