//! Logical-day attribution under the 4 AM boundary. Moments between
//! midnight and 03:59 belong to the previous calendar day.

use crate::domain::models::{SplitPart, StudyRecord, minutes_of_day};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

const BOUNDARY_HOUR: u32 = 4;
const BOUNDARY_MINUTES: i64 = 4 * 60;
const BOUNDARY_CLOCK: &str = "04:00";

pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

pub fn parse_day_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label, "%Y/%m/%d").ok()
}

/// Logical day label of a local wall-clock moment.
pub fn logical_date(local: NaiveDateTime) -> String {
    let mut day = local.date();
    if local.hour() < BOUNDARY_HOUR {
        day = day.pred_opt().unwrap_or(day);
    }
    format_day(day)
}

/// Logical day label of an instant as seen in the configured timezone.
pub fn logical_date_now(now: DateTime<Utc>, time_zone: Tz) -> String {
    logical_date(now.with_timezone(&time_zone).naive_local())
}

/// Logical day a stored `(date, startTime)` pair belongs to, for grouping
/// persisted records without touching their stored date.
///
/// The hour defaults to 12 when the time is absent or unreadable, so a
/// date-only record counts as daytime instead of sliding to the previous
/// day. An unreadable date comes back normalized but otherwise verbatim.
pub fn belonging_date(date_str: &str, time_str: Option<&str>) -> String {
    let normalized = normalize_date_part(date_str);
    let Some(date) = parse_day_label(&normalized) else {
        return normalized;
    };

    let hour = time_str.and_then(leading_hour).unwrap_or(12);
    let day = if hour < BOUNDARY_HOUR {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    };
    format_day(day)
}

/// Split a record that starts in `[00:00, 04:00)` and ends at or after
/// `04:00` into its before/after halves. View-time only; everything else
/// passes through unchanged.
pub fn split_at_boundary(record: &StudyRecord) -> Vec<StudyRecord> {
    let (Some(start), Some(end)) = (
        minutes_of_day(&record.start_time),
        minutes_of_day(&record.end_time),
    ) else {
        return vec![record.clone()];
    };

    if start < BOUNDARY_MINUTES && end >= BOUNDARY_MINUTES {
        let mut before = record.clone();
        before.end_time = BOUNDARY_CLOCK.to_string();
        before.duration = BOUNDARY_MINUTES - start;
        before.split = Some(SplitPart::Before);

        let mut after = record.clone();
        after.start_time = BOUNDARY_CLOCK.to_string();
        after.duration = end - BOUNDARY_MINUTES;
        after.split = Some(SplitPart::After);

        return vec![before, after];
    }

    vec![record.clone()]
}

/// The view every aggregation and listing read must consume instead of the
/// raw mirror.
pub fn expand_records(records: &[StudyRecord]) -> Vec<StudyRecord> {
    records.iter().flat_map(split_at_boundary).collect()
}

fn normalize_date_part(raw: &str) -> String {
    raw.trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or("")
        .replace('-', "/")
}

fn leading_hour(time_str: &str) -> Option<u32> {
    time_str.split(':').next()?.trim().parse::<u32>().ok()
}
