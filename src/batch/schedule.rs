//! Collection date scheduling

use chrono::{Datelike, Duration, NaiveDate};

/// Day of the month collections are normally requested on
pub const COLLECTION_DAY: u32 = 20;

/// Minimum days of notice the payer's bank needs before a collection
pub const MIN_NOTICE_DAYS: i64 = 5;

/// Pick the default collection date relative to `today`.
///
/// Collections target the 20th of the current month. When that leaves
/// less than `min_notice_days` of notice, or is already in the past,
/// the date moves to `today` plus the notice window instead.
pub fn default_collection_date(today: NaiveDate, min_notice_days: i64) -> NaiveDate {
    let wanted = today.with_day(COLLECTION_DAY).unwrap_or(today);
    if wanted.signed_duration_since(today) < Duration::days(min_notice_days) {
        today + Duration::days(min_notice_days)
    } else {
        wanted
    }
}
