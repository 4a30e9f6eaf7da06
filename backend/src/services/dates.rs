//! Calendar-day helpers. All dates are UTC calendar days.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Every calendar day from `start` through `end` inclusive. Empty when
/// `end` precedes `start`.
pub fn expand_days(start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// Day-expansion of a timestamp range, using the UTC date of each end.
pub fn expand_range(start: DateTime<Utc>, end: DateTime<Utc>) -> BTreeSet<NaiveDate> {
    expand_days(start.date_naive(), end.date_naive())
}

/// Requested days that also appear in `taken`.
pub fn clashing_days<I>(requested: &BTreeSet<NaiveDate>, taken: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    taken.into_iter().filter(|day| requested.contains(day)).collect()
}

/// Midnight UTC at the start of `day`.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}
