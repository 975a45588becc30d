use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};

use crate::component::CronComponent;

/// A parsed field-based cron expression.
///
/// Built by [`CronParser`](crate::parser::CronParser); the fields are read through accessors
/// and never change after construction.
#[derive(Debug, Clone)]
pub struct CronPattern {
    pub(crate) source: String,

    pub(crate) seconds: CronComponent,
    pub(crate) minutes: CronComponent,
    pub(crate) hours: CronComponent,
    pub(crate) days: CronComponent,
    pub(crate) months: CronComponent,
    pub(crate) days_of_week: CronComponent,
    pub(crate) years: CronComponent,

    // Parser configuration the expression was built with.
    pub(crate) with_seconds: bool,
    pub(crate) one_based_day_of_week: bool,
    pub(crate) allow_both_day_fields: bool,
}

impl CronPattern {
    pub fn seconds(&self) -> &CronComponent {
        &self.seconds
    }

    pub fn minutes(&self) -> &CronComponent {
        &self.minutes
    }

    pub fn hours(&self) -> &CronComponent {
        &self.hours
    }

    pub fn days(&self) -> &CronComponent {
        &self.days
    }

    pub fn months(&self) -> &CronComponent {
        &self.months
    }

    pub fn days_of_week(&self) -> &CronComponent {
        &self.days_of_week
    }

    pub fn years(&self) -> &CronComponent {
        &self.years
    }

    /// The expression as written, or the expansion for an `@alias`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the expression was parsed with a leading seconds field.
    pub fn has_seconds(&self) -> bool {
        self.with_seconds
    }

    pub fn is_one_based_day_of_week(&self) -> bool {
        self.one_based_day_of_week
    }

    pub fn allows_both_day_fields(&self) -> bool {
        self.allow_both_day_fields
    }

    /// Checks the wall-clock reading of `time` against every field.
    pub fn is_time_matching<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        self.matches_naive(&time.naive_local())
    }

    pub(crate) fn matches_naive(&self, time: &NaiveDateTime) -> bool {
        self.year_match(time.year())
            && self.months.contains(time.month())
            && self.day_match(time.date())
            && self.hours.contains(time.hour())
            && self.minutes.contains(time.minute())
            && self.seconds.contains(time.second())
    }

    pub(crate) fn year_match(&self, year: i32) -> bool {
        self.years.is_full_range()
            || u32::try_from(year).is_ok_and(|year| self.years.contains(year))
    }

    /// Combines both day fields: ORed when both restrict the day, ANDed otherwise.
    pub fn day_match(&self, date: NaiveDate) -> bool {
        let day_of_month = self.days.matches_date(date);
        let day_of_week = self.days_of_week.matches_date(date);

        if self.days.is_restricted() && self.days_of_week.is_restricted() {
            day_of_month || day_of_week
        } else {
            day_of_month && day_of_week
        }
    }

    fn fields(&self) -> [&CronComponent; 7] {
        [
            &self.seconds,
            &self.minutes,
            &self.hours,
            &self.days,
            &self.months,
            &self.days_of_week,
            &self.years,
        ]
    }
}

impl fmt::Display for CronPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// Configuration echoes are left out: two expressions with the same source and fields
// schedule identically.
impl PartialEq for CronPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.fields() == other.fields()
    }
}

impl Eq for CronPattern {}

impl Hash for CronPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.fields().hash(state);
    }
}
