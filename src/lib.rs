//! # Cronex
//!
//! Cronex parses cron expressions, checks timestamps against them and searches for the next
//! time an expression fires. A small driver runs named callbacks on a worker pool when their
//! expressions come due.
//!
//! ## Example
//!
//! ```rust
//! use std::str::FromStr as _;
//!
//! use chrono::{Duration, TimeZone as _, Utc};
//! use cronex::Cron;
//!
//! // 00:00 every Friday
//! let cron = Cron::from_str("0 0 * * FRI").expect("Successful parsing");
//!
//! let from = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
//! let next = cron
//!     .find_next_occurrence(&from, &(from + Duration::days(366)))
//!     .unwrap();
//!
//! assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 4, 0, 0, 0).unwrap());
//! ```
//!
//! ## Pattern
//!
//! ```text
//! ┌──────────────── second (0 - 59, only when enabled on the parser)
//! │ ┌────────────── minute (0 - 59)
//! │ │ ┌──────────── hour (0 - 23)
//! │ │ │ ┌────────── day of month (1 - 31)
//! │ │ │ │ ┌──────── month (1 - 12, JAN-DEC)
//! │ │ │ │ │ ┌────── day of week (0 - 6, SUN-SAT; 7 is Sunday too)
//! │ │ │ │ │ │ ┌──── year (1970 - 2099, optional)
//! │ │ │ │ │ │ │
//! * * * * * * *
//! ```
//!
//! | Field        | Allowed values  | Special characters |
//! | ------------ | --------------- | ------------------ |
//! | Seconds      | 0-59            | * , - /            |
//! | Minutes      | 0-59            | * , - /            |
//! | Hours        | 0-23            | * , - /            |
//! | Day of Month | 1-31            | * , - / ? L W      |
//! | Month        | 1-12 or JAN-DEC | * , - /            |
//! | Day of Week  | 0-7 or SUN-SAT  | * , - / ? L #      |
//! | Year         | 1970-2099       | * , - /            |
//!
//! When both day fields restrict the day, a date matches if either of them does. The
//! aliases `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`, `@midnight`, `@hourly`
//! and `@reboot` are understood as well.

pub mod component;
pub mod entry;
pub mod errors;
pub mod iterator;
pub mod keywords;
pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod scheduler;
mod threadpool;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use strum::EnumIs;

pub use component::{CronComponent, FieldKind};
pub use entry::Entry;
pub use errors::CronError;
pub use iterator::CronIterator;
pub use lexer::TokenKind;
pub use parser::{CronParser, CronParserBuilder};
pub use pattern::CronPattern;
pub use scheduler::{CronScheduler, SchedulerConfig, SchedulerConfigBuilder};

/// Earliest year an explicit year field can name.
pub const YEAR_LOWER_LIMIT: u32 = 1970;
/// Latest year an explicit year field can name.
pub const YEAR_UPPER_LIMIT: u32 = 2099;

#[derive(Debug, Clone, Copy)]
enum TimeComponent {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl TimeComponent {
    fn coarser(self) -> Self {
        match self {
            TimeComponent::Second => TimeComponent::Minute,
            TimeComponent::Minute => TimeComponent::Hour,
            TimeComponent::Hour => TimeComponent::Day,
            TimeComponent::Day => TimeComponent::Month,
            TimeComponent::Month | TimeComponent::Year => TimeComponent::Year,
        }
    }
}

/// The `@reboot` expression: matches the first time it is checked and never again.
#[derive(Debug)]
pub struct RebootOnce {
    pending: AtomicBool,
}

impl RebootOnce {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(true),
        }
    }

    /// True exactly once over the lifetime of this value.
    pub fn fire(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn has_fired(&self) -> bool {
        !self.pending.load(Ordering::Acquire)
    }
}

impl Default for RebootOnce {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RebootOnce {
    fn clone(&self) -> Self {
        Self {
            pending: AtomicBool::new(self.pending.load(Ordering::Acquire)),
        }
    }
}

// All `@reboot` expressions describe the same schedule.
impl PartialEq for RebootOnce {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for RebootOnce {}

impl Hash for RebootOnce {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// A parsed cron expression.
///
/// Use [`FromStr`] (or [`CronParser`] for non-default options) to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String"))]
#[cfg_attr(feature = "serde", serde(into = "String"))]
pub enum Cron {
    Pattern(CronPattern),
    Reboot(RebootOnce),
}

impl Cron {
    /// `0 0 1 1 *`
    pub fn yearly() -> Self {
        Self::builtin("@yearly")
    }

    /// `0 0 1 1 *`
    pub fn annually() -> Self {
        Self::builtin("@annually")
    }

    /// `0 0 1 * *`
    pub fn monthly() -> Self {
        Self::builtin("@monthly")
    }

    /// `0 0 * * 0`
    pub fn weekly() -> Self {
        Self::builtin("@weekly")
    }

    /// `0 0 * * *`
    pub fn daily() -> Self {
        Self::builtin("@daily")
    }

    /// `0 0 * * *`
    pub fn midnight() -> Self {
        Self::builtin("@midnight")
    }

    /// `0 * * * *`
    pub fn hourly() -> Self {
        Self::builtin("@hourly")
    }

    pub fn reboot() -> Self {
        Cron::Reboot(RebootOnce::new())
    }

    // Alias expansions are fixed patterns, parsing them never fails.
    fn builtin(alias: &str) -> Self {
        CronParser::new()
            .parse(alias)
            .expect("built-in alias expands to a valid pattern")
    }

    /// Evaluates if a given `DateTime` matches the expression.
    ///
    /// The wall-clock reading of `time` is compared field by field. Without a seconds field
    /// any second of a matching minute matches.
    ///
    /// A `@reboot` expression matches on its first check only.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr as _;
    ///
    /// use chrono::{TimeZone as _, Utc};
    /// use cronex::Cron;
    ///
    /// let cron = Cron::from_str("0 9 1 1 *").unwrap();
    ///
    /// assert!(cron.is_time_matching(&Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap()));
    /// assert!(!cron.is_time_matching(&Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap()));
    /// ```
    pub fn is_time_matching<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        match self {
            Cron::Pattern(pattern) => pattern.is_time_matching(time),
            Cron::Reboot(reboot) => reboot.fire(),
        }
    }

    /// Finds the earliest time strictly after `from` that matches the expression.
    ///
    /// The search works on wall-clock time in `from`'s time zone. Wall-clock times that occur
    /// twice resolve to the earliest instant after `from`; times skipped by a transition are
    /// passed over.
    ///
    /// # Errors
    ///
    /// - [`CronError::TimeSearchLimitExceeded`] if nothing matches up to `to`.
    /// - [`CronError::NoNextOccurrence`] for `@reboot`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone as _, Utc};
    /// use cronex::{Cron, CronParser};
    ///
    /// let cron = CronParser::builder()
    ///     .seconds(true)
    ///     .build()
    ///     .parse("0 18 * * * 5")
    ///     .unwrap();
    ///
    /// let from = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
    /// let to = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
    ///
    /// let next = cron.find_next_occurrence(&from, &to).unwrap();
    /// assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 4, 0, 18, 0).unwrap());
    /// ```
    pub fn find_next_occurrence<Tz: TimeZone>(
        &self,
        from: &DateTime<Tz>,
        to: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, CronError> {
        let pattern = match self {
            Cron::Pattern(pattern) => pattern,
            Cron::Reboot(_) => return Err(CronError::NoNextOccurrence(self.as_str().to_string())),
        };

        let timezone = from.timezone();
        // Local readings can run ahead of `to` inside a repeated hour.
        let until = to
            .with_timezone(&timezone)
            .naive_local()
            .checked_add_signed(Duration::days(1))
            .unwrap_or(NaiveDateTime::MAX);
        let step = if pattern.has_seconds() {
            TimeComponent::Second
        } else {
            TimeComponent::Minute
        };

        let start = increment_time_component(from.naive_local(), step)?;
        let ahead = next_instant(pattern, &timezone, from, start, &until, step);
        let repeated = repeated_instant(pattern, &timezone, from, step)?;

        let found = match (ahead, repeated) {
            (Ok(ahead), Some(repeated)) => ahead.min(repeated),
            (Err(_), Some(repeated)) => repeated,
            (ahead, None) => ahead?,
        };
        if found > *to {
            return Err(CronError::TimeSearchLimitExceeded);
        }
        Ok(found)
    }

    /// Iterates over the occurrences after `start_after`, up to and including `until`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr as _;
    ///
    /// use chrono::{TimeZone as _, Utc};
    /// use cronex::Cron;
    ///
    /// let cron = Cron::from_str("0 12 * * MON").unwrap();
    ///
    /// let start = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
    /// let until = Utc.with_ymd_and_hms(2025, 7, 31, 0, 0, 0).unwrap();
    ///
    /// let mondays: Vec<u32> = cron
    ///     .iter_after(start, until)
    ///     .map(|time| chrono::Datelike::day(&time))
    ///     .collect();
    /// assert_eq!(mondays, vec![7, 14, 21, 28]);
    /// ```
    pub fn iter_after<Tz: TimeZone>(
        &self,
        start_after: DateTime<Tz>,
        until: DateTime<Tz>,
    ) -> CronIterator<Tz> {
        CronIterator::new(self.clone(), start_after, until)
    }

    /// The expression as written, the expansion for aliases, or `@reboot`.
    pub fn as_str(&self) -> &str {
        match self {
            Cron::Pattern(pattern) => pattern.as_str(),
            Cron::Reboot(_) => "@reboot",
        }
    }

    /// The parsed fields, unless this is `@reboot`.
    pub fn pattern(&self) -> Option<&CronPattern> {
        match self {
            Cron::Pattern(pattern) => Some(pattern),
            Cron::Reboot(_) => None,
        }
    }

    pub fn has_seconds(&self) -> bool {
        self.pattern().is_some_and(CronPattern::has_seconds)
    }
}

impl FromStr for Cron {
    type Err = CronError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        CronParser::new().parse(pattern)
    }
}

impl TryFrom<String> for Cron {
    type Error = CronError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl TryFrom<&str> for Cron {
    type Error = CronError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl From<Cron> for String {
    fn from(value: Cron) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Cron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Earliest instant after `from` reached by walking wall-clock time forward from `candidate`.
fn next_instant<Tz: TimeZone>(
    pattern: &CronPattern,
    timezone: &Tz,
    from: &DateTime<Tz>,
    mut candidate: NaiveDateTime,
    until: &NaiveDateTime,
    step: TimeComponent,
) -> Result<DateTime<Tz>, CronError> {
    loop {
        let naive = find_next_naive(pattern, candidate, until)?;

        let found = match timezone.from_local_datetime(&naive) {
            LocalResult::Single(time) => (time > *from).then_some(time),
            LocalResult::Ambiguous(first, second) => {
                let (earliest, latest) = ordered(first, second);
                [earliest, latest].into_iter().find(|time| time > from)
            }
            LocalResult::None => None,
        };

        match found {
            Some(time) => return Ok(time),
            None => candidate = increment_time_component(naive, step)?,
        }
    }
}

// When `from` is the first pass through a repeated hour, the wall-clock readings up to
// its own come around again. Returns the earliest matching second pass after `from`.
fn repeated_instant<Tz: TimeZone>(
    pattern: &CronPattern,
    timezone: &Tz,
    from: &DateTime<Tz>,
    step: TimeComponent,
) -> Result<Option<DateTime<Tz>>, CronError> {
    let reading = from.naive_local();
    let LocalResult::Ambiguous(first, second) = timezone.from_local_datetime(&reading) else {
        return Ok(None);
    };
    let (earliest, latest) = ordered(first, second);
    if earliest != *from {
        return Ok(None);
    }

    // Second passes of readings after `reading - overlap` fall after `from`.
    let overlap = latest.signed_duration_since(&earliest);
    let Some(start) = reading.checked_sub_signed(overlap) else {
        return Ok(None);
    };
    let mut candidate = increment_time_component(start, step)?;

    loop {
        let naive = match find_next_naive(pattern, candidate, &reading) {
            Ok(naive) => naive,
            Err(CronError::TimeSearchLimitExceeded) => return Ok(None),
            Err(error) => return Err(error),
        };
        if let LocalResult::Ambiguous(first, second) = timezone.from_local_datetime(&naive) {
            let (_, latest) = ordered(first, second);
            if latest > *from {
                return Ok(Some(latest));
            }
        }
        candidate = increment_time_component(naive, step)?;
    }
}

fn ordered<Tz: TimeZone>(first: DateTime<Tz>, second: DateTime<Tz>) -> (DateTime<Tz>, DateTime<Tz>) {
    if first <= second {
        (first, second)
    } else {
        (second, first)
    }
}

// Walks forward from `candidate` until every field matches, without leaving `until`.
fn find_next_naive(
    pattern: &CronPattern,
    mut candidate: NaiveDateTime,
    until: &NaiveDateTime,
) -> Result<NaiveDateTime, CronError> {
    loop {
        if candidate > *until {
            return Err(CronError::TimeSearchLimitExceeded);
        }
        if !advance_to_match(pattern, &mut candidate)? {
            return Ok(candidate);
        }
    }
}

// One pass from the coarsest unit to the finest. Returns true after the first adjustment,
// which always moves forward and clears every finer unit.
fn advance_to_match(pattern: &CronPattern, time: &mut NaiveDateTime) -> Result<bool, CronError> {
    if !pattern.year_match(time.year()) {
        let from = u32::try_from(time.year()).unwrap_or(0);
        let year = pattern
            .years()
            .next_value(from)
            .ok_or(CronError::TimeSearchLimitExceeded)?;
        *time = set_time_component(*time, TimeComponent::Year, year)?;
        return Ok(true);
    }

    if advance_field(time, pattern.months(), TimeComponent::Month)? {
        return Ok(true);
    }

    if !pattern.day_match(time.date()) {
        *time = increment_time_component(*time, TimeComponent::Day)?;
        return Ok(true);
    }

    Ok(advance_field(time, pattern.hours(), TimeComponent::Hour)?
        || advance_field(time, pattern.minutes(), TimeComponent::Minute)?
        || advance_field(time, pattern.seconds(), TimeComponent::Second)?)
}

// Moves to the component's next accepted value, carrying into the coarser unit when the
// current one has none left.
fn advance_field(
    time: &mut NaiveDateTime,
    component: &CronComponent,
    unit: TimeComponent,
) -> Result<bool, CronError> {
    let current = match unit {
        TimeComponent::Second => time.second(),
        TimeComponent::Minute => time.minute(),
        TimeComponent::Hour => time.hour(),
        TimeComponent::Day => time.day(),
        TimeComponent::Month => time.month(),
        TimeComponent::Year => u32::try_from(time.year()).unwrap_or(0),
    };

    match component.next_value(current) {
        Some(value) if value == current => Ok(false),
        Some(value) => {
            *time = set_time_component(*time, unit, value)?;
            Ok(true)
        }
        None => {
            *time = increment_time_component(*time, unit.coarser())?;
            Ok(true)
        }
    }
}

// Sets one unit and zeroes every finer one.
fn set_time_component(
    time: NaiveDateTime,
    component: TimeComponent,
    value: u32,
) -> Result<NaiveDateTime, CronError> {
    let date = time.date();
    let updated = match component {
        TimeComponent::Year => i32::try_from(value)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .and_then(|date| date.and_hms_opt(0, 0, 0)),
        TimeComponent::Month => NaiveDate::from_ymd_opt(date.year(), value, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0)),
        TimeComponent::Day => NaiveDate::from_ymd_opt(date.year(), date.month(), value)
            .and_then(|date| date.and_hms_opt(0, 0, 0)),
        TimeComponent::Hour => date.and_hms_opt(value, 0, 0),
        TimeComponent::Minute => date.and_hms_opt(time.hour(), value, 0),
        TimeComponent::Second => date.and_hms_opt(time.hour(), time.minute(), value),
    };
    updated.ok_or(CronError::TimeSearchLimitExceeded)
}

// Moves to the start of the next unit, dropping anything finer (including nanoseconds).
fn increment_time_component(
    time: NaiveDateTime,
    component: TimeComponent,
) -> Result<NaiveDateTime, CronError> {
    let date = time.date();
    let updated = match component {
        TimeComponent::Year => date
            .year()
            .checked_add(1)
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .and_then(|date| date.and_hms_opt(0, 0, 0)),
        TimeComponent::Month => {
            let (year, month) = if date.month() == 12 {
                (date.year().checked_add(1), 1)
            } else {
                (Some(date.year()), date.month() + 1)
            };
            year.and_then(|year| NaiveDate::from_ymd_opt(year, month, 1))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }
        TimeComponent::Day => date.succ_opt().and_then(|date| date.and_hms_opt(0, 0, 0)),
        TimeComponent::Hour => date
            .and_hms_opt(time.hour(), 0, 0)
            .and_then(|time| time.checked_add_signed(Duration::hours(1))),
        TimeComponent::Minute => date
            .and_hms_opt(time.hour(), time.minute(), 0)
            .and_then(|time| time.checked_add_signed(Duration::minutes(1))),
        TimeComponent::Second => date
            .and_hms_opt(time.hour(), time.minute(), time.second())
            .and_then(|time| time.checked_add_signed(Duration::seconds(1))),
    };
    updated.ok_or(CronError::TimeSearchLimitExceeded)
}
