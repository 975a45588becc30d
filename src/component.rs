use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use strum::EnumIs;

/// Field-specific modifiers on top of the plain value set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum FieldKind {
    Generic,
    Month,
    DayOfMonth {
        last_day: bool,
        nearest_weekday: Option<u32>,
        unspecified: bool,
    },
    DayOfWeek {
        /// Weekdays that match only on their last occurrence in the month.
        last: BTreeSet<u32>,
        /// Weekday to the ordinals (1-5) of its occurrences that match.
        nth: BTreeMap<u32, BTreeSet<u32>>,
        unspecified: bool,
        /// Native numbering also accepts 7 for Sunday.
        sunday_as_seven: bool,
    },
}

impl FieldKind {
    pub fn day_of_month() -> Self {
        FieldKind::DayOfMonth {
            last_day: false,
            nearest_weekday: None,
            unspecified: false,
        }
    }

    pub fn day_of_week(sunday_as_seven: bool) -> Self {
        FieldKind::DayOfWeek {
            last: BTreeSet::new(),
            nth: BTreeMap::new(),
            unspecified: false,
            sunday_as_seven,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Values {
    All,
    Set(BTreeSet<u32>),
}

/// One field of a cron expression: the values it accepts within `[min, max]`.
///
/// A component is either *full range*, matching everything without storing it, or an
/// ordered set of concrete values. A new component is the empty set and matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CronComponent {
    min: u32,
    max: u32,
    values: Values,
    kind: FieldKind,
}

impl CronComponent {
    pub(crate) fn new(min: u32, max: u32, kind: FieldKind) -> Self {
        Self {
            min,
            max,
            values: Values::Set(BTreeSet::new()),
            kind,
        }
    }

    pub(crate) fn full(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            values: Values::All,
            kind: FieldKind::Generic,
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_full_range(&self) -> bool {
        self.values == Values::All
    }

    /// Full range matches any value, including years past the declared maximum.
    pub fn contains(&self, value: u32) -> bool {
        match &self.values {
            Values::All => true,
            Values::Set(set) => set.contains(&value),
        }
    }

    /// The values in ascending order.
    pub fn values(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match &self.values {
            Values::All => Box::new(self.min..=self.max),
            Values::Set(set) => Box::new(set.iter().copied()),
        }
    }

    /// The smallest accepted value that is `>= from`.
    pub fn next_value(&self, from: u32) -> Option<u32> {
        match &self.values {
            Values::All => (from <= self.max).then(|| from.max(self.min)),
            Values::Set(set) => set.range(from..).next().copied(),
        }
    }

    /// The `?` placeholder was used (day fields only).
    pub fn is_unspecified(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::DayOfMonth {
                unspecified: true,
                ..
            } | FieldKind::DayOfWeek {
                unspecified: true,
                ..
            }
        )
    }

    /// False when the day predicate holds for every date, i.e. the field is `?` or a
    /// plain full range.
    pub(crate) fn is_restricted(&self) -> bool {
        if self.is_unspecified() {
            return false;
        }
        match &self.kind {
            FieldKind::DayOfMonth {
                last_day,
                nearest_weekday,
                ..
            } => !self.is_full_range() || *last_day || nearest_weekday.is_some(),
            _ => !self.is_full_range(),
        }
    }

    /// Evaluates a day field against a calendar date.
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        match &self.kind {
            FieldKind::DayOfMonth {
                last_day,
                nearest_weekday,
                unspecified,
            } => {
                if *unspecified {
                    true
                } else if *last_day {
                    Some(date.day()) == last_day_of_month(date.year(), date.month())
                } else if let Some(day) = nearest_weekday {
                    nearest_weekday_in_month(date.year(), date.month(), *day) == Some(date.day())
                } else {
                    self.contains(date.day())
                }
            }
            FieldKind::DayOfWeek {
                last,
                nth,
                unspecified,
                ..
            } => {
                if *unspecified {
                    return true;
                }
                let weekday = date.weekday().num_days_from_sunday();
                let is_last = last.contains(&weekday)
                    && date
                        .checked_add_signed(Duration::days(7))
                        .map_or(true, |next| next.month() != date.month());
                let is_nth = nth
                    .get(&weekday)
                    .is_some_and(|ordinals| ordinals.contains(&((date.day() - 1) / 7 + 1)));
                is_last || is_nth || self.contains(weekday)
            }
            FieldKind::Generic | FieldKind::Month => self.contains(date.day()),
        }
    }

    pub(crate) fn set_full_range(&mut self) {
        self.values = Values::All;
    }

    /// Inserts a value; anything outside `[min, max]` is dropped.
    pub(crate) fn insert(&mut self, value: i64) {
        let Some(value) = self.accept(value) else {
            return;
        };
        if let Values::Set(set) = &mut self.values {
            set.insert(value);
        }
    }

    pub(crate) fn insert_range(&mut self, first: i64, last: i64) {
        for value in first.max(i64::from(self.min))..=last.min(self.upper_bound()) {
            self.insert(value);
        }
    }

    /// Inserts `min + k * step` for every `k` that lands in `[first, last]`.
    pub(crate) fn insert_stepped(&mut self, first: i64, last: i64, step: u32) {
        let last = last.min(self.upper_bound());
        let mut value = i64::from(self.min);
        while value <= last {
            if value >= first {
                self.insert(value);
            }
            value += i64::from(step);
        }
    }

    /// Reads `SAT-SUN` as `6-7` when Sunday may be written as 7.
    pub(crate) fn normalize_range(&self, first: i64, last: i64) -> (i64, i64) {
        match self.kind {
            FieldKind::DayOfWeek {
                sunday_as_seven: true,
                ..
            } if last == 0 && first > 0 => (first, 7),
            _ => (first, last),
        }
    }

    pub(crate) fn set_unspecified(&mut self) {
        match &mut self.kind {
            FieldKind::DayOfMonth { unspecified, .. } | FieldKind::DayOfWeek { unspecified, .. } => {
                *unspecified = true
            }
            FieldKind::Generic | FieldKind::Month => {}
        }
    }

    pub(crate) fn set_last_day(&mut self) {
        if let FieldKind::DayOfMonth { last_day, .. } = &mut self.kind {
            *last_day = true;
        }
    }

    pub(crate) fn set_nearest_weekday(&mut self, day: i64) {
        let day = self.accept(day);
        if let (FieldKind::DayOfMonth {
            nearest_weekday, ..
        }, Some(day)) = (&mut self.kind, day)
        {
            *nearest_weekday = Some(day);
        }
    }

    pub(crate) fn add_last_weekday(&mut self, weekday: i64) {
        let weekday = self.accept(weekday);
        if let (FieldKind::DayOfWeek { last, .. }, Some(weekday)) = (&mut self.kind, weekday) {
            last.insert(weekday);
        }
    }

    pub(crate) fn add_nth_weekday(&mut self, weekday: i64, ordinal: u32) {
        let weekday = self.accept(weekday);
        if let (FieldKind::DayOfWeek { nth, .. }, Some(weekday)) = (&mut self.kind, weekday) {
            nth.entry(weekday).or_default().insert(ordinal);
        }
    }

    fn sunday_as_seven(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::DayOfWeek {
                sunday_as_seven: true,
                ..
            }
        )
    }

    fn upper_bound(&self) -> i64 {
        i64::from(self.max) + i64::from(self.sunday_as_seven())
    }

    // Maps a parsed number onto a stored value, or rejects it as out of range.
    fn accept(&self, value: i64) -> Option<u32> {
        let value = if value == 7 && self.sunday_as_seven() {
            0
        } else {
            value
        };
        u32::try_from(value)
            .ok()
            .filter(|value| (self.min..=self.max).contains(value))
    }
}

/// The number of days in a month, or `None` for an invalid month.
pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    first_of_next.pred_opt().map(|date| date.day())
}

/// The weekday closest to `day` without leaving the month.
pub(crate) fn nearest_weekday_in_month(year: i32, month: u32, day: u32) -> Option<u32> {
    let target = NaiveDate::from_ymd_opt(year, month, day)?;
    let last = last_day_of_month(year, month)?;
    let adjusted = match target.weekday() {
        Weekday::Sat if day == 1 => 3,
        Weekday::Sat => day - 1,
        Weekday::Sun if day == last => day - 2,
        Weekday::Sun => day + 1,
        _ => day,
    };
    Some(adjusted)
}
