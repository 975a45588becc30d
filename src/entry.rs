//! Named schedule entries owned by the [`CronScheduler`](crate::CronScheduler).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Timelike};

use crate::Cron;

/// Callback run when an entry fires.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// A cron expression bound to a callback, with its firing history.
pub struct Entry<Tz: TimeZone> {
    name: String,
    cron: Cron,
    callback: Callback,
    last_fired: Option<DateTime<Tz>>,
    next_fire: Option<DateTime<Tz>>,
    lookahead: Duration,
}

impl<Tz: TimeZone> Entry<Tz> {
    /// Creates an entry; `next_fire` stays empty until the first refresh.
    pub fn new(name: impl Into<String>, cron: Cron, callback: Callback, lookahead: Duration) -> Self {
        Self {
            name: name.into(),
            cron,
            callback,
            last_fired: None,
            next_fire: None,
            lookahead,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cron(&self) -> &Cron {
        &self.cron
    }

    pub fn callback(&self) -> Callback {
        Arc::clone(&self.callback)
    }

    pub fn last_fired(&self) -> Option<&DateTime<Tz>> {
        self.last_fired.as_ref()
    }

    /// The cached next occurrence, `None` if there is none inside the lookahead window.
    pub fn next_fire(&self) -> Option<&DateTime<Tz>> {
        self.next_fire.as_ref()
    }

    /// True if the expression matches `now` and the entry has not fired in the same slot.
    ///
    /// A slot is one second for expressions with seconds, one minute otherwise.
    pub fn is_due(&self, now: &DateTime<Tz>) -> bool {
        if self
            .last_fired
            .as_ref()
            .is_some_and(|last| self.slot(last) == self.slot(now))
        {
            return false;
        }
        self.cron.is_time_matching(now)
    }

    /// Records a firing and recomputes the next one.
    pub fn mark_fired(&mut self, at: DateTime<Tz>) {
        self.refresh_next_fire(&at);
        self.last_fired = Some(at);
    }

    /// Recomputes the cached next occurrence, searching `(from, from + lookahead]`.
    pub fn refresh_next_fire(&mut self, from: &DateTime<Tz>) {
        self.next_fire = from
            .clone()
            .checked_add_signed(self.lookahead)
            .and_then(|until| self.cron.find_next_occurrence(from, &until).ok());
    }

    // Wall-clock time truncated to the firing granularity.
    fn slot(&self, time: &DateTime<Tz>) -> Option<chrono::NaiveDateTime> {
        let time = time.naive_local().with_nanosecond(0)?;
        if self.cron.has_seconds() {
            Some(time)
        } else {
            time.with_second(0)
        }
    }
}

impl<Tz: TimeZone> fmt::Debug for Entry<Tz> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("cron", &self.cron.as_str())
            .field("last_fired", &self.last_fired)
            .field("next_fire", &self.next_fire)
            .finish_non_exhaustive()
    }
}
