use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::{Cron, CronError};

/// Successive occurrences of a [`Cron`] expression inside a time window.
///
/// Created by [`Cron::iter_after`]. The iterator ends at the first occurrence past the
/// window end, and immediately for `@reboot`.
#[derive(Debug, Clone)]
pub struct CronIterator<Tz>
where
    Tz: TimeZone,
{
    cron: Cron,
    current_time: DateTime<Tz>,
    until: DateTime<Tz>,
    done: bool,
}

impl<Tz> CronIterator<Tz>
where
    Tz: TimeZone,
{
    /// Creates a new `CronIterator`.
    ///
    /// # Arguments
    ///
    /// * `cron` - The expression to iterate.
    /// * `start_after` - Occurrences strictly after this time are yielded.
    /// * `until` - The last time an occurrence may fall on.
    pub fn new(cron: Cron, start_after: DateTime<Tz>, until: DateTime<Tz>) -> Self {
        CronIterator {
            cron,
            current_time: start_after,
            until,
            done: false,
        }
    }
}

impl<Tz> Iterator for CronIterator<Tz>
where
    Tz: TimeZone,
{
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self
            .cron
            .find_next_occurrence(&self.current_time, &self.until)
        {
            Ok(found) => {
                self.current_time = found.clone();
                Some(found)
            }
            Err(CronError::TimeSearchLimitExceeded) => {
                self.done = true;
                None
            }
            Err(error) => {
                debug!(pattern = %self.cron, %error, "cron iterator stopped");
                self.done = true;
                None
            }
        }
    }
}
