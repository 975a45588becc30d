//! A small polling driver that runs callbacks when their cron expressions come due.
//!
//! ```rust
//! use std::str::FromStr as _;
//!
//! use cronex::{Cron, CronScheduler, SchedulerConfig};
//!
//! let scheduler = CronScheduler::new(SchedulerConfig::default());
//! scheduler
//!     .add("heartbeat", Cron::from_str("*/5 * * * *").unwrap(), || {
//!         println!("still alive");
//!     })
//!     .unwrap();
//!
//! scheduler.start().unwrap();
//! // ...
//! scheduler.close();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone, Utc};
use derive_builder::Builder;
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::entry::{Callback, Entry};
use crate::errors::CronError;
use crate::threadpool::ThreadPool;
use crate::Cron;

/// Scheduler configuration.
///
/// Use [`SchedulerConfig::builder`] to override single settings.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(default, build_fn(skip), pattern = "owned")]
pub struct SchedulerConfig {
    /// Time between two ticks of the timer thread.
    tick_interval: Duration,
    /// Number of threads running callbacks.
    worker_threads: usize,
    /// How long [`CronScheduler::close`] waits for running callbacks.
    shutdown_grace: Duration,
    /// Window searched when computing an entry's next fire time.
    lookahead: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            worker_threads: 4,
            shutdown_grace: Duration::from_secs(5),
            lookahead: chrono::Duration::days(366),
        }
    }
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn lookahead(&self) -> chrono::Duration {
        self.lookahead
    }
}

impl SchedulerConfigBuilder {
    pub fn build(self) -> SchedulerConfig {
        let defaults = SchedulerConfig::default();
        SchedulerConfig {
            tick_interval: self.tick_interval.unwrap_or(defaults.tick_interval),
            worker_threads: self.worker_threads.unwrap_or(defaults.worker_threads),
            shutdown_grace: self.shutdown_grace.unwrap_or(defaults.shutdown_grace),
            lookahead: self.lookahead.unwrap_or(defaults.lookahead),
        }
    }
}

struct Shared<Tz: TimeZone> {
    entries: RwLock<HashMap<String, Entry<Tz>>>,
    pool: ThreadPool,
}

impl<Tz: TimeZone> Shared<Tz> {
    // Due entries are marked under the write lock; callbacks are queued after it is released.
    fn tick(&self, now: &DateTime<Tz>) -> usize {
        let due: Vec<(String, Callback)> = {
            let mut entries = self.entries.write();
            entries
                .values_mut()
                .filter(|entry| entry.is_due(now))
                .map(|entry| {
                    entry.mark_fired(now.clone());
                    (entry.name().to_string(), entry.callback())
                })
                .collect()
        };

        for (name, callback) in &due {
            debug!(entry = %name, "dispatching");
            let callback = Arc::clone(callback);
            self.pool.execute(move || callback());
        }
        due.len()
    }
}

struct Timer {
    handle: JoinHandle<()>,
    stop: Arc<(Mutex<bool>, Condvar)>,
}

/// Runs named callbacks on a worker pool when their expressions match.
///
/// Expressions are evaluated against the wall clock of the scheduler's time zone. A timer
/// thread started with [`start`](Self::start) ticks every
/// [`tick_interval`](SchedulerConfig::tick_interval); [`tick`](Self::tick) can also be
/// driven by hand. Each entry fires at most once per minute, or once per second when its
/// expression has a seconds field, so the tick interval should be one second for those.
pub struct CronScheduler<Tz = Local>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    shared: Arc<Shared<Tz>>,
    timezone: Tz,
    config: SchedulerConfig,
    timer: Mutex<Option<Timer>>,
    closed: AtomicBool,
}

impl CronScheduler<Local> {
    /// Creates a scheduler working in local time.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_timezone(Local, config)
    }
}

impl<Tz> CronScheduler<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    pub fn with_timezone(timezone: Tz, config: SchedulerConfig) -> Self {
        let pool = ThreadPool::new(config.worker_threads);
        info!(
            tick_interval = ?config.tick_interval,
            workers = pool.max_count(),
            "cron scheduler created"
        );
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(HashMap::new()),
                pool,
            }),
            timezone,
            config,
            timer: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Registers a callback under a unique name.
    pub fn add<F>(&self, name: impl Into<String>, cron: Cron, callback: F) -> Result<(), CronError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.shared.entries.write();
        if entries.contains_key(&name) {
            return Err(CronError::DuplicateEntry(name));
        }

        let mut entry = Entry::new(name.clone(), cron, Arc::new(callback), self.config.lookahead);
        entry.refresh_next_fire(&self.now());
        info!(entry = %name, pattern = %entry.cron(), "entry added");
        entries.insert(name, entry);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<(), CronError> {
        self.shared
            .entries
            .write()
            .remove(name)
            .ok_or_else(|| CronError::EntryNotFound(name.to_string()))?;
        info!(entry = %name, "entry removed");
        Ok(())
    }

    /// Registered entry names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The cached next fire time of an entry.
    pub fn next_fire(&self, name: &str) -> Result<Option<DateTime<Tz>>, CronError> {
        self.shared
            .entries
            .read()
            .get(name)
            .map(|entry| entry.next_fire().cloned())
            .ok_or_else(|| CronError::EntryNotFound(name.to_string()))
    }

    /// Fires every entry due at `now` and returns how many were dispatched.
    ///
    /// # Errors
    ///
    /// [`CronError::SchedulerClosed`] after [`close`](Self::close).
    pub fn tick(&self, now: &DateTime<Tz>) -> Result<usize, CronError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CronError::SchedulerClosed);
        }
        Ok(self.shared.tick(now))
    }

    /// Starts the timer thread.
    ///
    /// The first tick runs right away, later ones on wall-clock multiples of
    /// [`tick_interval`](SchedulerConfig::tick_interval).
    pub fn start(&self) -> Result<(), CronError> {
        let mut timer = self.timer.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(CronError::SchedulerClosed);
        }
        if timer.is_some() {
            warn!("cron scheduler already running");
            return Err(CronError::SchedulerAlreadyRunning);
        }

        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_stop = Arc::clone(&stop);
        let shared = Arc::clone(&self.shared);
        let timezone = self.timezone.clone();
        let interval = self.config.tick_interval;

        let handle = thread::spawn(move || {
            let (lock, cvar) = &*thread_stop;
            let mut stopped = lock.lock();
            while !*stopped {
                MutexGuard::unlocked(&mut stopped, || {
                    let now = Utc::now().with_timezone(&timezone);
                    let fired = shared.tick(&now);
                    if fired > 0 {
                        debug!(fired, "tick");
                    }
                });
                let deadline = Instant::now() + until_next_boundary(Utc::now(), interval);
                while !*stopped && Instant::now() < deadline {
                    cvar.wait_until(&mut stopped, deadline);
                }
            }
        });

        *timer = Some(Timer { handle, stop });
        info!("cron scheduler started");
        Ok(())
    }

    /// Stops the timer and shuts the worker pool down.
    ///
    /// Queued callbacks still run. Callbacks busy after the
    /// [`shutdown_grace`](SchedulerConfig::shutdown_grace) period are left to finish
    /// on their own.
    pub fn close(&self) {
        let already_closed = self.closed.swap(true, Ordering::AcqRel);

        if let Some(timer) = self.timer.lock().take() {
            let (lock, cvar) = &*timer.stop;
            *lock.lock() = true;
            cvar.notify_all();
            if timer.handle.join().is_err() {
                error!("cron scheduler timer thread panicked");
            }
        }

        if already_closed {
            return;
        }
        let detached = self.shared.pool.shutdown(self.config.shutdown_grace);
        info!(detached, "cron scheduler closed");
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}

// Time left until the next wall-clock multiple of `interval`, never zero.
fn until_next_boundary(now: DateTime<Utc>, interval: Duration) -> Duration {
    let period = i64::try_from(interval.as_millis())
        .unwrap_or(i64::MAX)
        .max(1);
    let elapsed = now.timestamp_millis().rem_euclid(period);
    Duration::from_millis(u64::try_from(period - elapsed).unwrap_or(1))
}

impl<Tz> Drop for CronScheduler<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    use super::*;
    use crate::CronParser;

    fn utc(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, hour, minute, second)
            .unwrap()
    }

    fn scheduler() -> CronScheduler<Utc> {
        CronScheduler::with_timezone(Utc, SchedulerConfig::default())
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);
        (count, move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_config_builder() {
        let config = SchedulerConfig::builder()
            .tick_interval(Duration::from_secs(1))
            .worker_threads(2)
            .build();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.lookahead(), chrono::Duration::days(366));
        assert_eq!(SchedulerConfig::builder().build(), SchedulerConfig::default());
    }

    #[test]
    fn test_add_and_remove() {
        let scheduler = scheduler();
        scheduler.add("b", Cron::hourly(), || {}).unwrap();
        scheduler.add("a", Cron::daily(), || {}).unwrap();
        assert_eq!(scheduler.names(), vec!["a".to_string(), "b".to_string()]);

        assert_eq!(
            scheduler.add("a", Cron::weekly(), || {}),
            Err(CronError::DuplicateEntry("a".to_string()))
        );

        scheduler.remove("a").unwrap();
        assert_eq!(
            scheduler.remove("a"),
            Err(CronError::EntryNotFound("a".to_string()))
        );
        assert_eq!(scheduler.names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_next_fire() {
        let scheduler = scheduler();
        scheduler.add("hourly", Cron::hourly(), || {}).unwrap();
        scheduler.add("reboot", Cron::reboot(), || {}).unwrap();

        let next = scheduler.next_fire("hourly").unwrap().unwrap();
        assert!(next > Utc::now());
        assert_eq!(chrono::Timelike::minute(&next), 0);

        assert_eq!(scheduler.next_fire("reboot"), Ok(None));
        assert!(scheduler.next_fire("missing").is_err());

        scheduler.tick(&utc(10, 0, 0)).unwrap();
        assert_eq!(
            scheduler.next_fire("hourly").unwrap(),
            Some(utc(11, 0, 0))
        );
    }

    #[test]
    fn test_tick_fires_due_entries_once_per_slot() {
        let scheduler = scheduler();
        let (count, callback) = counter();
        scheduler
            .add("half-past", Cron::from_str("30 * * * *").unwrap(), callback)
            .unwrap();

        assert_eq!(scheduler.tick(&utc(9, 29, 0)), Ok(0));
        assert_eq!(scheduler.tick(&utc(9, 30, 0)), Ok(1));
        assert_eq!(scheduler.tick(&utc(9, 30, 30)), Ok(0));
        assert_eq!(scheduler.tick(&utc(10, 30, 0)), Ok(1));

        scheduler.close();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tick_fires_reboot_once() {
        let scheduler = scheduler();
        let (count, callback) = counter();
        scheduler.add("startup", Cron::reboot(), callback).unwrap();

        assert_eq!(scheduler.tick(&utc(9, 0, 0)), Ok(1));
        assert_eq!(scheduler.tick(&utc(9, 1, 0)), Ok(0));
        assert_eq!(scheduler.tick(&utc(9, 2, 0)), Ok(0));

        scheduler.close();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_ticks() {
        let scheduler = scheduler();
        let (count, callback) = counter();
        scheduler
            .add("broken", Cron::from_str("* * * * *").unwrap(), || panic!("boom"))
            .unwrap();
        scheduler
            .add("working", Cron::from_str("* * * * *").unwrap(), callback)
            .unwrap();

        assert_eq!(scheduler.tick(&utc(9, 0, 0)), Ok(2));
        assert_eq!(scheduler.tick(&utc(9, 1, 0)), Ok(2));

        scheduler.close();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timer_thread_dispatches() {
        let config = SchedulerConfig::builder()
            .tick_interval(Duration::from_millis(10))
            .build();
        let scheduler = CronScheduler::with_timezone(Utc, config);
        let every_second = CronParser::builder()
            .seconds(true)
            .build()
            .parse("* * * * * *")
            .unwrap();
        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        scheduler
            .add("every-second", every_second, move || {
                let _ = sender.lock().send(());
            })
            .unwrap();

        scheduler.start().unwrap();
        assert_eq!(scheduler.start(), Err(CronError::SchedulerAlreadyRunning));
        assert!(receiver.recv_timeout(Duration::from_secs(5)).is_ok());
        scheduler.close();
    }

    #[test]
    fn test_closed_scheduler_refuses_work() {
        let scheduler = scheduler();
        let (count, callback) = counter();
        scheduler
            .add("half-past", Cron::from_str("30 * * * *").unwrap(), callback)
            .unwrap();
        scheduler.close();

        assert_eq!(scheduler.start(), Err(CronError::SchedulerClosed));
        assert_eq!(scheduler.tick(&utc(9, 30, 0)), Err(CronError::SchedulerClosed));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        // Refused ticks leave the entry untouched.
        assert_eq!(
            scheduler.shared.entries.read()["half-past"].last_fired(),
            None
        );
    }

    #[test]
    fn test_until_next_boundary() {
        let minute = Duration::from_secs(60);
        assert_eq!(
            until_next_boundary(utc(9, 30, 59) + chrono::Duration::milliseconds(999), minute),
            Duration::from_millis(1)
        );
        assert_eq!(until_next_boundary(utc(9, 30, 0), minute), minute);
        assert_eq!(
            until_next_boundary(utc(9, 30, 15), minute),
            Duration::from_secs(45)
        );
        assert_eq!(
            until_next_boundary(utc(9, 30, 15), Duration::ZERO),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let scheduler = scheduler();
        scheduler.start().unwrap();
        scheduler.close();
        scheduler.close();
    }
}
