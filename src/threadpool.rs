use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Fixed-size pool of worker threads that run queued tasks in order.
pub(crate) struct ThreadPool {
    workers: Mutex<Vec<Worker>>,
    queue: Arc<Mutex<VecDeque<Task>>>,
    cvar: Arc<Condvar>,
    shutdown: Arc<AtomicBool>,
    max_threads: usize,
}

impl ThreadPool {
    /// Spawns `size` workers; at least one is always started.
    pub(crate) fn new(size: usize) -> ThreadPool {
        let size = size.max(1);

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let cvar = Arc::new(Condvar::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let workers = (0..size)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&queue),
                    Arc::clone(&cvar),
                    Arc::clone(&shutdown),
                )
            })
            .collect();

        ThreadPool {
            workers: Mutex::new(workers),
            queue,
            cvar,
            shutdown,
            max_threads: size,
        }
    }

    /// Queues a task. Tasks handed over after shutdown are dropped.
    pub(crate) fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut tasks = self.queue.lock();
        if self.shutdown.load(Ordering::Acquire) {
            warn!("thread pool is shut down, dropping task");
            return;
        }
        tasks.push_back(Box::new(f));
        self.cvar.notify_one();
    }

    /// Stops accepting tasks and lets the workers drain the queue.
    ///
    /// Workers are joined until `grace` has elapsed; the ones still busy after that are
    /// detached and finish on their own. Returns the number of detached workers.
    pub(crate) fn shutdown(&self, grace: Duration) -> usize {
        {
            let _tasks = self.queue.lock();
            self.shutdown.store(true, Ordering::Release);
        }
        self.cvar.notify_all();

        let deadline = Instant::now() + grace;
        let workers = std::mem::take(&mut *self.workers.lock());
        let mut detached = 0;
        for worker in workers {
            if !worker.join_until(deadline) {
                detached += 1;
            }
        }

        if detached > 0 {
            warn!(detached, ?grace, "workers still busy after the grace period, detaching");
        }
        detached
    }

    pub(crate) fn max_count(&self) -> usize {
        self.max_threads
    }
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(
        id: usize,
        queue: Arc<Mutex<VecDeque<Task>>>,
        cvar: Arc<Condvar>,
        shutdown: Arc<AtomicBool>,
    ) -> Worker {
        let thread = thread::spawn(move || loop {
            let task = {
                let mut tasks = queue.lock();
                while !shutdown.load(Ordering::Acquire) && tasks.is_empty() {
                    cvar.wait(&mut tasks);
                }
                // Empty here means shutdown with nothing left to drain.
                match tasks.pop_front() {
                    Some(task) => task,
                    None => break,
                }
            };

            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!(worker = id, "task panicked");
            }
        });

        Worker {
            id,
            thread: Some(thread),
        }
    }

    // True if the thread finished before the deadline.
    fn join_until(mut self, deadline: Instant) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };
        while !thread.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        if !thread.is_finished() {
            return false;
        }
        if thread.join().is_err() {
            error!(worker = self.id, "worker thread panicked");
        }
        debug!(worker = self.id, "worker stopped");
        true
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Acquire) {
            self.shutdown(Duration::ZERO);
        }
    }
}
