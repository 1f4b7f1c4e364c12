//! # Task Scheduler
//!
//! Named, cancellable background tasks sharing one shutdown signal.
//!
//! A periodic job first runs one period after it is scheduled, then every
//! period. A job already running when shutdown is signalled finishes; no
//! new run starts afterwards. `shutdown` returns once every task has ended.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

struct ScheduledTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Runs the validator's periodic jobs.
pub struct TaskScheduler {
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<ScheduledTask>>,
    stopped: AtomicBool,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// Scheduler with no tasks.
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Receiver that flips to `true` on shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Whether `shutdown` has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Run `job` every `period` until shutdown.
    ///
    /// Returns `false` (and schedules nothing) after shutdown.
    pub fn schedule_periodic<F, Fut>(&self, name: &str, period: Duration, mut job: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_name = name.to_string();
        self.spawn(name, move |mut shutdown| async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.wait_for(|stop| *stop) => break,
                    _ = ticker.tick() => {}
                }
                debug!("[runtime] Running {}", task_name);
                job().await;
            }
        })
    }

    /// Run a long-lived task that watches the shutdown signal itself.
    ///
    /// Returns `false` (and spawns nothing) after shutdown.
    pub fn spawn<F, Fut>(&self, name: &str, task: F) -> bool
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if self.is_shutting_down() {
            warn!("[runtime] Not scheduling {} during shutdown", name);
            return false;
        }
        let handle = tokio::spawn(task(self.shutdown.subscribe()));
        tasks.push(ScheduledTask {
            name: name.to_string(),
            handle,
        });
        debug!("[runtime] Scheduled {}", name);
        true
    }

    /// Names of scheduled tasks, in scheduling order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.lock().iter().map(|t| t.name.clone()).collect()
    }

    /// Signal every task and wait for all of them. Returns how many ended.
    pub async fn shutdown(&self) -> usize {
        let tasks: Vec<ScheduledTask> = {
            let mut tasks = self.tasks.lock();
            self.stopped.store(true, Ordering::SeqCst);
            self.shutdown.send_replace(true);
            tasks.drain(..).collect()
        };

        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.handle.await {
                warn!("[runtime] Task {} ended abnormally: {}", task.name, e);
            }
        }
        info!("[runtime] Scheduler stopped ({} tasks)", count);
        count
    }
}
