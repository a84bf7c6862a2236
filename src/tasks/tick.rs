//! Tick Drivers
//!
//! Periodic schedulers that advance a cache map's timer wheel.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Zero-argument action a driver runs once per interval.
pub type TickAction = Box<dyn FnMut() + Send + 'static>;

// == Tick Driver ==
/// Capability to run an action every `interval`, until the returned handle
/// is dropped.
pub trait TickDriver {
    fn run_every(&self, interval: Duration, action: TickAction) -> Result<TickHandle>;
}

// == Tick Handle ==
/// Registration returned by a [`TickDriver`]. Dropping it stops the ticks.
pub struct TickHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync + 'static>>,
}

impl TickHandle {
    /// Wraps the action that stops this registration.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops the ticks now rather than at drop.
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Tokio Ticker ==
/// Runs ticks on a tokio task.
///
/// # Example
/// ```ignore
/// let map = CacheMap::with_driver(&TokioTicker::current(), interval, limit)?;
/// ```
#[derive(Debug, Clone)]
pub struct TokioTicker {
    runtime: Handle,
}

impl TokioTicker {
    /// Uses the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime of the calling context.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TickDriver for TokioTicker {
    fn run_every(&self, interval: Duration, mut action: TickAction) -> Result<TickHandle> {
        // First tick one full interval from now, not immediately.
        let start = tokio::time::Instant::now()
            .checked_add(interval)
            .ok_or_else(|| interval_overflow(interval))?;

        let task = self.runtime.spawn(async move {
            info!("Starting wheel tick task with interval of {:?}", interval);

            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                action();
            }
        });

        Ok(TickHandle::new(move || {
            task.abort();
            debug!("Wheel tick task aborted");
        }))
    }
}

// == Thread Ticker ==
/// Runs ticks on a dedicated OS thread, for callers without an async runtime.
#[derive(Debug, Clone)]
pub struct ThreadTicker {
    name: String,
}

impl ThreadTicker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadTicker {
    fn default() -> Self {
        Self::new("wheel-tick")
    }
}

impl TickDriver for ThreadTicker {
    fn run_every(&self, interval: Duration, mut action: TickAction) -> Result<TickHandle> {
        let mut deadline = Instant::now()
            .checked_add(interval)
            .ok_or_else(|| interval_overflow(interval))?;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        thread::Builder::new().name(self.name.clone()).spawn(move || {
            info!("Starting wheel tick thread with interval of {:?}", interval);

            // Deadlines advance by whole intervals so slow actions do not drift.
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        action();
                        match deadline.checked_add(interval) {
                            Some(next) => deadline = next,
                            None => break,
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Wheel tick thread stopped");
        })?;

        Ok(TickHandle::new(move || drop(stop_tx)))
    }
}

fn interval_overflow(interval: Duration) -> CacheError {
    CacheError::InvalidConfig(format!(
        "tick interval {:?} overflows the clock",
        interval
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_action(counter: &Arc<AtomicUsize>) -> TickAction {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_handle_cancels_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancelled);
        let handle = TickHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_cancels_on_drop() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancelled);
        {
            let _handle = TickHandle::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tokio_ticker_runs_periodically() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = TokioTicker::current()
            .run_every(Duration::from_millis(20), counting_action(&ticks))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 2, "Ticker should have fired");

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_cancel = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_tokio_ticker_rejects_unrepresentable_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let result = TokioTicker::current().run_every(Duration::MAX, counting_action(&ticks));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_thread_ticker_rejects_unrepresentable_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let result = ThreadTicker::default().run_every(Duration::MAX, counting_action(&ticks));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_thread_ticker_runs_periodically() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = ThreadTicker::default()
            .run_every(Duration::from_millis(20), counting_action(&ticks))
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        assert!(ticks.load(Ordering::SeqCst) >= 2, "Ticker should have fired");

        drop(handle);
        thread::sleep(Duration::from_millis(50));
        let after_cancel = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }
}
