//! Cancellable periodic watchdog task.
//!
//! Replaces the usual spawn-a-timer-per-tick pattern with a single owned
//! thread that fires a closure once per period and is joined on cancel,
//! so no periodic task outlives the session.

use crossbeam_channel::{bounded, select, tick, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a running periodic task. Cancelled (and joined) on drop.
pub struct Watchdog {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Spawn a thread invoking `tick_fn` once per `period` until cancelled.
    pub fn spawn<F>(period: Duration, mut tick_fn: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = std::thread::spawn(move || {
            let ticker = tick(period);
            loop {
                select! {
                    recv(ticker) -> _ => tick_fn(),
                    // fires on explicit cancel and on sender drop
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stop the task and wait for the thread to exit.
    pub fn cancel(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            drop(shutdown);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ticks_fire_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let mut watchdog = Watchdog::spawn(Duration::from_millis(10), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(100));
        watchdog.cancel();

        let ticks = count.load(Ordering::SeqCst);
        assert!(ticks >= 3, "expected several ticks, got {ticks}");
    }

    #[test]
    fn test_cancel_stops_ticking() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let mut watchdog = Watchdog::spawn(Duration::from_millis(5), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(30));
        watchdog.cancel();

        let after_cancel = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_drop_joins_thread() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        {
            let _watchdog = Watchdog::spawn(Duration::from_millis(5), move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(20));
        }

        let after_drop = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }
}
