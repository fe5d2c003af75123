//! Trailing-edge debounce.
//!
//! The value delivered to the sink is read from an accessor when the delay elapses, not
//! captured when the call was triggered, so the sink always sees the latest state.
//!
//! Each scheduled call carries an `armed` flag that the timer task and [`Debouncer::flush`]
//! race to clear. Only the side that clears it delivers, so a value goes out at most once even
//! when the timer fires on another worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type Accessor<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Pending {
    armed: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Pending {
    /// Claims the call. Returns false if the timer (or anyone else) already did.
    fn disarm(self) -> bool {
        let claimed = self.armed.swap(false, Ordering::AcqRel);
        if claimed {
            self.handle.abort();
        }
        claimed
    }
}

pub struct Debouncer<T> {
    delay: Duration,
    latest: Accessor<T>,
    sink: Sink<T>,
    pending: Option<Pending>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(
        delay: Duration,
        latest: impl Fn() -> T + Send + Sync + 'static,
        sink: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            delay,
            latest: Arc::new(latest),
            sink: Arc::new(sink),
            pending: None,
        }
    }

    /// Schedules a delivery after the delay, replacing any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&mut self) {
        self.cancel();
        let delay = self.delay;
        let latest = Arc::clone(&self.latest);
        let sink = Arc::clone(&self.sink);
        let armed = Arc::new(AtomicBool::new(true));
        let fire = Arc::clone(&armed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if fire.swap(false, Ordering::AcqRel) {
                sink(latest());
            }
        });
        self.pending = Some(Pending { armed, handle });
    }

    /// Delivers now if a call is pending. Returns whether anything was delivered.
    pub fn flush(&mut self) -> bool {
        if !self.cancel() {
            return false;
        }
        (self.sink)((self.latest)());
        true
    }

    /// Drops the pending call, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some_and(Pending::disarm)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.armed.load(Ordering::Acquire))
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn recording(
        value: Arc<AtomicUsize>,
    ) -> (Debouncer<usize>, Arc<Mutex<Vec<usize>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        let debouncer = Debouncer::new(
            Duration::from_millis(100),
            move || value.load(Ordering::SeqCst),
            move |v| sink.lock().unwrap().push(v),
        );
        (debouncer, delivered)
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_latest_value_once_after_quiet_period() {
        let value = Arc::new(AtomicUsize::new(1));
        let (mut debouncer, delivered) = recording(Arc::clone(&value));

        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(60)).await;
        value.store(2, Ordering::SeqCst);
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(60)).await;
        value.store(3, Ordering::SeqCst);
        assert!(delivered.lock().unwrap().is_empty());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*delivered.lock().unwrap(), vec![3]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_delivers_immediately_and_only_when_pending() {
        let value = Arc::new(AtomicUsize::new(7));
        let (mut debouncer, delivered) = recording(value);

        assert!(!debouncer.flush());
        debouncer.trigger();
        assert!(debouncer.flush());
        assert_eq!(*delivered.lock().unwrap(), vec![7]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_discard_pending_call() {
        let value = Arc::new(AtomicUsize::new(1));
        let (mut debouncer, delivered) = recording(Arc::clone(&value));
        debouncer.trigger();
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        let (mut dropped, dropped_delivered) = recording(value);
        dropped.trigger();
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(delivered.lock().unwrap().is_empty());
        assert!(dropped_delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn flush_during_timer_delivery_does_not_deliver_twice() {
        let entered = Arc::new(AtomicBool::new(false));
        let delivered = Arc::new(AtomicUsize::new(0));
        let (seen, count) = (Arc::clone(&entered), Arc::clone(&delivered));
        let mut debouncer = Debouncer::new(
            Duration::from_millis(10),
            || (),
            move |()| {
                seen.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                count.fetch_add(1, Ordering::SeqCst);
            },
        );

        debouncer.trigger();
        while !entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(!debouncer.flush());
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
