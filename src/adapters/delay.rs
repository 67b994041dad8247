//! Delay adapters for the [`DelayPort`] seam.
//!
//! On target, [`TimerDelay`] suspends on an embassy-time reactor timer so
//! the executor keeps servicing other tasks during motor runs and stepper
//! holds. On the host, [`NoopDelay`] resolves immediately and
//! [`ManualDelay`] hands the test full control over when time "passes".

use core::time::Duration;

use crate::ports::DelayPort;

// ───────────────────────────────────────────────────────────────
// Target adapter
// ───────────────────────────────────────────────────────────────

/// Reactor-timer delay for the espidf executor.
#[cfg(target_os = "espidf")]
#[derive(Debug, Clone, Copy)]
pub struct TimerDelay;

#[cfg(target_os = "espidf")]
impl DelayPort for TimerDelay {
    fn delay(&self, duration: Duration) -> impl core::future::Future<Output = ()> {
        embassy_time::Timer::after(embassy_time::Duration::from_micros(
            duration.as_micros() as u64
        ))
    }
}

// ───────────────────────────────────────────────────────────────
// Host adapters
// ───────────────────────────────────────────────────────────────

/// Completes immediately; for tests that only care about pin effects.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy)]
pub struct NoopDelay;

#[cfg(not(target_os = "espidf"))]
impl DelayPort for NoopDelay {
    fn delay(&self, _duration: Duration) -> impl core::future::Future<Output = ()> {
        core::future::ready(())
    }
}

/// Records every requested delay and stays pending until the test calls
/// [`release`](ManualDelay::release) — the deterministic clock for
/// auto-off/pre-emption tests.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct ManualDelay {
    released: core::sync::atomic::AtomicBool,
    requested: std::sync::Mutex<Vec<Duration>>,
    wakers: std::sync::Mutex<Vec<core::task::Waker>>,
}

#[cfg(not(target_os = "espidf"))]
impl ManualDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every pending and future delay complete.
    pub fn release(&self) {
        self.released
            .store(true, core::sync::atomic::Ordering::Release);
        for waker in self.wakers.lock().unwrap().drain(..) {
            waker.wake();
        }
    }

    /// Every duration requested so far, in order.
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayPort for ManualDelay {
    fn delay(&self, duration: Duration) -> impl core::future::Future<Output = ()> {
        self.requested.lock().unwrap().push(duration);
        ManualDelayFuture { source: self }
    }
}

#[cfg(not(target_os = "espidf"))]
struct ManualDelayFuture<'a> {
    source: &'a ManualDelay,
}

#[cfg(not(target_os = "espidf"))]
impl core::future::Future for ManualDelayFuture<'_> {
    type Output = ();

    fn poll(
        self: core::pin::Pin<&mut Self>,
        cx: &mut core::task::Context<'_>,
    ) -> core::task::Poll<()> {
        if self
            .source
            .released
            .load(core::sync::atomic::Ordering::Acquire)
        {
            core::task::Poll::Ready(())
        } else {
            self.source.wakers.lock().unwrap().push(cx.waker().clone());
            core::task::Poll::Pending
        }
    }
}
