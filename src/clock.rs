//! Wall-clock time, abstracted so tests can drive the state machine without
//! sleeping.

use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current wall-clock time, in fractional seconds since the
/// Unix epoch (matching `time.time()` in the original implementation).
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A clock a test can advance by hand, so state-machine timing can be
/// exercised without real sleeps.
#[derive(Clone, Debug, Default)]
pub struct TestClock(std::sync::Arc<std::sync::atomic::AtomicU64>);

impl TestClock {
    pub fn new(start: f64) -> Self {
        Self(std::sync::Arc::new(std::sync::atomic::AtomicU64::new(start.to_bits())))
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }

    pub fn set(&self, secs: f64) {
        self.0.store(secs.to_bits(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.0.load(std::sync::atomic::Ordering::SeqCst))
    }
}
