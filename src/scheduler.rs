//! The scheduler loop (C6): a single periodic driver, ~10 ms between
//! ticks, running on its own thread so the caller's API (§4.4 public
//! methods, via [`StationHandle`]) never blocks on radio/modem I/O.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::station::{Station, StationHandle};

/// Tick interval. Within the 1-10 ms band §4.5 allows; chosen at the
/// low-jitter end since nothing here does real I/O.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `station` on a dedicated thread until `stop()` is called (via the
/// returned handle or one cloned from it), then hands the station back.
pub fn spawn(mut station: Station) -> (StationHandle, JoinHandle<Station>) {
    let handle = station.handle();
    let join = thread::spawn(move || {
        while station.is_online() {
            station.tick();
            thread::sleep(TICK_INTERVAL);
        }
        station
    });
    (handle, join)
}
