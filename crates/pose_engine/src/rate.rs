//! Arrival-rate estimator: frames received during the last second.

use std::fmt;

use ringbuf::{traits::*, HeapRb};

/// Sliding window length (seconds).
pub const RATE_WINDOW_S: f64 = 1.0;

/// Arrival timestamps kept at most; older entries are overwritten, so the
/// reported rate saturates at this many frames per second.
pub const WINDOW_CAPACITY: usize = 1024;

/// Counts frames per second over a sliding window.
///
/// Ingest only bumps a counter; the window is updated once per render tick,
/// so several frames arriving within one tick all land in that tick. Rates
/// above [`WINDOW_CAPACITY`] read as `WINDOW_CAPACITY`.
pub struct ArrivalRateEstimator {
    window: HeapRb<f64>,
    pending: usize,
}

impl fmt::Debug for ArrivalRateEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrivalRateEstimator")
            .field("rate", &self.window.occupied_len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl Default for ArrivalRateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrivalRateEstimator {
    pub fn new() -> Self {
        Self {
            window: HeapRb::new(WINDOW_CAPACITY),
            pending: 0,
        }
    }

    /// Count one ingested frame.
    #[inline]
    pub fn record_arrival(&mut self) {
        self.pending += 1;
    }

    /// Evict entries older than `now - 1s`, append the pending arrivals at
    /// `now` and return the current rate.
    pub fn tick(&mut self, now: f64) -> usize {
        let cutoff = now - RATE_WINDOW_S;
        while self.window.try_peek().is_some_and(|&t| t < cutoff) {
            self.window.try_pop();
        }

        for _ in 0..self.pending {
            self.window.push_overwrite(now);
        }
        self.pending = 0;

        self.rate()
    }

    /// Frames per second.
    #[inline]
    pub fn rate(&self) -> usize {
        self.window.occupied_len()
    }
}
