//! Adaptive playback clock.
//!
//! The virtual clock is a fixed linear function of realtime anchored at the
//! last hard reset; only the delay offset moves it. The delay jumps up to any
//! larger observed delay and decays exponentially otherwise.

use contracts::{ClockTuning, FILE_PLAYBACK_FRAME_ID, MAX_DELAY_TIME};
use tracing::warn;

/// Last frame seen by the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedMark {
    pub frame_id: i32,
    /// Sender clock
    pub timestamp: f64,
    /// Receiver clock
    pub realtime: f64,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    start_timestamp: f64,
    start_realtime: f64,
    current_delay: f64,
    last_received: Option<ReceivedMark>,
    recovery_rate: f64,
    frame_delta_discount: f64,
    overflows: u64,
}

impl PlaybackClock {
    pub fn new(recovery_rate: f64, tuning: &ClockTuning) -> Self {
        Self {
            start_timestamp: 0.0,
            start_realtime: 0.0,
            current_delay: 0.0,
            last_received: None,
            recovery_rate: recovery_rate.clamp(0.0, 1.0),
            frame_delta_discount: tuning.frame_delta_discount,
            overflows: 0,
        }
    }

    /// Re-anchor the clock at a hard reset.
    ///
    /// Zeroes the delay and forgets the last received frame.
    pub fn restart(&mut self, timestamp: f64, realtime: f64) {
        self.start_timestamp = timestamp;
        self.start_realtime = realtime;
        self.current_delay = 0.0;
        self.last_received = None;
    }

    /// Forget the last received frame so the next one starts a new stream.
    pub fn forget_last_received(&mut self) {
        self.last_received = None;
    }

    /// Fold one received frame into the delay estimate and return the
    /// virtual time at `realtime`.
    ///
    /// `frame_delta` is the unscaled duration of the last render tick.
    pub fn advance(&mut self, frame_id: i32, timestamp: f64, realtime: f64, frame_delta: f64) -> f64 {
        let (last_timestamp, last_realtime) = self
            .last_received
            .map(|mark| (mark.timestamp, mark.realtime))
            .unwrap_or((timestamp, realtime));

        let observed = ((timestamp - last_timestamp) + (realtime - last_realtime)
            - self.frame_delta_discount * frame_delta)
            .max(0.0);

        if frame_id == FILE_PLAYBACK_FRAME_ID {
            self.current_delay = 0.0;
        } else if observed > self.current_delay {
            self.current_delay = observed;
        } else {
            self.current_delay =
                self.current_delay * (1.0 - self.recovery_rate) + observed * self.recovery_rate;
        }

        if self.current_delay > MAX_DELAY_TIME {
            warn!(
                delay_s = self.current_delay,
                max_s = MAX_DELAY_TIME,
                "playback delay overflow, resetting delay"
            );
            metrics::counter!("pose_delay_overflow_total").increment(1);
            self.overflows += 1;
            self.current_delay = 0.0;
        }

        self.last_received = Some(ReceivedMark {
            frame_id,
            timestamp,
            realtime,
        });

        self.virtual_now(realtime)
    }

    /// `start_timestamp - current_delay + (realtime - start_realtime)`
    #[inline]
    pub fn virtual_now(&self, realtime: f64) -> f64 {
        self.start_timestamp - self.current_delay + (realtime - self.start_realtime)
    }

    #[inline]
    pub fn current_delay(&self) -> f64 {
        self.current_delay
    }

    #[inline]
    pub fn last_received(&self) -> Option<ReceivedMark> {
        self.last_received
    }

    /// Times the delay exceeded [`MAX_DELAY_TIME`] and was reset.
    #[inline]
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}
