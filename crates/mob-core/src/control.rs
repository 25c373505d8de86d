//! Run Control
//!
//! Pause, pacing and stop requests shared between the epoch loop and
//! whoever drives it. Checked only between epochs, never inside one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RunControl {
    paused: Mutex<bool>,
    resumed: Condvar,
    delay_us: AtomicU64,
    stop: AtomicBool,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_us(delay_us: u64) -> Self {
        let control = Self::new();
        control.set_delay_us(delay_us);
        control
    }

    pub fn pause(&self) {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn resume(&self) {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.resumed.notify_all();
    }

    /// Flips the pause state and returns the new one.
    pub fn toggle_pause(&self) -> bool {
        let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        *paused = !*paused;
        if !*paused {
            self.resumed.notify_all();
        }
        *paused
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep inserted after every epoch, in microseconds.
    pub fn set_delay_us(&self, delay_us: u64) {
        self.delay_us.store(delay_us, Ordering::Relaxed);
    }

    pub fn delay_us(&self) -> u64 {
        self.delay_us.load(Ordering::Relaxed)
    }

    /// Asks the loop to finish after the epoch in progress. Also releases a
    /// paused loop.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _guard = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        self.resumed.notify_all();
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Blocks while paused, unless a stop is requested.
    pub fn wait_if_paused(&self) {
        let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        while *paused && !self.should_stop() {
            paused = self
                .resumed
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Sleeps for the configured delay, if any.
    pub fn pace(&self) {
        let delay = self.delay_us();
        if delay > 0 {
            thread::sleep(Duration::from_micros(delay));
        }
    }
}
