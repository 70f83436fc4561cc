//! Wall-clock delay and manual-advance adapters.
//!
//! - [`SystemDelay`] implements [`DelayPort`] with `std::thread::sleep`
//!   and hands manual waits to a shared [`ManualAdvance`].
//! - [`ManualAdvance`] is a one-slot signal.  A trigger only counts while
//!   the sequencer is actually waiting; triggers at any other time are
//!   dropped, so an early keypress cannot skip a future wait.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info};

use crate::app::ports::DelayPort;

// ---------------------------------------------------------------------------
// Manual advance
// ---------------------------------------------------------------------------

pub struct ManualAdvance {
    waiting: AtomicBool,
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ManualAdvance {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualAdvance {
    pub const fn new() -> Self {
        Self {
            waiting: AtomicBool::new(false),
            signal: Signal::new(),
        }
    }

    /// Release a waiting sequencer.  Returns whether anyone was waiting.
    pub fn trigger(&self) -> bool {
        if self.waiting.load(Ordering::Acquire) {
            self.signal.signal(());
            true
        } else {
            debug!("Advance: ignored, sequencer not waiting");
            false
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    /// Block until [`trigger`](Self::trigger) is called.
    pub fn wait(&self) {
        self.signal.reset();
        self.waiting.store(true, Ordering::Release);
        futures_lite::future::block_on(self.signal.wait());
        self.waiting.store(false, Ordering::Release);
    }
}

/// Turn every line on stdin into a manual-advance trigger.
pub fn spawn_stdin_advance(advance: Arc<ManualAdvance>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("advance".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() {
                    break;
                }
                advance.trigger();
            }
            debug!("Advance: stdin closed");
        })
}

// ---------------------------------------------------------------------------
// System delay
// ---------------------------------------------------------------------------

pub struct SystemDelay {
    advance: Arc<ManualAdvance>,
}

impl SystemDelay {
    pub fn new(advance: Arc<ManualAdvance>) -> Self {
        Self { advance }
    }
}

impl DelayPort for SystemDelay {
    fn sleep(&mut self, secs: f64) {
        if secs > 0.0 && secs.is_finite() {
            thread::sleep(Duration::from_secs_f64(secs));
        }
    }

    fn await_advance(&mut self) {
        info!("Press enter to continue (manual mode enabled)");
        self.advance.wait();
    }
}
