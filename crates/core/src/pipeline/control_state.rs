//! Pause/step/stop flags shared between the UI thread and one worker.
//!
//! `running` goes true to false once per run and is never set back. `steps`
//! is incremented only by the UI thread (while paused) and decremented only
//! by the worker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Running,
    Paused,
    Stopped,
}

/// What the worker may do at the top of an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permit {
    /// Free-running: process the next frame.
    Advance,
    /// Paused with steps pending: process one frame, then call
    /// [`ControlState::complete_step`].
    Step,
    /// Exit the loop without processing another frame.
    Stop,
}

#[derive(Debug)]
pub struct ControlState {
    running: AtomicBool,
    paused: AtomicBool,
    steps: AtomicUsize,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            steps: AtomicUsize::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pending_steps(&self) -> usize {
        self.steps.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PlaybackState {
        if !self.is_running() {
            PlaybackState::Stopped
        } else if self.is_paused() {
            PlaybackState::Paused
        } else {
            PlaybackState::Running
        }
    }

    /// Flips pause and returns the new paused value.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Queues `n` single-frame advances. Only honoured while paused and
    /// running; returns whether the steps were queued.
    pub fn request_steps(&self, n: usize) -> bool {
        if n == 0 || !self.is_running() || !self.is_paused() {
            return false;
        }
        self.steps.fetch_add(n, Ordering::AcqRel);
        true
    }

    /// Requests a cooperative stop. Returns `true` only for the call that
    /// performed the running-to-stopped transition.
    pub fn request_stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    /// Blocks the worker until it may process a frame or must stop.
    ///
    /// While paused with no pending steps the worker polls every `poll`
    /// instead of consuming frames, so control writes are seen promptly.
    pub fn await_permit(&self, poll: Duration) -> Permit {
        loop {
            if !self.is_running() {
                return Permit::Stop;
            }
            let pending = self.steps.load(Ordering::Acquire);
            if !self.is_paused() {
                // Steps left over from a resumed pause are meaningless now.
                // Subtract only what was seen, so steps queued by a racing
                // re-pause survive.
                if pending > 0 {
                    self.steps.fetch_sub(pending, Ordering::AcqRel);
                }
                return Permit::Advance;
            }
            if pending > 0 {
                return Permit::Step;
            }
            std::thread::sleep(poll);
        }
    }

    /// Consumes one pending step after a stepped frame has been processed.
    pub fn complete_step(&self) {
        let _ = self
            .steps
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Clears pause so a run that is exiting does not stay suspended.
    pub fn resume_for_exit(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Marks the run as finished; called by the worker at teardown.
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}
