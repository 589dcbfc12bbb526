//! Interrupt handling for builds (SIGINT/SIGTERM)
//!
//! On the first interrupt:
//! 1. The running tile engine sees the signal too and is allowed to exit
//! 2. No further slices are started
//! 3. The work directory is cleaned up as usual
//! 4. mapt exits with code 130
//!
//! On a second interrupt the running engine is killed and mapt exits at once.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Exit code for cancelled builds (128 + SIGINT)
pub const EXIT_CODE_CANCELLED: i32 = 130;

/// Shared interrupt flags
#[derive(Debug, Default)]
pub struct InterruptState {
    cancel_requested: AtomicBool,
    immediate_exit: AtomicBool,
    signal_count: AtomicU8,
}

impl InterruptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Second interrupt received
    pub fn is_immediate_exit(&self) -> bool {
        self.immediate_exit.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record an interrupt and decide what to do about it
    pub fn handle_signal(&self) -> InterruptAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);

        match count {
            0 => {
                self.cancel_requested.store(true, Ordering::SeqCst);
                InterruptAction::Cancel
            }
            1 => {
                self.immediate_exit.store(true, Ordering::SeqCst);
                InterruptAction::ImmediateExit
            }
            _ => InterruptAction::Ignore,
        }
    }
}

/// Action to take after an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Finish the current engine run, start nothing new
    Cancel,
    /// Kill the engine and stop now
    ImmediateExit,
    Ignore,
}

/// Installs the process-wide interrupt handler
pub struct InterruptHandler {
    state: Arc<InterruptState>,
}

impl InterruptHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(InterruptState::new()),
        }
    }

    pub fn state(&self) -> Arc<InterruptState> {
        Arc::clone(&self.state)
    }

    /// Install the handler. Call once at startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            InterruptAction::Cancel => {
                warn!("interrupted; finishing the current engine run, then stopping");
            }
            InterruptAction::ImmediateExit => {
                warn!("interrupted again; stopping now");
            }
            InterruptAction::Ignore => {}
        })
    }
}

impl Default for InterruptHandler {
    fn default() -> Self {
        Self::new()
    }
}
