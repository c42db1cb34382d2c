//! Enrollment gate
//!
//! While a multi-step enrollment runs on the reader, only the cancel command
//! may be written. The flag is set by whoever drives the enrollment and is
//! forced back to idle when the reader closes.

use std::sync::atomic::{AtomicBool, Ordering};

use sm25_core::SendCommand;

/// Enrollment session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    Idle,
    Active,
}

/// Session-scoped enrollment flag
#[derive(Debug, Default)]
pub struct EnrollmentGate {
    active: AtomicBool,
}

impl EnrollmentGate {
    /// Create an idle gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an enrollment as started
    pub fn begin(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Mark the enrollment as finished
    pub fn end(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Current state
    pub fn state(&self) -> EnrollmentState {
        if self.is_active() {
            EnrollmentState::Active
        } else {
            EnrollmentState::Idle
        }
    }

    /// Check if an enrollment is in progress
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Check if `command` may be written now
    pub fn permits(&self, command: &SendCommand) -> bool {
        command.is_cancel() || !self.is_active()
    }
}
