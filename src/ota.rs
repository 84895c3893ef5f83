//! Firmware-update lifecycle hooks.
//!
//! The update transport is owned by the firmware, not by this crate. The
//! bootstrap controller only polls it from `handle()` and forwards its
//! lifecycle events to an injected [`UpdateHooks`] implementation.
//!
//! # Example
//!
//! ```
//! use netboot_esp32::ota::{progress_percent, UpdateError};
//!
//! assert_eq!(progress_percent(52_000, 104_000), 50);
//! assert_eq!(UpdateError::from_code(2), Some(UpdateError::Connect));
//! ```

use log::{error, info};
use std::fmt;

/// Update failure reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// Authentication with the update host failed.
    Auth,
    /// The update could not begin (e.g. no space for the image).
    Begin,
    /// Connection to the update host failed.
    Connect,
    /// Receiving the image failed.
    Receive,
    /// Finalising the image failed.
    End,
}

impl UpdateError {
    /// Wire code used by the update protocol.
    pub fn code(&self) -> u8 {
        match self {
            Self::Auth => 0,
            Self::Begin => 1,
            Self::Connect => 2,
            Self::Receive => 3,
            Self::End => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Auth),
            1 => Some(Self::Begin),
            2 => Some(Self::Connect),
            3 => Some(Self::Receive),
            4 => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "authentication error"),
            Self::Begin => write!(f, "begin error"),
            Self::Connect => write!(f, "connection error"),
            Self::Receive => write!(f, "receive error"),
            Self::End => write!(f, "end error"),
        }
    }
}

impl std::error::Error for UpdateError {}

/// Integer progress percentage.
///
/// Computed as `current / (total / 100)`. Totals under 100 bytes would make
/// that divisor zero, so they fall back to `current * 100 / total`, and a
/// zero total reports 0.
pub fn progress_percent(current: u32, total: u32) -> u32 {
    let step = total / 100;
    if step > 0 {
        current / step
    } else if total > 0 {
        u32::try_from(u64::from(current) * 100 / u64::from(total)).unwrap_or(u32::MAX)
    } else {
        0
    }
}

/// Receiver of update lifecycle events.
pub trait UpdateHooks {
    fn on_start(&mut self);
    fn on_end(&mut self);
    fn on_progress(&mut self, current: u32, total: u32);
    fn on_error(&mut self, error: UpdateError);
}

/// Hooks that report every event through the log.
#[derive(Debug, Default)]
pub struct LogHooks {
    last_percent: Option<u32>,
}

impl LogHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateHooks for LogHooks {
    fn on_start(&mut self) {
        self.last_percent = None;
        info!("Firmware update in progress...");
    }

    fn on_end(&mut self) {
        info!("Firmware update finished");
    }

    fn on_progress(&mut self, current: u32, total: u32) {
        let percent = progress_percent(current, total);
        // One line per percent step, not per chunk.
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            info!("Update progress: {}%", percent);
        }
    }

    fn on_error(&mut self, err: UpdateError) {
        error!("Update error [{}]: {}", err.code(), err);
    }
}

/// A firmware-update transport serviced from the main loop.
///
/// `poll` must return promptly; it reports whatever happened since the
/// previous call through `hooks`.
pub trait UpdateTransport {
    fn poll(&mut self, hooks: &mut dyn UpdateHooks);
}

/// Transport for builds without firmware updates.
#[derive(Debug, Default)]
pub struct NoUpdates;

impl UpdateTransport for NoUpdates {
    fn poll(&mut self, _hooks: &mut dyn UpdateHooks) {}
}
