//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Every module that logs through these macros declares the flag next to its
//! imports so noisy subsystems (the 1 Hz tick, the camera sampler) can be
//! silenced without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info, log_warn, log_error};
//!
//! log_info!("presence check finished in {}ms", elapsed);
//! ```
//!
//! Records keep the calling module as their target, so `RUST_LOG` filters
//! such as `focusguard::presence=debug` still apply on top of the flag.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
