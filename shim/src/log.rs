//! Re-exports of the leveled tracing macros used throughout this crate, plus
//! `log!`, a thin alias for the frequent, verbose handler-transition traces
//! (compiled to a debug-level structured event). Call sites use
//! `crate::log!`/`crate::{trace, warn}` the same way regardless of which one
//! they reach for, mirroring the reference codebase's own macro surface.

pub use tracing::{debug, error, info, trace, warn};

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}
