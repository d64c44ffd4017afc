//! Validated process-control operations with critical-process protection.

pub mod executor;
pub mod guard;

pub use executor::ProcessControlExecutor;
pub use guard::{CriticalProcessEntry, CriticalProcessGuard, ProtectionLevel};
