//! Small shared helpers for the runtime.
pub mod delayed_init;
