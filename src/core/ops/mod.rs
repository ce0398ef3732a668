//! core::ops
//!
//! Guards held for the length of one publish run. Right now that is only
//! the per-repository [`RunLock`]; the engine takes it before its first
//! git command.

pub mod lock;

pub use lock::{LockError, RunLock};
