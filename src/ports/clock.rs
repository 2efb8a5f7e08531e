//! Clock port.
//!
//! Validation is deterministic for a fixed `now`; injecting the clock keeps
//! boundary behavior testable.

use crate::domain::foundation::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
