//! Time source used for token expiry.

use chrono::{DateTime, Utc};

/// Supplies the current wall-clock time.
///
/// Token expiry is always evaluated against a `Clock` so tests can move time
/// forward without sleeping.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
