//! Shared test utilities for token lifecycle testing.
//!
//! Feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! uptime-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use uptime_authn::testutil::{ManualClock, SequenceIdGenerator};
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::{
    clock::Clock,
    id::{ID_LEN, IdGenerator},
};

/// Instant a [`ManualClock`] starts at by default: 2023-11-14T22:13:20Z.
pub const DEFAULT_START_MILLIS: i64 = 1_700_000_000_000;

/// A [`Clock`] that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the code
/// under test owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock() += delta;
    }

    /// Sets the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::from_timestamp_millis(DEFAULT_START_MILLIS).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Deterministic [`IdGenerator`].
///
/// Yields any scripted ids first, then `prefix` followed by a zero-padded
/// counter, always [`ID_LEN`] characters long: `tok00000000000000000`,
/// `tok00000000000000001`, ...
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: String,
    next: AtomicUsize,
    scripted: Mutex<VecDeque<String>>,
}

impl SequenceIdGenerator {
    /// Creates a generator with the given prefix.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is not shorter than [`ID_LEN`] or is not lowercase
    /// alphanumeric.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        assert!(prefix.len() < ID_LEN, "prefix {prefix:?} leaves no room for a counter");
        assert!(
            prefix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()),
            "prefix {prefix:?} must be lowercase alphanumeric"
        );
        Self { prefix: prefix.to_owned(), next: AtomicUsize::new(0), scripted: Mutex::default() }
    }

    /// Makes the generator return `ids` (in order) before counting.
    #[must_use]
    pub fn with_scripted<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripted.lock().extend(ids.into_iter().map(Into::into));
        self
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        if let Some(id) = self.scripted.lock().pop_front() {
            return id;
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let width = ID_LEN - self.prefix.len();
        format!("{}{n:0width$}", self.prefix)
    }
}

/// Assert that a [`Result`](crate::Result) is an error of the given
/// [`AuthError`](crate::AuthError) variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use uptime_authn::{AuthError, assert_auth_error};
///
/// let result: uptime_authn::Result<()> = Err(AuthError::InvalidCredentials);
/// assert_auth_error!(result, InvalidCredentials);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {{
        let result = $result;
        assert!(
            matches!(result, Err($crate::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            result,
        );
    }};
    ($result:expr, $variant:ident, $msg:expr) => {{
        let result = $result;
        assert!(
            matches!(result, Err($crate::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            result,
        );
    }};
}
