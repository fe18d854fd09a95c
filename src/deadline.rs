//! Caller-supplied deadlines for store and query operations.
//!
//! A [`Deadline`] bounds both the wait for a pooled connection and the
//! statements run on it. `Deadline::none()` never expires.

use crate::db::WikiError;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    pub const NONE: Deadline = Deadline(None);

    pub fn none() -> Self {
        Self::NONE
    }

    /// Expires `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Expires at the given instant.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Returns `DeadlineExceeded` once the deadline has passed.
    pub fn check(&self) -> Result<(), WikiError> {
        if self.is_expired() {
            Err(WikiError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// The earlier of this deadline and `limit`.
    pub(crate) fn cap(&self, limit: Instant) -> Instant {
        match self.0 {
            Some(at) if at < limit => at,
            _ => limit,
        }
    }
}
