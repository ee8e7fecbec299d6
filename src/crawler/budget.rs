//! Global fetch budget
//!
//! Enforces the run-wide fetch cap and deadline. The scheduler reserves one
//! unit per remote fetch, in frontier order, before it spawns any fetch task
//! for a level; once a reservation is refused every later one is refused too.
//!
//! A reservation does not guarantee the fetch goes out: fetch tasks carry a
//! copy of the [`Deadline`] and re-check it once they hold a concurrency
//! permit and before every retry.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Why a crawl stopped issuing fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// The configured `max-fetches` was used up
    FetchCap,

    /// The configured deadline passed
    Deadline,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchCap => write!(f, "fetch cap reached"),
            Self::Deadline => write!(f, "deadline passed"),
        }
    }
}

/// A point in time after which no new request may start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline `after` from now
    pub fn after(after: Duration) -> Self {
        Self(Some(Instant::now() + after))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn passed(&self) -> bool {
        matches!(self.0, Some(deadline) if Instant::now() >= deadline)
    }
}

/// Counts remote fetches against the cap and checks the deadline
#[derive(Debug)]
pub struct FetchBudget {
    max_fetches: Option<u64>,
    deadline: Deadline,
    used: u64,
    halted: Option<HaltReason>,
}

impl FetchBudget {
    /// Creates a budget; `None` means unlimited
    ///
    /// # Arguments
    ///
    /// * `max_fetches` - Maximum number of remote fetches for the run
    /// * `deadline` - Time allowed from now
    pub fn new(max_fetches: Option<u64>, deadline: Option<Duration>) -> Self {
        Self {
            max_fetches,
            deadline: deadline.map_or_else(Deadline::none, Deadline::after),
            used: 0,
            halted: None,
        }
    }

    /// Reserves one remote fetch
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The fetch may be issued
    /// * `Err(HaltReason)` - The budget is exhausted; it stays exhausted
    pub fn try_acquire(&mut self) -> Result<(), HaltReason> {
        if let Some(reason) = self.halted {
            return Err(reason);
        }

        if self.deadline.passed() {
            tracing::warn!("Deadline passed after {} fetches", self.used);
            self.halted = Some(HaltReason::Deadline);
            return Err(HaltReason::Deadline);
        }

        if matches!(self.max_fetches, Some(max) if self.used >= max) {
            tracing::warn!("Fetch cap of {} reached", self.used);
            self.halted = Some(HaltReason::FetchCap);
            return Err(HaltReason::FetchCap);
        }

        self.used += 1;
        Ok(())
    }

    /// Returns true once the deadline has passed, and halts the budget
    pub fn check_deadline(&mut self) -> bool {
        if self.halted.is_none() && self.deadline.passed() {
            tracing::warn!("Deadline passed after {} fetches", self.used);
            self.halted = Some(HaltReason::Deadline);
        }
        self.halted == Some(HaltReason::Deadline)
    }

    /// The run's deadline, for fetch tasks to check on their own
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Number of fetches reserved so far
    pub fn used(&self) -> u64 {
        self.used
    }

    /// The reason the budget stopped granting fetches, if it has
    pub fn halted(&self) -> Option<HaltReason> {
        self.halted
    }
}
