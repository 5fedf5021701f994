//! Wall-clock budget accounting.
//!
//! Every unit of work a strategy performs is charged, including session
//! setup. Time the actuation layer declares free (session teardown) is
//! refunded, but a refund can never lift `remaining` above `total`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    total: i64,
    remaining: i64,
}

impl Budget {
    #[must_use]
    pub fn new(total_millis: i64) -> Self {
        Self {
            total: total_millis,
            remaining: total_millis,
        }
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.total
    }

    #[must_use]
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }

    pub fn charge(&mut self, millis: u64) {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        self.remaining = self.remaining.saturating_sub(millis);
    }

    pub fn refund(&mut self, millis: u64) {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        self.remaining = self.remaining.saturating_add(millis).min(self.total);
    }

    /// Milliseconds consumed so far (never negative).
    #[must_use]
    pub fn spent(&self) -> i64 {
        (self.total - self.remaining).max(0)
    }
}
