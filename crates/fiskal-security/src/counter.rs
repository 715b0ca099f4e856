// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gap-free monotonic counters (signature counter, transaction counter).

use fiskal_core::error::{FiskalError, Result};

/// Highest value a counter may ever reach. The step to `u64::MAX` is refused.
pub const COUNTER_CEILING: u64 = u64::MAX - 1;

/// A `u64` that only moves forward by exactly one.
///
/// Advancing is split into [`MonotonicCounter::peek_next`], which checks the
/// ceiling without touching the value, and [`MonotonicCounter::commit`],
/// which moves to that value.  Callers that must do fallible work between
/// the two (signing) can bail out with the counter untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonotonicCounter {
    value: u64,
}

impl MonotonicCounter {
    /// Resume from a persisted value.
    pub fn starting_at(value: u64) -> Result<Self> {
        if value > COUNTER_CEILING {
            return Err(FiskalError::Config(format!(
                "counter start {value} exceeds the ceiling {COUNTER_CEILING}"
            )));
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// The value the next increment would produce, or `None` at the ceiling.
    pub fn peek_next(&self) -> Option<u64> {
        if self.value >= COUNTER_CEILING {
            None
        } else {
            Some(self.value + 1)
        }
    }

    /// Move to `next`, which must be the value [`peek_next`] returned.
    ///
    /// [`peek_next`]: MonotonicCounter::peek_next
    pub fn commit(&mut self, next: u64) -> Result<()> {
        if self.peek_next() != Some(next) {
            return Err(FiskalError::Internal(format!(
                "counter at {} cannot move to {next}",
                self.value
            )));
        }
        self.value = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(counter: &mut MonotonicCounter) -> Option<u64> {
        let next = counter.peek_next()?;
        counter.commit(next).unwrap();
        Some(next)
    }

    #[test]
    fn advances_without_gaps() {
        let mut counter = MonotonicCounter::starting_at(41).unwrap();
        let seen: Vec<u64> = (0..5).filter_map(|_| step(&mut counter)).collect();
        assert_eq!(seen, vec![42, 43, 44, 45, 46]);
        assert_eq!(counter.value(), 46);
    }

    #[test]
    fn refuses_last_step() {
        let mut counter = MonotonicCounter::starting_at(COUNTER_CEILING - 1).unwrap();
        assert_eq!(step(&mut counter), Some(COUNTER_CEILING));
        assert_eq!(step(&mut counter), None);
        assert!(counter.commit(u64::MAX).is_err());
        assert_eq!(counter.value(), COUNTER_CEILING);
    }

    #[test]
    fn start_above_ceiling_rejected() {
        assert!(MonotonicCounter::starting_at(u64::MAX).is_err());
        assert!(MonotonicCounter::starting_at(COUNTER_CEILING).is_ok());
    }

    #[test]
    fn commit_requires_the_peeked_value() {
        let mut counter = MonotonicCounter::starting_at(3).unwrap();
        assert!(counter.commit(5).unwrap_err().is_invariant_violation());
        assert_eq!(counter.value(), 3);

        let next = counter.peek_next().unwrap();
        counter.commit(next).unwrap();
        assert_eq!(counter.value(), 4);
    }
}
