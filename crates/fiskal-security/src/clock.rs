// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated TSE clock: host wall-clock time shifted by a signed offset.
//
// The shown time must stay inside [2019-01-01T00:00:00Z, 2100-01-01T00:00:00Z).
// A mutation that would leave that window is refused and the clock keeps its
// previous offset.

use chrono::{DateTime, Duration, Utc};
use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{CLOCK_LOWER_BOUND, CLOCK_UPPER_BOUND};
use tracing::debug;

/// Host time plus an offset in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedClock {
    offset_secs: i64,
}

impl SimulatedClock {
    /// Clock following host time exactly.
    pub fn system() -> Self {
        Self { offset_secs: 0 }
    }

    /// Restore a clock from a persisted offset.
    pub fn with_offset(offset_secs: i64) -> Result<Self> {
        let shown = Utc::now()
            .timestamp()
            .checked_add(offset_secs)
            .ok_or(FiskalError::InvalidTime(i64::MAX))?;
        check_bounds(shown)?;
        Ok(Self { offset_secs })
    }

    /// Current TSE time.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.offset_secs)
    }

    /// Current TSE time in Unix seconds.
    pub fn unix_time(&self) -> i64 {
        self.now().timestamp()
    }

    /// Offset from host time, for persistence.
    pub fn offset_secs(&self) -> i64 {
        self.offset_secs
    }

    /// Move the clock so that it currently shows `instant`.
    pub fn set(&mut self, instant: DateTime<Utc>) -> Result<()> {
        let target = instant.timestamp();
        check_bounds(target)?;
        self.offset_secs = target - Utc::now().timestamp();
        debug!(target, offset = self.offset_secs, "simulated clock set");
        Ok(())
    }

    /// Drop the offset and follow host time again.
    pub fn resync(&mut self) {
        self.offset_secs = 0;
        debug!("simulated clock resynchronised with host time");
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::system()
    }
}

fn check_bounds(unix_secs: i64) -> Result<()> {
    if (CLOCK_LOWER_BOUND..CLOCK_UPPER_BOUND).contains(&unix_secs) {
        Ok(())
    } else {
        Err(FiskalError::InvalidTime(unix_secs))
    }
}
