// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! fiskal-security — the signing core of the simulated TSE.
//!
//! Owns everything that makes a record tamper-evident: the elliptic-curve key
//! and its two supported schemes, the monotonic signature counter, the
//! bounded simulated clock and the certificate validity check.  The
//! [`SigningCore`] ties them together and produces the signed trailer of
//! every log record.

pub mod algorithm;
pub mod certificate;
pub mod clock;
pub mod counter;
pub mod integrity;
pub mod signer;

// PUBLIC API: Re-export the signing primitives
pub use algorithm::{EcdsaKey, SignatureAlgorithm, check_public_key, verify_signature};
pub use certificate::is_certificate_expired;
pub use clock::SimulatedClock;
pub use counter::{COUNTER_CEILING, MonotonicCounter};
pub use integrity::{hash_bytes, serial_number};
pub use signer::SigningCore;
