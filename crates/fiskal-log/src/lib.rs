// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiskal Log — the transaction / system log state machine and the record
// parser used to verify records out of band.  This crate bridges between the
// DER codec in `fiskal-der` and the signing core in `fiskal-security`.

pub mod payload;
pub mod record;
pub mod tse;

pub use record::{ParsedRecord, verify_record};
pub use tse::Tse;
