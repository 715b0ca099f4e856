// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiskal Store: durable home for signed log records (SQLite) and for the
// counter/clock snapshot that lets a TSE resume after a restart.

pub mod records;
pub mod snapshot;

pub use records::{RecordStore, StoredRecord};
pub use snapshot::SnapshotFile;
