// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Counter/clock snapshot persisted as JSON.

use std::io::Write;
use std::path::{Path, PathBuf};

use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::StateSnapshot;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// JSON file holding the last persisted [`StateSnapshot`].
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a reader sees either the old or the new snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file yields the zero snapshot.
    pub fn load(&self) -> Result<StateSnapshot> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => {
                let snapshot = serde_json::from_str(&json)?;
                debug!(path = %self.path.display(), "snapshot loaded");
                Ok(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting from zero");
                Ok(StateSnapshot::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, snapshot: &StateSnapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(snapshot)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| FiskalError::Io(e.error))?;

        info!(
            signature_counter = snapshot.signature_counter,
            transaction_counter = snapshot.transaction_counter,
            "state persisted"
        );
        Ok(())
    }
}
