// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Default locations when no config file names them.

use std::path::PathBuf;

/// `$XDG_DATA_HOME/fiskal`, falling back to `~/.local/share/fiskal`.
pub fn data_dir() -> PathBuf {
    base_dir().join("fiskal")
}

/// Where the TSE key lives when the config does not say.
pub fn default_key_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("tse-key.p8")
}

fn base_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // No home directory at all; keep data next to the working directory.
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lives_inside_data_dir() {
        let dir = PathBuf::from("/var/lib/fiskal");
        assert_eq!(default_key_path(&dir), dir.join("tse-key.p8"));
    }

    #[test]
    fn data_dir_ends_in_fiskal() {
        assert!(data_dir().ends_with("fiskal"));
    }
}
