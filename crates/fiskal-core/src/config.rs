// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TSE configuration. Built once and handed to the constructors that need it.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FiskalError, Result};
use crate::types::{
    CLOCK_LOWER_BOUND, CLOCK_UPPER_BOUND, CertificateValidity, SignatureScheme, ValidityWindow,
    first_unprintable,
};

/// Persistent TSE settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TseConfig {
    /// Elliptic-curve scheme used for every record signature.
    pub signature_scheme: SignatureScheme,
    /// PKCS#8 private key. A fresh key is generated when absent.
    pub key_path: Option<PathBuf>,
    /// Upper bound on simultaneously open transactions.
    pub max_open_transactions: usize,
    /// Certificate validity used for expiry checks.
    pub certificate: CertificateValidity,
    /// Directory for the record store and state snapshot.
    pub data_dir: PathBuf,
    /// Client id used when open transactions are closed on shutdown.
    pub closing_client_id: String,
}

impl Default for TseConfig {
    fn default() -> Self {
        Self {
            signature_scheme: SignatureScheme::default(),
            key_path: None,
            max_open_transactions: 512,
            certificate: CertificateValidity {
                validity: ValidityWindow {
                    not_before: DateTime::from_timestamp(CLOCK_LOWER_BOUND, 0).unwrap_or_default(),
                    not_after: DateTime::from_timestamp(CLOCK_UPPER_BOUND - 1, 0)
                        .unwrap_or_default(),
                },
                private_key_usage_period: None,
            },
            data_dir: PathBuf::from("fiskal-data"),
            closing_client_id: "TSE-Shutdown".to_owned(),
        }
    }
}

impl TseConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }

    /// Reject settings no TSE could run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_open_transactions == 0 {
            return Err(FiskalError::Config(
                "max_open_transactions must be at least 1".into(),
            ));
        }
        let window = &self.certificate.validity;
        if window.not_before > window.not_after {
            return Err(FiskalError::Config(
                "certificate not_before is after not_after".into(),
            ));
        }
        if let Some(usage) = &self.certificate.private_key_usage_period {
            if usage.not_before > usage.not_after {
                return Err(FiskalError::Config(
                    "private key usage period starts after it ends".into(),
                ));
            }
        }
        if self.closing_client_id.is_empty() {
            return Err(FiskalError::Config("closing_client_id must not be empty".into()));
        }
        if let Some(bad) = first_unprintable(&self.closing_client_id) {
            return Err(FiskalError::Config(format!(
                "closing_client_id: {bad:?} is not allowed in a PrintableString"
            )));
        }
        Ok(())
    }

    /// Location of the SQLite record store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("records.db")
    }

    /// Location of the counter / clock snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}
