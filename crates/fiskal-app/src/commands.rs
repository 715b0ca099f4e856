// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations for the `fiskal` binary.

use std::path::{Path, PathBuf};

use fiskal_core::TseConfig;
use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{LogOutCause, UserRole};
use fiskal_log::verify_record;
use fiskal_security::{EcdsaKey, SignatureAlgorithm, SimulatedClock, is_certificate_expired};
use fiskal_store::{RecordStore, SnapshotFile};
use serde::Serialize;
use tracing::{info, warn};

use crate::controller::Controller;
use crate::data_dir;

/// Load `config_path` (or the defaults) and apply the `--data-dir` override.
///
/// With neither a config file nor an override the per-user data directory is
/// used instead of the working directory.
pub fn resolve_config(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<TseConfig> {
    let mut config = match config_path {
        Some(path) => TseConfig::load(path)?,
        None => TseConfig {
            data_dir: data_dir::data_dir(),
            ..TseConfig::default()
        },
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn key_path(config: &TseConfig) -> PathBuf {
    config
        .key_path
        .clone()
        .unwrap_or_else(|| data_dir::default_key_path(&config.data_dir))
}

/// Make sure a key file exists and the config points at it, so records
/// signed now can be verified by later runs.
pub fn ensure_key(config: &mut TseConfig) -> Result<()> {
    let path = key_path(config);
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        EcdsaKey::generate(config.signature_scheme)?.save(&path)?;
        info!(path = %path.display(), "generated new TSE key");
    }
    config.key_path = Some(path);
    Ok(())
}

fn load_public_key(config: &TseConfig) -> Result<Vec<u8>> {
    let path = key_path(config);
    if !path.exists() {
        return Err(FiskalError::Config(format!(
            "no TSE key at {}; run `fiskal demo` first or set key_path",
            path.display()
        )));
    }
    let key = EcdsaKey::load(config.signature_scheme, &path)?;
    Ok(key.public_key().to_vec())
}

// ---------------------------------------------------------------------------
// init-config
// ---------------------------------------------------------------------------

pub fn init_config(config: &TseConfig, path: &Path) -> Result<()> {
    config.validate()?;
    config.save(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// demo
// ---------------------------------------------------------------------------

/// Scripted session: initialise, log in, run `transactions` sales (the last
/// one left open), adjust the clock, log out and shut down.
pub fn demo(mut config: TseConfig, transactions: u32) -> Result<()> {
    ensure_key(&mut config)?;
    let mut ctl = Controller::open(&config)?;

    ctl.initialize(Some("Fiskal demo register"))?;
    ctl.authenticate_user("admin", Some(UserRole::Admin), true)?;
    ctl.authenticate_user("intruder", None, false)?;
    ctl.unblock_user("intruder", true)?;

    for i in 1..=transactions {
        let client = format!("POS-{i}");
        let start = ctl.start_transaction(&client, b"", "Kassenbeleg-V1", None)?;
        let number = start.transaction_number.unwrap_or_default();
        println!(
            "started transaction {number} (signature counter {})",
            start.signature_counter
        );

        let receipt = format!("Beleg^{i}.00_0.00_0.00_0.00_0.00^{i}.00:Bar");
        ctl.update_transaction(&client, number, receipt.as_bytes(), "Kassenbeleg-V1")?;
        if i < transactions {
            let finish = ctl.finish_transaction(
                &client,
                number,
                receipt.as_bytes(),
                "Kassenbeleg-V1",
                Some(b"demo"),
            )?;
            println!(
                "finished transaction {number} (signature counter {})",
                finish.signature_counter
            );
        }
    }

    ctl.update_time(None)?;
    ctl.log_out("admin", LogOutCause::User)?;

    let open = ctl.tse().open_transaction_count()?;
    let drained = ctl.shutdown()?;
    if drained != open {
        warn!(open, drained, "drain count differs from open count");
    }

    let state = ctl.tse().snapshot()?;
    println!(
        "shut down: drained {drained} open transaction(s), {} records stored, signature counter {}",
        ctl.store().count()?,
        state.signature_counter
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// disable
// ---------------------------------------------------------------------------

/// Record that the TSE was taken out of service.
pub fn disable(mut config: TseConfig) -> Result<()> {
    ensure_key(&mut config)?;
    let mut ctl = Controller::open(&config)?;
    let record = ctl.disable()?;
    let drained = ctl.shutdown()?;
    println!(
        "disabled at signature counter {} (drained {drained} open transaction(s))",
        record.signature_counter
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

/// Re-verify every stored record.  Returns the number of failures.
pub fn verify(config: &TseConfig) -> Result<usize> {
    let public_key = load_public_key(config)?;
    let store = RecordStore::open(config.store_path())?;

    let mut checked = 0usize;
    let mut failures = 0usize;
    let mut expected_counter = None;
    for row in store.range(0, u64::MAX)? {
        checked += 1;
        let mut problems = Vec::new();

        if !row.digest_matches() {
            problems.push("digest mismatch".to_owned());
        }
        match verify_record(&row.record, &public_key) {
            Ok(true) => {}
            Ok(false) => problems.push("bad signature".to_owned()),
            Err(e) => problems.push(format!("not verifiable: {e}")),
        }
        if let Some(expected) = expected_counter {
            if row.signature_counter != expected {
                problems.push(format!("counter gap, expected {expected}"));
            }
        }
        expected_counter = row.signature_counter.checked_add(1);

        if !problems.is_empty() {
            failures += 1;
            println!(
                "record {} ({}): {}",
                row.signature_counter,
                row.operation,
                problems.join(", ")
            );
        }
    }

    println!("{checked} record(s) checked, {failures} failure(s)");
    Ok(failures)
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Status {
    pub data_dir: PathBuf,
    pub scheme: String,
    pub serial_number: Option<String>,
    pub signature_counter: u64,
    pub transaction_counter: u64,
    pub clock_offset_secs: i64,
    pub tse_time: String,
    pub certificate_expired: bool,
    pub stored_records: u64,
    pub latest_operation: Option<String>,
}

/// Read-only view of the persisted state; signs nothing.
pub fn status(config: &TseConfig) -> Result<Status> {
    let snapshot = SnapshotFile::new(config.snapshot_path()).load()?;
    let store = RecordStore::open(config.store_path())?;
    let clock = SimulatedClock::with_offset(snapshot.clock_offset_secs)?;

    let serial_number = match load_public_key(config) {
        Ok(public_key) => Some(hex::encode(fiskal_security::serial_number(&public_key)?)),
        Err(e) => {
            warn!(error = %e, "no key available for serial number");
            None
        }
    };

    Ok(Status {
        data_dir: config.data_dir.clone(),
        scheme: config.signature_scheme.to_string(),
        serial_number,
        signature_counter: snapshot.signature_counter,
        transaction_counter: snapshot.transaction_counter,
        clock_offset_secs: snapshot.clock_offset_secs,
        tse_time: clock.now().to_rfc3339(),
        certificate_expired: is_certificate_expired(&config.certificate, clock.now()),
        stored_records: store.count()?,
        latest_operation: store.latest()?.map(|r| r.operation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> TseConfig {
        resolve_config(None, Some(dir.to_path_buf())).unwrap()
    }

    #[test]
    fn demo_then_verify_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        demo(config.clone(), 3).unwrap();
        assert_eq!(verify(&config).unwrap(), 0);

        let status = status(&config).unwrap();
        // init, 2 auth, unblock, 3 x (start + update), 2 finish, update
        // time, log out, 1 drained finish.
        assert_eq!(status.stored_records, 15);
        assert_eq!(status.signature_counter, 15);
        assert_eq!(status.transaction_counter, 3);
        assert_eq!(status.latest_operation.as_deref(), Some("FinishTransaction"));
        assert_eq!(status.serial_number.map(|s| s.len()), Some(64));
        assert!(!status.certificate_expired);
    }

    #[test]
    fn demo_twice_continues_counters() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        demo(config.clone(), 1).unwrap();
        let first = status(&config).unwrap().signature_counter;
        demo(config.clone(), 1).unwrap();
        assert!(status(&config).unwrap().signature_counter > first);
        assert_eq!(verify(&config).unwrap(), 0);
    }

    #[test]
    fn disable_after_demo_is_stored_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        demo(config.clone(), 1).unwrap();
        disable(config.clone()).unwrap();

        let status = status(&config).unwrap();
        assert_eq!(status.latest_operation.as_deref(), Some("Disable"));
        assert_eq!(status.signature_counter, status.stored_records);
        assert_eq!(verify(&config).unwrap(), 0);
    }

    #[test]
    fn verify_without_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            verify(&config_in(dir.path())),
            Err(FiskalError::Config(_))
        ));
    }

    #[test]
    fn init_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiskal.json");
        let config = config_in(dir.path());
        init_config(&config, &path).unwrap();

        let loaded = resolve_config(Some(&path), None).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.max_open_transactions, 512);
    }
}
