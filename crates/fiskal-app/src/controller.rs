// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Controller: the TSE together with its record store and snapshot file.
//
// Input is validated before anything is signed, every signed record goes
// straight into the store, and shutdown drains open transactions before the
// counters are persisted.

use chrono::{DateTime, Utc};
use fiskal_core::TseConfig;
use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{LogOutCause, StateSnapshot, UserRole};
use fiskal_der::TlvNode;
use fiskal_log::{ParsedRecord, Tse};
use fiskal_store::{RecordStore, SnapshotFile};
use tracing::{error, info, instrument, warn};

/// Reject empty values and anything a PrintableString cannot carry.
fn require_printable(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(FiskalError::InvalidInput {
            field,
            reason: "must not be empty".into(),
        });
    }
    TlvNode::printable_string(value)
        .map(|_| ())
        .map_err(|e| FiskalError::InvalidInput {
            field,
            reason: e.to_string(),
        })
}

/// Raise the snapshot to what the store proves was already signed.
///
/// A crash between signing and persisting leaves the snapshot behind the
/// store; resuming from it would reuse counters.
fn reconcile(mut snapshot: StateSnapshot, store: &RecordStore) -> Result<StateSnapshot> {
    if let Some(latest) = store.latest()? {
        if latest.signature_counter > snapshot.signature_counter {
            warn!(
                snapshot = snapshot.signature_counter,
                store = latest.signature_counter,
                "snapshot behind record store, resuming signature counter from store"
            );
            snapshot.signature_counter = latest.signature_counter;
        }
    }
    if let Some(number) = store.max_transaction_number()? {
        if number > snapshot.transaction_counter {
            warn!(
                snapshot = snapshot.transaction_counter,
                store = number,
                "snapshot behind record store, resuming transaction counter from store"
            );
            snapshot.transaction_counter = number;
        }
    }
    Ok(snapshot)
}

pub struct Controller {
    tse: Tse,
    store: RecordStore,
    snapshot: SnapshotFile,
    closing_client_id: String,
    shut_down: bool,
}

impl Controller {
    /// Open store and snapshot under `config.data_dir` and resume the TSE.
    #[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
    pub fn open(config: &TseConfig) -> Result<Self> {
        let store = RecordStore::open(config.store_path())?;
        let snapshot = SnapshotFile::new(config.snapshot_path());
        let state = reconcile(snapshot.load()?, &store)?;
        let tse = Tse::from_config(config, &state)?;
        Self::from_parts(tse, store, snapshot, &config.closing_client_id)
    }

    /// The closing client id signs the drain records, so it is checked here
    /// rather than at shutdown.
    pub fn from_parts(
        tse: Tse,
        store: RecordStore,
        snapshot: SnapshotFile,
        closing_client_id: &str,
    ) -> Result<Self> {
        require_printable("closing_client_id", closing_client_id)?;
        Ok(Self {
            tse,
            store,
            snapshot,
            closing_client_id: closing_client_id.to_owned(),
            shut_down: false,
        })
    }

    pub fn tse(&self) -> &Tse {
        &self.tse
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    #[allow(dead_code)]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn admit(&self, operation: &str) -> Result<()> {
        if self.shut_down {
            warn!(operation, "refused: TSE is shut down");
            return Err(FiskalError::ShutDown);
        }
        Ok(())
    }

    fn keep(&self, record: Result<Vec<u8>>) -> Result<ParsedRecord> {
        let record = record.inspect_err(|e| warn!(error = %e, "operation refused"))?;
        self.store.append(&record).inspect_err(|e| {
            error!(error = %e, "signed record could not be stored");
        })
    }

    // -- Transactions ---------------------------------------------------------

    pub fn start_transaction(
        &self,
        client_id: &str,
        process_data: &[u8],
        process_type: &str,
        additional_data: Option<&[u8]>,
    ) -> Result<ParsedRecord> {
        self.admit("start_transaction")?;
        require_printable("client_id", client_id)?;
        require_printable("process_type", process_type)?;
        self.keep(
            self.tse
                .start_transaction(client_id, process_data, process_type, additional_data),
        )
    }

    pub fn update_transaction(
        &self,
        client_id: &str,
        transaction_number: u64,
        process_data: &[u8],
        process_type: &str,
    ) -> Result<ParsedRecord> {
        self.admit("update_transaction")?;
        require_printable("client_id", client_id)?;
        require_printable("process_type", process_type)?;
        self.keep(self.tse.update_transaction(
            client_id,
            transaction_number,
            process_data,
            process_type,
        ))
    }

    pub fn finish_transaction(
        &self,
        client_id: &str,
        transaction_number: u64,
        process_data: &[u8],
        process_type: &str,
        additional_data: Option<&[u8]>,
    ) -> Result<ParsedRecord> {
        self.admit("finish_transaction")?;
        require_printable("client_id", client_id)?;
        require_printable("process_type", process_type)?;
        self.keep(self.tse.finish_transaction(
            client_id,
            transaction_number,
            process_data,
            process_type,
            additional_data,
        ))
    }

    // -- System operations ----------------------------------------------------

    pub fn initialize(&self, description: Option<&str>) -> Result<ParsedRecord> {
        self.admit("initialize")?;
        if let Some(text) = description {
            require_printable("description", text)?;
        }
        self.keep(self.tse.initialize(description))
    }

    pub fn update_time(&self, new_time: Option<DateTime<Utc>>) -> Result<ParsedRecord> {
        self.admit("update_time")?;
        self.keep(self.tse.update_time(new_time))
    }

    pub fn disable(&self) -> Result<ParsedRecord> {
        self.admit("disable")?;
        self.keep(self.tse.disable())
    }

    pub fn authenticate_user(
        &self,
        user_id: &str,
        role: Option<UserRole>,
        authenticated: bool,
    ) -> Result<ParsedRecord> {
        self.admit("authenticate_user")?;
        require_printable("user_id", user_id)?;
        self.keep(self.tse.authenticate_user(user_id, role, authenticated))
    }

    pub fn log_out(&self, user_id: &str, cause: LogOutCause) -> Result<ParsedRecord> {
        self.admit("log_out")?;
        require_printable("user_id", user_id)?;
        self.keep(self.tse.log_out(user_id, cause))
    }

    pub fn unblock_user(&self, user_id: &str, unblocked: bool) -> Result<ParsedRecord> {
        self.admit("unblock_user")?;
        require_printable("user_id", user_id)?;
        self.keep(self.tse.unblock_user(user_id, unblocked))
    }

    /// Write the current counters and clock offset to the snapshot file.
    pub fn persist(&self) -> Result<StateSnapshot> {
        let state = self.tse.snapshot()?;
        self.snapshot.save(&state)?;
        Ok(state)
    }

    /// Stop admitting work, finish every open transaction as the closing
    /// client, then persist the snapshot.
    ///
    /// Returns how many transactions were drained.  Calling it again only
    /// re-persists.  A transaction that cannot be finished does not stop the
    /// drain; the snapshot is written either way and the first failure is
    /// returned afterwards.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) -> Result<usize> {
        self.shut_down = true;

        let open = self.tse.open_transaction_numbers()?;
        let mut drained = 0;
        let mut first_failure = None;
        for &number in &open {
            let record = self.tse.finish_transaction(
                &self.closing_client_id,
                number,
                &[],
                &self.closing_client_id,
                None,
            );
            match self.keep(record) {
                Ok(_) => drained += 1,
                Err(e) => {
                    error!(transaction = number, error = %e, "could not drain transaction");
                    first_failure.get_or_insert(e);
                }
            }
        }
        info!(drained, open = open.len(), "drain complete");

        self.persist()?;
        match first_failure {
            Some(e) => Err(e),
            None => Ok(drained),
        }
    }
}
