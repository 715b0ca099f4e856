// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The TSE log state machine.
//
// Per transaction number:
//
//   absent --start--> open --finish--> absent
//                      |  ^
//                      +--+ update
//
// One mutex guards the signature counter, transaction counter, open table
// and clock together.  Every record is built, signed and committed while
// holding it, so the order of signature counters equals call order and a
// failed call leaves no trace.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use fiskal_core::TseConfig;
use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{LogOutCause, OperationType, SignatureScheme, StateSnapshot, UserRole};
use fiskal_der::TlvNode;
use fiskal_security::{MonotonicCounter, SigningCore};
use tracing::{debug, info, instrument};

use crate::payload::{
    Signatory, TransactionFields, authenticate_user_data, disable_data, initialize_data,
    log_out_data, system_payload, transaction_payload, unblock_user_data, update_time_data,
};

/// Mutable state behind the instance lock.
struct TseState {
    signer: SigningCore,
    transaction_counter: MonotonicCounter,
    /// Transaction number -> every record written for it so far.
    open: BTreeMap<u64, Vec<u8>>,
}

impl TseState {
    fn signatory(&self) -> Signatory<'_> {
        Signatory {
            serial_number: self.signer.serial_number(),
            scheme: self.signer.scheme(),
        }
    }

    /// Sign `payload` and return the full record.
    fn seal(&mut self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let trailer = self.signer.sign(&payload)?;
        let mut record = payload;
        record.extend_from_slice(&trailer);
        Ok(record)
    }

    fn system_record(
        &mut self,
        operation: OperationType,
        operation_data: &[TlvNode],
    ) -> Result<Vec<u8>> {
        let payload = system_payload(self.signatory(), operation, operation_data, None)?;
        let record = self.seal(payload)?;
        debug!(
            %operation,
            signature_counter = self.signer.signature_counter(),
            record_len = record.len(),
            "system record signed"
        );
        Ok(record)
    }
}

/// A simulated TSE: signing core plus transaction bookkeeping.
///
/// All operations are synchronous and take `&self`; the instance can be
/// shared between threads behind an `Arc`.
pub struct Tse {
    state: Mutex<TseState>,
    max_open_transactions: usize,
}

impl Tse {
    /// Wrap a signing core, resuming the transaction counter.
    pub fn new(
        signer: SigningCore,
        max_open_transactions: usize,
        transaction_counter: u64,
    ) -> Result<Self> {
        if max_open_transactions == 0 {
            return Err(FiskalError::Config(
                "max_open_transactions must be at least 1".into(),
            ));
        }
        Ok(Self {
            state: Mutex::new(TseState {
                signer,
                transaction_counter: MonotonicCounter::starting_at(transaction_counter)?,
                open: BTreeMap::new(),
            }),
            max_open_transactions,
        })
    }

    /// Build the TSE described by `config`, resuming from `snapshot`.
    #[instrument(skip_all)]
    pub fn from_config(config: &TseConfig, snapshot: &StateSnapshot) -> Result<Self> {
        config.validate()?;
        let signer = SigningCore::from_config(config, snapshot)?;
        let tse = Self::new(
            signer,
            config.max_open_transactions,
            snapshot.transaction_counter,
        )?;
        info!(
            signature_counter = snapshot.signature_counter,
            transaction_counter = snapshot.transaction_counter,
            max_open_transactions = config.max_open_transactions,
            "TSE ready"
        );
        Ok(tse)
    }

    fn state(&self) -> Result<MutexGuard<'_, TseState>> {
        self.state
            .lock()
            .map_err(|_| FiskalError::Internal("TSE state lock poisoned".into()))
    }

    // -- Transactions ---------------------------------------------------------

    /// Open a new transaction and return its signed start record.
    #[instrument(skip(self, process_data, additional_data), fields(process_data_len = process_data.len()))]
    pub fn start_transaction(
        &self,
        client_id: &str,
        process_data: &[u8],
        process_type: &str,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut state = self.state()?;

        let number = state
            .transaction_counter
            .peek_next()
            .ok_or(FiskalError::TransactionCounterOverflow(
                state.transaction_counter.value(),
            ))?;
        if state.open.len() >= self.max_open_transactions {
            return Err(FiskalError::TooManyOpenTransactions {
                max: self.max_open_transactions,
            });
        }

        let payload = transaction_payload(
            state.signatory(),
            &TransactionFields {
                operation: OperationType::StartTransaction,
                client_id,
                process_data,
                process_type,
                additional_data,
                transaction_number: number,
            },
        )?;
        let record = state.seal(payload)?;

        state.transaction_counter.commit(number)?;
        state.open.insert(number, record.clone());

        debug!(
            transaction_number = number,
            signature_counter = state.signer.signature_counter(),
            open = state.open.len(),
            "transaction started"
        );
        Ok(record)
    }

    /// Sign an update for an open transaction.
    #[instrument(skip(self, process_data), fields(process_data_len = process_data.len()))]
    pub fn update_transaction(
        &self,
        client_id: &str,
        transaction_number: u64,
        process_data: &[u8],
        process_type: &str,
    ) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        if !state.open.contains_key(&transaction_number) {
            return Err(FiskalError::NoSuchTransaction(transaction_number));
        }

        let payload = transaction_payload(
            state.signatory(),
            &TransactionFields {
                operation: OperationType::UpdateTransaction,
                client_id,
                process_data,
                process_type,
                additional_data: None,
                transaction_number,
            },
        )?;
        let record = state.seal(payload)?;

        if let Some(log) = state.open.get_mut(&transaction_number) {
            log.extend_from_slice(&record);
        }

        debug!(
            transaction_number,
            signature_counter = state.signer.signature_counter(),
            "transaction updated"
        );
        Ok(record)
    }

    /// Close an open transaction and return its signed finish record.
    #[instrument(skip(self, process_data, additional_data), fields(process_data_len = process_data.len()))]
    pub fn finish_transaction(
        &self,
        client_id: &str,
        transaction_number: u64,
        process_data: &[u8],
        process_type: &str,
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        if !state.open.contains_key(&transaction_number) {
            return Err(FiskalError::NoSuchTransaction(transaction_number));
        }

        let payload = transaction_payload(
            state.signatory(),
            &TransactionFields {
                operation: OperationType::FinishTransaction,
                client_id,
                process_data,
                process_type,
                additional_data,
                transaction_number,
            },
        )?;
        let record = state.seal(payload)?;
        state.open.remove(&transaction_number);

        debug!(
            transaction_number,
            signature_counter = state.signer.signature_counter(),
            open = state.open.len(),
            "transaction finished"
        );
        Ok(record)
    }

    // -- System operations ----------------------------------------------------

    #[instrument(skip(self))]
    pub fn initialize(&self, description: Option<&str>) -> Result<Vec<u8>> {
        let data = initialize_data(description)?;
        self.state()?.system_record(OperationType::Initialize, &data)
    }

    /// Set the clock to `new_time`, or back to host time when `None`, and log
    /// the readings before and after.
    ///
    /// The clock change is undone if the record cannot be signed.
    #[instrument(skip(self))]
    pub fn update_time(&self, new_time: Option<DateTime<Utc>>) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        let saved = state.signer.clock();
        let before = state.signer.now().timestamp();

        match new_time {
            Some(instant) => state.signer.set_clock(instant)?,
            None => state.signer.resync_clock(),
        }
        let after = state.signer.now().timestamp();

        let record = match (u64::try_from(before), u64::try_from(after)) {
            (Ok(before), Ok(after)) => {
                state.system_record(OperationType::UpdateTime, &update_time_data(before, after))
            }
            _ => Err(FiskalError::Internal(
                "clock reading before the Unix epoch".into(),
            )),
        };

        if record.is_err() {
            state.signer.restore_clock(saved);
        }
        record
    }

    #[instrument(skip(self))]
    pub fn disable(&self) -> Result<Vec<u8>> {
        self.state()?
            .system_record(OperationType::Disable, &disable_data())
    }

    #[instrument(skip(self))]
    pub fn authenticate_user(
        &self,
        user_id: &str,
        role: Option<UserRole>,
        authenticated: bool,
    ) -> Result<Vec<u8>> {
        let data = authenticate_user_data(user_id, role, authenticated)?;
        self.state()?
            .system_record(OperationType::AuthenticateUser, &data)
    }

    #[instrument(skip(self))]
    pub fn log_out(&self, user_id: &str, cause: LogOutCause) -> Result<Vec<u8>> {
        let data = log_out_data(user_id, cause)?;
        self.state()?.system_record(OperationType::LogOut, &data)
    }

    #[instrument(skip(self))]
    pub fn unblock_user(&self, user_id: &str, unblocked: bool) -> Result<Vec<u8>> {
        let data = unblock_user_data(user_id, unblocked)?;
        self.state()?
            .system_record(OperationType::UnblockUser, &data)
    }

    // -- Queries --------------------------------------------------------------

    pub fn open_transaction_count(&self) -> Result<usize> {
        Ok(self.state()?.open.len())
    }

    /// Open transaction numbers, ascending.
    pub fn open_transaction_numbers(&self) -> Result<Vec<u64>> {
        Ok(self.state()?.open.keys().copied().collect())
    }

    /// Every record written so far for an open transaction.
    pub fn open_transaction_log(&self, transaction_number: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.state()?.open.get(&transaction_number).cloned())
    }

    pub fn max_open_transactions(&self) -> usize {
        self.max_open_transactions
    }

    pub fn transaction_counter(&self) -> Result<u64> {
        Ok(self.state()?.transaction_counter.value())
    }

    pub fn signature_counter(&self) -> Result<u64> {
        Ok(self.state()?.signer.signature_counter())
    }

    pub fn clock_offset_secs(&self) -> Result<i64> {
        Ok(self.state()?.signer.clock_offset_secs())
    }

    pub fn now(&self) -> Result<DateTime<Utc>> {
        Ok(self.state()?.signer.now())
    }

    pub fn serial_number(&self) -> Result<Vec<u8>> {
        Ok(self.state()?.signer.serial_number().to_vec())
    }

    pub fn public_key(&self) -> Result<Vec<u8>> {
        Ok(self.state()?.signer.public_key().to_vec())
    }

    pub fn scheme(&self) -> Result<SignatureScheme> {
        Ok(self.state()?.signer.scheme())
    }

    pub fn is_certificate_expired(&self) -> Result<bool> {
        Ok(self.state()?.signer.is_certificate_expired())
    }

    /// Counters and clock offset, read under one lock.
    pub fn snapshot(&self) -> Result<StateSnapshot> {
        let state = self.state()?;
        Ok(StateSnapshot {
            signature_counter: state.signer.signature_counter(),
            transaction_counter: state.transaction_counter.value(),
            clock_offset_secs: state.signer.clock_offset_secs(),
        })
    }
}
