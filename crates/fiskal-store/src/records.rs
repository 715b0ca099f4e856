// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record store — append-only SQLite table of every signed log record.
//
// Schema:
//   log_records(
//     id                  INTEGER PRIMARY KEY AUTOINCREMENT,
//     kind                TEXT    NOT NULL,   -- "transaction" | "system"
//     operation           TEXT    NOT NULL,   -- e.g. "StartTransaction"
//     signature_counter   BLOB    NOT NULL UNIQUE, -- u64, 8 bytes big-endian
//     transaction_number  BLOB,              -- likewise; NULL for system records
//     log_time            INTEGER NOT NULL,   -- Unix seconds, TSE clock
//     digest              TEXT    NOT NULL,   -- SHA-256 hex of `record`
//     record              BLOB    NOT NULL
//   )
//
// Index columns are taken from the parsed record, never from the caller, so
// a row cannot disagree with the bytes it stores.  Counters span the whole
// u64 range, past what an SQLite INTEGER holds; fixed-width big-endian blobs
// compare with memcmp, so ORDER BY, BETWEEN and MAX keep numeric order.

use std::path::Path;

use fiskal_core::error::{FiskalError, Result};
use fiskal_log::ParsedRecord;
use fiskal_security::hash_bytes;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::{debug, info, instrument};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS log_records (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        kind               TEXT    NOT NULL,
        operation          TEXT    NOT NULL,
        signature_counter  BLOB    NOT NULL UNIQUE,
        transaction_number BLOB,
        log_time           INTEGER NOT NULL,
        digest             TEXT    NOT NULL,
        record             BLOB    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS log_records_transaction
        ON log_records (transaction_number);
"#;

const SELECT_COLUMNS: &str = "SELECT id, kind, operation, signature_counter, transaction_number, \
     log_time, digest, record FROM log_records";

fn db_err(e: rusqlite::Error) -> FiskalError {
    FiskalError::Database(e.to_string())
}

/// Column encoding of a counter value.
fn counter_key(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

fn counter_from_key(bytes: Vec<u8>, column: usize) -> rusqlite::Result<u64> {
    let key: [u8; 8] = bytes.as_slice().try_into().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Blob, Box::new(e))
    })?;
    Ok(u64::from_be_bytes(key))
}

/// One row of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub kind: String,
    pub operation: String,
    pub signature_counter: u64,
    pub transaction_number: Option<u64>,
    pub log_time: i64,
    pub digest: String,
    #[serde(skip)]
    pub record: Vec<u8>,
}

impl StoredRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            operation: row.get(2)?,
            signature_counter: counter_from_key(row.get(3)?, 3)?,
            transaction_number: row
                .get::<_, Option<Vec<u8>>>(4)?
                .map(|key| counter_from_key(key, 4))
                .transpose()?,
            log_time: row.get(5)?,
            digest: row.get(6)?,
            record: row.get(7)?,
        })
    }

    /// `true` when the stored digest still matches the stored bytes.
    pub fn digest_matches(&self) -> bool {
        hash_bytes(&self.record) == self.digest
    }
}

/// Append-only store of signed log records.
///
/// Synchronous like the rest of the workspace; callers that share a store
/// between threads wrap it in a lock.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the store at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())
            .map_err(|e| FiskalError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| FiskalError::Database(format!("WAL pragma: {e}")))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| FiskalError::Database(format!("create table: {e}")))?;

        let store = Self { conn };
        info!(records = store.count()?, "record store opened");
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        debug!("in-memory record store opened");
        Ok(Self { conn })
    }

    /// Parse and insert a record.  A second record with the same signature
    /// counter is refused.
    #[instrument(skip_all, fields(record_len = record.len()))]
    pub fn append(&self, record: &[u8]) -> Result<ParsedRecord> {
        let parsed = ParsedRecord::parse(record)?;
        let transaction_number = parsed.transaction_number.map(counter_key);

        self.conn
            .execute(
                "INSERT INTO log_records
                    (kind, operation, signature_counter, transaction_number, log_time, digest, record)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    parsed.kind.as_str(),
                    parsed.operation.as_str(),
                    &counter_key(parsed.signature_counter)[..],
                    transaction_number.as_ref().map(|key| &key[..]),
                    parsed.log_time,
                    hash_bytes(record),
                    record,
                ],
            )
            .map_err(db_err)?;

        debug!(
            signature_counter = parsed.signature_counter,
            operation = %parsed.operation,
            "record stored"
        );
        Ok(parsed)
    }

    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM log_records", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(db_err)
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, StoredRecord::from_row)
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_err)?);
        }
        Ok(records)
    }

    /// Every record of one transaction, in signature order.
    pub fn by_transaction(&self, transaction_number: u64) -> Result<Vec<StoredRecord>> {
        self.query(
            &format!(
                "{SELECT_COLUMNS} WHERE transaction_number = ?1 ORDER BY signature_counter ASC"
            ),
            params![&counter_key(transaction_number)[..]],
        )
    }

    /// Records whose signature counter lies in `from..=to`, ascending.
    pub fn range(&self, from: u64, to: u64) -> Result<Vec<StoredRecord>> {
        self.query(
            &format!(
                "{SELECT_COLUMNS} WHERE signature_counter BETWEEN ?1 AND ?2 \
                 ORDER BY signature_counter ASC"
            ),
            params![&counter_key(from)[..], &counter_key(to)[..]],
        )
    }

    /// Record with the highest signature counter.
    pub fn latest(&self) -> Result<Option<StoredRecord>> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY signature_counter DESC LIMIT 1"),
                [],
                StoredRecord::from_row,
            )
            .optional()
            .map_err(db_err)
    }

    /// Highest transaction number seen in any stored record.
    pub fn max_transaction_number(&self) -> Result<Option<u64>> {
        self.conn
            .query_row(
                "SELECT MAX(transaction_number) FROM log_records",
                [],
                |row| {
                    row.get::<_, Option<Vec<u8>>>(0)?
                        .map(|key| counter_from_key(key, 0))
                        .transpose()
                },
            )
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiskal_core::TseConfig;
    use fiskal_core::types::{LogKind, SignatureScheme};
    use fiskal_log::Tse;
    use fiskal_security::{COUNTER_CEILING, EcdsaKey, SigningCore};

    fn tse() -> Tse {
        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).unwrap();
        let signer =
            SigningCore::new(Box::new(key), TseConfig::default().certificate, 0, 0).unwrap();
        Tse::new(signer, 8, 0).unwrap()
    }

    fn make_store() -> RecordStore {
        RecordStore::open_in_memory().expect("open in-memory record store")
    }

    #[test]
    fn append_and_count() {
        let store = make_store();
        let tse = tse();
        assert_eq!(store.count().unwrap(), 0);

        let parsed = store.append(&tse.initialize(None).unwrap()).unwrap();
        assert_eq!(parsed.kind, LogKind::System);
        store
            .append(&tse.start_transaction("POS-1", b"x", "sale", None).unwrap())
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn duplicate_signature_counter_refused() {
        let store = make_store();
        let record = tse().initialize(None).unwrap();
        store.append(&record).unwrap();
        assert!(matches!(store.append(&record), Err(FiskalError::Database(_))));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn garbage_is_not_stored() {
        let store = make_store();
        assert!(store.append(&[0x30, 0x05, 0x01]).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn by_transaction_and_range() {
        let store = make_store();
        let tse = tse();
        store.append(&tse.start_transaction("POS-1", b"a", "sale", None).unwrap()).unwrap();
        store.append(&tse.start_transaction("POS-2", b"b", "sale", None).unwrap()).unwrap();
        store.append(&tse.update_transaction("POS-1", 1, b"c", "sale").unwrap()).unwrap();
        store
            .append(&tse.finish_transaction("POS-1", 1, b"d", "sale", None).unwrap())
            .unwrap();

        let first = store.by_transaction(1).unwrap();
        let counters: Vec<u64> = first.iter().map(|r| r.signature_counter).collect();
        assert_eq!(counters, vec![1, 3, 4]);
        assert_eq!(first[2].operation, "FinishTransaction");
        assert!(first.iter().all(StoredRecord::digest_matches));

        let middle = store.range(2, 3).unwrap();
        assert_eq!(middle.len(), 2);
        assert_eq!(middle[0].transaction_number, Some(2));

        assert_eq!(store.range(1, u64::MAX).unwrap().len(), 4);
        assert_eq!(store.max_transaction_number().unwrap(), Some(2));
    }

    #[test]
    fn latest_record() {
        let store = make_store();
        assert!(store.latest().unwrap().is_none());

        let tse = tse();
        store.append(&tse.initialize(None).unwrap()).unwrap();
        let disable = tse.disable().unwrap();
        store.append(&disable).unwrap();

        assert_eq!(store.max_transaction_number().unwrap(), None);

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.signature_counter, 2);
        assert_eq!(latest.kind, "system");
        assert_eq!(latest.record, disable);
        assert_eq!(latest.transaction_number, None);
    }

    #[test]
    fn counters_past_i64_keep_their_order() {
        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).unwrap();
        let signer = SigningCore::new(
            Box::new(key),
            TseConfig::default().certificate,
            COUNTER_CEILING - 3,
            0,
        )
        .unwrap();
        let tse = Tse::new(signer, 8, COUNTER_CEILING - 1).unwrap();
        let store = make_store();

        let low = tse.start_transaction("POS-1", b"a", "sale", None);
        store.append(&low.unwrap()).unwrap();
        store.append(&tse.initialize(None).unwrap()).unwrap();
        store.append(&tse.disable().unwrap()).unwrap();
        assert!(tse.disable().is_err());

        let all = store.range(0, u64::MAX).unwrap();
        let counters: Vec<u64> = all.iter().map(|r| r.signature_counter).collect();
        assert_eq!(
            counters,
            vec![COUNTER_CEILING - 2, COUNTER_CEILING - 1, COUNTER_CEILING]
        );
        assert_eq!(store.latest().unwrap().unwrap().signature_counter, COUNTER_CEILING);
        assert_eq!(store.max_transaction_number().unwrap(), Some(COUNTER_CEILING));
        assert_eq!(store.by_transaction(COUNTER_CEILING).unwrap().len(), 1);
        assert_eq!(store.range(COUNTER_CEILING, u64::MAX).unwrap().len(), 1);
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");
        let tse = tse();

        {
            let store = RecordStore::open(&path).unwrap();
            store.append(&tse.initialize(Some("Kasse 1")).unwrap()).unwrap();
        }

        let store = RecordStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.latest().unwrap().unwrap().operation, "Initialize");
    }
}
