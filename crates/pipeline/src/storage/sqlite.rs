//! SQLite-backed stores.
//!
//! Records and transit keys go to two separate database files. Both use WAL
//! journaling and a mutex-guarded connection so one store can be shared
//! across threads.

use super::{RecordStore, StorageError, StorageResult, TransitKeyStore};
use crate::record::AttestationRecord;
use chrono::{DateTime, Utc};
use nimbus_attest::AggregateAttestation;
use nimbus_crypto::{SealedRecord, TransitKey};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

fn open_connection(path: &Path) -> StorageResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Append-only record table.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening record store");

        let conn = open_connection(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS attestation_records (
                seq_no INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id TEXT NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                ciphertext BLOB NOT NULL,
                integrity_hash TEXT NOT NULL,
                identities TEXT NOT NULL,
                aggregate_signature BLOB NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_record_id ON attestation_records(record_id);
            CREATE INDEX IF NOT EXISTS idx_owner ON attestation_records(owner, seq_no);
            "#,
        )?;
        Ok(())
    }

    fn decode(row: &Row<'_>) -> rusqlite::Result<(String, Vec<u8>, String, String, Vec<u8>, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn assemble(
        (record_id, ciphertext, integrity_hash, identities, signature, timestamp): (
            String,
            Vec<u8>,
            String,
            String,
            Vec<u8>,
            String,
        ),
    ) -> StorageResult<AttestationRecord> {
        let record_id = Uuid::parse_str(&record_id)
            .map_err(|e| StorageError::Corrupt(format!("record id {}: {}", record_id, e)))?;
        let identities: Vec<String> = serde_json::from_str(&identities)
            .map_err(|e| StorageError::Corrupt(format!("identities of {}: {}", record_id, e)))?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| StorageError::Corrupt(format!("timestamp of {}: {}", record_id, e)))?
            .with_timezone(&Utc);

        Ok(AttestationRecord {
            record_id,
            sealed: SealedRecord {
                ciphertext,
                integrity_hash,
            },
            attestation: AggregateAttestation {
                identities,
                signature,
            },
            timestamp,
        })
    }
}

const SELECT_RECORD: &str = r#"
    SELECT record_id, ciphertext, integrity_hash, identities,
           aggregate_signature, timestamp
    FROM attestation_records
"#;

impl RecordStore for SqliteRecordStore {
    fn insert(&self, owner: &str, record: &AttestationRecord) -> StorageResult<()> {
        let identities = serde_json::to_string(&record.attestation.identities)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let conn = self.conn.lock();
        let result = conn.execute(
            r#"
            INSERT INTO attestation_records (
                record_id, owner, ciphertext, integrity_hash, identities,
                aggregate_signature, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.record_id.to_string(),
                owner,
                record.sealed.ciphertext,
                record.sealed.integrity_hash,
                identities,
                record.attestation.signature,
                record.timestamp.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                debug!(record_id = %record.record_id, owner, seq_no = conn.last_insert_rowid(), "Record appended");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateRecord(record.record_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, owner: &str, record_id: &Uuid) -> StorageResult<Option<AttestationRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE record_id = ?1 AND owner = ?2",
            SELECT_RECORD
        ))?;
        let row = stmt
            .query_row(params![record_id.to_string(), owner], Self::decode)
            .optional()?;
        row.map(Self::assemble).transpose()
    }

    fn list(&self, owner: &str) -> StorageResult<Vec<AttestationRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE owner = ?1 ORDER BY seq_no ASC",
            SELECT_RECORD
        ))?;
        let rows = stmt.query_map([owner], Self::decode)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::assemble(row?)?);
        }
        Ok(records)
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM attestation_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Transit keys, stored base64-encoded in their own database.
pub struct SqliteKeyStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyStore {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening transit key store");

        let conn = open_connection(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transit_keys (
                record_id TEXT PRIMARY KEY,
                transit_key TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TransitKeyStore for SqliteKeyStore {
    fn put(&self, record_id: Uuid, key: &TransitKey) -> StorageResult<()> {
        let conn = self.conn.lock();
        match conn.execute(
            "INSERT INTO transit_keys (record_id, transit_key) VALUES (?1, ?2)",
            params![record_id.to_string(), key.to_base64()],
        ) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateKey(record_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, record_id: &Uuid) -> StorageResult<Option<TransitKey>> {
        let conn = self.conn.lock();
        let encoded: Option<String> = conn
            .query_row(
                "SELECT transit_key FROM transit_keys WHERE record_id = ?1",
                [record_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        encoded
            .map(|text| {
                TransitKey::from_base64(&text)
                    .map_err(|e| StorageError::Corrupt(format!("transit key of {}: {}", record_id, e)))
            })
            .transpose()
    }
}
