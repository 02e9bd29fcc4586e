//! Partitioned entity store.
//!
//! Durable key-value storage of Profile and Activity records over an
//! embedded SQLite database. Every record carries a version counter;
//! transactions take snapshot reads, buffer writes, and verify the observed
//! versions at commit, so concurrent mutations of the same record are
//! serialized optimistically. Id allocation happens outside transactions so
//! a retried transaction reuses the id it was given.

pub mod database;
pub mod key;
pub mod transaction;

mod error;
mod migrations;

pub use error::StoreError;
pub use key::{ActivityKey, ProfileKey};
pub use transaction::{run_with_retry, RetryPolicy, Txn};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::config::StoreConfig;
use crate::models::{Activity, Profile};
use database::Database;
use error::Result;
use key::{RecordKey, RecordKind};

/// Handle to the entity store. Cheap to clone; all clones share one
/// underlying connection.
#[derive(Clone)]
pub struct EntityStore {
    db: Arc<Mutex<Database>>,
}

impl EntityStore {
    /// Open (or create) a store at the configured location. The special
    /// path `:memory:` opens a private in-memory store.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        if config.path == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open_at(Path::new(&config.path))
        }
    }

    /// Open (or create) a file-backed store.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_at(path)?)),
        })
    }

    /// Open a private in-memory store, for tests and ephemeral embedding.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
        })
    }

    /// Begin a snapshot transaction.
    pub fn begin(&self) -> Txn<'_> {
        Txn::new(self)
    }

    /// Allocate a fresh Activity id inside the owner's partition.
    ///
    /// Allocation is not transactional: call it before `begin` so a retried
    /// transaction stays idempotent on the id it already holds.
    pub fn allocate_activity_id(&self, owner: &ProfileKey) -> Result<i64> {
        self.allocate(RecordKind::Activity.as_str(), owner.as_str())
    }

    /// Allocate a fresh numeric user id for identity aliasing.
    pub fn allocate_user_id(&self) -> Result<i64> {
        self.allocate("user_id", "global")
    }

    fn allocate(&self, kind: &str, partition: &str) -> Result<i64> {
        let mut db = self.lock();
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO sequences (kind, partition_id, next_id) VALUES (?1, ?2, 1)
             ON CONFLICT(kind, partition_id) DO UPDATE SET next_id = next_id + 1",
            params![kind, partition],
        )?;
        let id: i64 = tx.query_row(
            "SELECT next_id FROM sequences WHERE kind = ?1 AND partition_id = ?2",
            params![kind, partition],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(id)
    }

    /// Plain read of a Profile, outside any transaction.
    pub fn get_profile(&self, key: &ProfileKey) -> Result<Option<Profile>> {
        self.read_entity(&key.record_key())
    }

    /// Plain read of an Activity, outside any transaction.
    pub fn get_activity(&self, key: &ActivityKey) -> Result<Option<Activity>> {
        self.read_entity(&key.record_key())
    }

    /// All Activities in one owner partition, in unspecified order.
    pub fn list_activities(&self, owner: &ProfileKey) -> Result<Vec<Activity>> {
        let db = self.lock();
        let mut stmt = db.conn().prepare(
            "SELECT payload FROM records WHERE kind = ?1 AND partition_id = ?2",
        )?;
        let rows = stmt.query_map(
            params![RecordKind::Activity.as_str(), owner.as_str()],
            |row| row.get::<_, String>(0),
        )?;

        let mut activities = Vec::new();
        for payload in rows {
            activities.push(serde_json::from_str(&payload?)?);
        }
        Ok(activities)
    }

    /// Trivial connectivity probe for health reporting.
    pub fn health_check(&self) -> Result<()> {
        let db = self.lock();
        db.conn().query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn read_entity<T: serde::de::DeserializeOwned>(&self, key: &RecordKey) -> Result<Option<T>> {
        match self.read_record(key)? {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Read one record row, returning its version and raw payload.
    pub(crate) fn read_record(&self, key: &RecordKey) -> Result<Option<(i64, String)>> {
        let db = self.lock();
        let row = db
            .conn()
            .query_row(
                "SELECT version, payload FROM records
                 WHERE kind = ?1 AND partition_id = ?2 AND local_id = ?3",
                params![key.kind.as_str(), key.partition, key.local],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Database> {
        // A panic while holding the lock leaves the database itself intact,
        // so the poisoned guard is safe to reclaim.
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
