//! Snapshot transactions with optimistic retry.
//!
//! A [`Txn`] records the version of every record it reads (absent records
//! read as version 0) and buffers every write. [`Txn::commit`] re-checks the
//! observed versions inside one SQLite transaction and applies the buffered
//! writes only when nothing moved underneath; otherwise it fails with
//! [`StoreError::Contention`] and persists nothing.
//!
//! [`run_with_retry`] drives a transaction body through bounded retries with
//! jittered exponential backoff, which is how every coordinator operation
//! runs.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::TransactionConfig;
use crate::models::{Activity, Profile};
use crate::store::error::{Result, StoreError};
use crate::store::key::{ActivityKey, ProfileKey, RecordKey};
use crate::store::EntityStore;

/// Upper bound on distinct ownership partitions one transaction may touch.
/// Registration needs two (the registrant's and the activity owner's).
pub const MAX_TX_PARTITIONS: usize = 5;

/// An in-flight snapshot transaction.
pub struct Txn<'a> {
    store: &'a EntityStore,
    /// Version observed for every record read; 0 marks a record read as
    /// absent. Only the first read of a key pins the snapshot.
    reads: HashMap<RecordKey, i64>,
    /// Buffered writes, applied atomically at commit.
    writes: HashMap<RecordKey, String>,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            writes: HashMap::new(),
        }
    }

    pub fn get_profile(&mut self, key: &ProfileKey) -> Result<Option<Profile>> {
        self.get_json(&key.record_key())
    }

    pub fn put_profile(&mut self, profile: &Profile) -> Result<()> {
        self.put_json(profile.key().record_key(), profile)
    }

    pub fn get_activity(&mut self, key: &ActivityKey) -> Result<Option<Activity>> {
        self.get_json(&key.record_key())
    }

    pub fn put_activity(&mut self, activity: &Activity) -> Result<()> {
        self.put_json(activity.key().record_key(), activity)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&mut self, key: &RecordKey) -> Result<Option<T>> {
        if let Some(payload) = self.writes.get(key) {
            return Ok(Some(serde_json::from_str(payload)?));
        }
        match self.store.read_record(key)? {
            Some((version, payload)) => {
                self.reads.entry(key.clone()).or_insert(version);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => {
                self.reads.entry(key.clone()).or_insert(0);
                Ok(None)
            }
        }
    }

    pub(crate) fn put_json<T: Serialize>(&mut self, key: RecordKey, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.writes.insert(key, payload);
        Ok(())
    }

    /// Verify every observed version and apply the buffered writes, all
    /// inside one SQLite transaction. Nothing is persisted on failure.
    pub fn commit(self) -> Result<()> {
        let partitions: HashSet<&str> = self
            .reads
            .keys()
            .chain(self.writes.keys())
            .map(|key| key.partition.as_str())
            .collect();
        if partitions.len() > MAX_TX_PARTITIONS {
            return Err(StoreError::TooManyPartitions {
                count: partitions.len(),
                limit: MAX_TX_PARTITIONS,
            });
        }
        drop(partitions);

        let mut db = self.store.lock();
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for (key, observed) in &self.reads {
            let current: i64 = tx
                .query_row(
                    "SELECT version FROM records
                     WHERE kind = ?1 AND partition_id = ?2 AND local_id = ?3",
                    params![key.kind.as_str(), key.partition, key.local],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);
            if current != *observed {
                return Err(StoreError::Contention);
            }
        }

        let now = Utc::now().to_rfc3339();
        for (key, payload) in &self.writes {
            tx.execute(
                "INSERT INTO records (kind, partition_id, local_id, version, payload, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)
                 ON CONFLICT(kind, partition_id, local_id)
                 DO UPDATE SET version = version + 1,
                               payload = excluded.payload,
                               updated_at = excluded.updated_at",
                params![key.kind.as_str(), key.partition, key.local, payload, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Retry schedule for contended transactions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TransactionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Exponential backoff capped at `max_delay`, plus up to one
    /// `base_delay` of jitter so contending workers desynchronize.
    fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let exp = self.base_delay.saturating_mul(1 << shift);
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=self.base_delay.as_millis().max(1) as u64);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Run `body` inside a transaction, retrying on commit contention.
///
/// The body is re-invoked from scratch on every attempt and must re-read all
/// state through the transaction it is given. A business failure returned by
/// the body aborts immediately without committing and is never retried.
/// Exhausted retries surface as [`StoreError::RetriesExhausted`].
pub async fn run_with_retry<T, E, F>(
    store: &EntityStore,
    policy: &RetryPolicy,
    mut body: F,
) -> std::result::Result<T, E>
where
    E: From<StoreError>,
    F: FnMut(&mut Txn<'_>) -> std::result::Result<T, E>,
{
    let mut attempt = 0u32;
    loop {
        let mut txn = store.begin();
        let value = body(&mut txn)?;
        match txn.commit() {
            Ok(()) => return Ok(value),
            Err(StoreError::Contention) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(StoreError::RetriesExhausted { attempts: attempt }.into());
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transaction contention, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
