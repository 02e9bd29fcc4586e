use thiserror::Error;

/// Errors produced by the entity store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Entity payload (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A commit lost an optimistic-concurrency race; the transaction body
    /// can be re-run against fresh state.
    #[error("Transaction lost an optimistic-concurrency race")]
    Contention,

    /// Contention persisted through every allowed retry.
    #[error("Transaction gave up after {attempts} contended attempts")]
    RetriesExhausted { attempts: u32 },

    /// A single transaction touched more ownership partitions than the
    /// store supports.
    #[error("Transaction touched {count} partitions (limit {limit})")]
    TooManyPartitions { count: usize, limit: usize },

    /// An entity key string could not be parsed.
    #[error("Malformed entity key: {0}")]
    MalformedKey(String),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the store layer.
pub type Result<T> = std::result::Result<T, StoreError>;
