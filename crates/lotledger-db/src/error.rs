//! # Database Error Types
//!
//! Error types for storage and coordination.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (business rules)         │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────────────────┘                             │
//! │       │                                                                 │
//! │       ├── is_retryable()? ──► Ledger retry loop (bounded)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Request layer maps to a response                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retryable Class
//! `StaleBalance`, `Busy` and `PoolExhausted` mean another writer got there
//! first or held the lock too long. Nothing was committed, so the whole
//! operation can run again. Everything else surfaces immediately.

use lotledger_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Business rule or invariant failure raised by `lotledger-core`.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate `(product_id, lot_code)` batch
    /// - Any UNIQUE index violation not mapped to something more specific
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The balance read at the start of a write no longer matches.
    ///
    /// ## When This Occurs
    /// ```text
    /// Sale A reads X1 = 10 ─┐
    /// Sale B reads X1 = 10 ─┼─► B commits X1 = 4
    ///                       └─► A: UPDATE .. WHERE quantity_available = 10
    ///                               → 0 rows → StaleBalance (retry)
    /// ```
    #[error("Stale balance on batch {batch_id}: expected {expected}, found {actual}")]
    StaleBalance {
        batch_id: String,
        expected: i64,
        actual: i64,
    },

    /// A bill number was issued twice. Always a defect.
    #[error("Duplicate invoice number: {bill_number}")]
    DuplicateSequenceNumber { bill_number: String },

    /// SQLite lock wait exceeded `busy_timeout`.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when re-running the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::StaleBalance { .. } | DbError::Busy(_) | DbError::PoolExhausted
        )
    }

    /// True for errors that indicate a bug or corrupted data.
    pub fn is_defect(&self) -> bool {
        match self {
            DbError::Domain(err) => err.is_invariant_violation(),
            DbError::DuplicateSequenceNumber { .. } => true,
            _ => false,
        }
    }

    /// The domain error, when this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Prefix of the message raised by the append-only triggers.
pub(crate) const IMMUTABLE_TRIGGER_PREFIX: &str = "immutable record";

/// SQLite primary and extended result codes for lock contention:
/// BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE, BUSY_SNAPSHOT.
const BUSY_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound        → DbError::NotFound
/// trigger "immutable record: t"   → CoreError::ImmutableRecordViolation
/// busy / locked                   → DbError::Busy            (retryable)
/// UNIQUE / FOREIGN KEY            → UniqueViolation / ForeignKeyViolation
/// sqlx::Error::PoolTimedOut       → DbError::PoolExhausted   (retryable)
/// Other                           → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if let Some(rest) = msg.strip_prefix(IMMUTABLE_TRIGGER_PREFIX) {
                    let table = rest.trim_start_matches(':').trim();
                    DbError::Domain(CoreError::immutable(table))
                } else if code.as_deref().is_some_and(|c| BUSY_CODES.contains(&c))
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Busy(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Serialization(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<lotledger_core::ValidationError> for DbError {
    fn from(err: lotledger_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
