//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError raised mid-transaction    │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppError (app shell) ← Serialized for the presentation layer          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  View displays a user-friendly message                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use invpro_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_optional` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Same SKU twice in one warehouse
    /// - Duplicate username, role name or warehouse name
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent warehouse or role
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule failed inside a transaction (nothing was committed).
    ///
    /// ## When This Occurs
    /// - Insufficient stock on an issue, transfer or sale
    /// - A return exceeding the invoiced quantity
    /// - Deleting a role that still has users
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Domain conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Domain(CoreError::Conflict(message.into()))
    }
}

/// Maps sqlx errors onto [`DbError`].
///
/// ```text
/// RowNotFound                           → NotFound
/// "UNIQUE constraint failed: items.sku" → UniqueViolation { field: "sku" }
/// "FOREIGN KEY constraint failed"       → ForeignKeyViolation
/// PoolTimedOut / PoolClosed             → PoolExhausted / ConnectionFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: unique_columns(columns),
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

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// `"items.sku, items.warehouse_id"` → `"sku/warehouse_id"`
fn unique_columns(columns: &str) -> String {
    columns
        .split(',')
        .map(|c| c.trim().rsplit('.').next().unwrap_or(c).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("Stored JSON is invalid: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_message() {
        let err: DbError = CoreError::InsufficientStock {
            sku: "WID-01".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for WID-01: available 1, requested 2"
        );
    }

    #[test]
    fn test_unique_columns_drop_table_names() {
        assert_eq!(unique_columns("users.username"), "username");
        assert_eq!(unique_columns("items.sku, items.warehouse_id"), "sku/warehouse_id");
    }

    #[test]
    fn test_validation_becomes_domain() {
        let err: DbError = ValidationError::required("name").into();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
