//! # App Error Type
//!
//! Unified error type for shell commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Inventory Pro                          │
//! │                                                                         │
//! │  Presentation                Rust Shell                                 │
//! │  ────────────                ──────────                                 │
//! │                                                                         │
//! │  commands::invoices::create_sales_invoice(&app, &session, draft)        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  AppResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Session not live? ──────────── AppError::session_expired ───┐   │  │
//! │  │         │                                                    │   │  │
//! │  │         ▼                                                    │   │  │
//! │  │  Role lacks capability? ────── CoreError::PermissionDenied ──┤   │  │
//! │  │         │                                                    │   │  │
//! │  │         ▼                                                    ▼   │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──────► AppError│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  match err.code {                                                       │
//! │      ErrorCode::InsufficientStock => highlight the line,                │
//! │      ErrorCode::PermissionDenied  => hide the action,                   │
//! │      _                            => show err.message,                  │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! Errors are serializable with a machine-readable `code` and a
//! human-readable `message`. Internal details (SQL text, I/O paths) are
//! logged and never shown.

use invpro_core::CoreError;
use invpro_db::DbError;
use serde::Serialize;

/// Error returned from shell commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for WID-01: available 1, requested 2"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Business rule rejected the operation
    BusinessLogic,

    /// Internal error
    Internal,

    /// Stock would go below zero
    InsufficientStock,

    /// The session's role lacks the capability
    PermissionDenied,

    /// Login failed
    InvalidCredentials,

    /// The session was never issued, was signed out, or its user is gone
    SessionExpired,

    /// The operation conflicts with existing data
    Conflict,

    /// settings.json or config.toml could not be read or written
    SettingsError,

    /// Backup or restore failed
    BackupError,
}

impl AppError {
    /// Creates a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Conflict, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    /// Creates a backup error.
    pub fn backup(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::BackupError, message)
    }

    /// Creates a session expired error.
    pub fn session_expired() -> Self {
        AppError::new(ErrorCode::SessionExpired, "Session expired; sign in again")
    }

    /// Creates a settings error.
    pub fn settings(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::SettingsError, message)
    }
}

/// Converts database errors to app errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::UniqueViolation { field } => AppError::new(
                ErrorCode::ValidationError,
                format!("A record with this {} already exists", field),
            ),
            DbError::Domain(core) => core.into(),
            DbError::ConnectionFailed(_) => {
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PasswordHash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                AppError::internal("Password could not be processed")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to app errors.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ItemNotFound(id) => AppError::not_found("Item", &id.to_string()),
            CoreError::InsufficientStock { .. } => {
                AppError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::ReturnExceedsInvoiced { .. } | CoreError::UnknownInvoiceLine { .. } => {
                AppError::new(ErrorCode::BusinessLogic, message)
            }
            CoreError::PermissionDenied { .. } => {
                AppError::new(ErrorCode::PermissionDenied, message)
            }
            CoreError::InvalidCredentials => {
                AppError::new(ErrorCode::InvalidCredentials, message)
            }
            CoreError::Conflict(_) => AppError::conflict(message),
            CoreError::Validation(e) => AppError::validation(e.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("File operation failed: {}", err);
        AppError::internal("File operation failed")
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON processing failed: {}", err);
        AppError::settings("Settings file is not valid JSON")
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Result type for shell commands.
pub type AppResult<T> = Result<T, AppError>;
