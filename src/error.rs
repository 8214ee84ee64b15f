//! Error types for the entity repository.
//!
//! This module defines all error types using `thiserror`. Store failures keep
//! the originating `sqlx::Error` as their source so callers can inspect it;
//! this layer never retries or suppresses them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        message: String,
        /// e.g., "23505" for a PostgreSQL unique violation
        sql_state: Option<String>,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Store error: {message}")]
    Store {
        message: String,
        sql_state: Option<String>,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Mapping error on column '{column}': {message}")]
    Mapping { column: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RepoError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a constraint violation without an underlying driver error.
    pub fn constraint_violation(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
            sql_state,
            source: None,
        }
    }

    /// Create a store error without an underlying driver error.
    pub fn store(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Store {
            message: message.into(),
            sql_state,
            source: None,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a row mapping error for a column.
    pub fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Get the SQLSTATE reported by the store, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::ConstraintViolation { sql_state, .. } | Self::Store { sql_state, .. } => {
                sql_state.as_deref()
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// The repository never retries on its own; this is for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to RepoError.
impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let sql_state = db_err.code().map(|c| c.to_string());
                let is_constraint = matches!(
                    db_err.kind(),
                    sqlx::error::ErrorKind::UniqueViolation
                        | sqlx::error::ErrorKind::ForeignKeyViolation
                        | sqlx::error::ErrorKind::NotNullViolation
                        | sqlx::error::ErrorKind::CheckViolation
                );
                let source = Some(sqlx::Error::Database(db_err));
                if is_constraint {
                    RepoError::ConstraintViolation {
                        message,
                        sql_state,
                        source,
                    }
                } else {
                    RepoError::Store {
                        message,
                        sql_state,
                        source,
                    }
                }
            }
            sqlx::Error::Configuration(msg) => RepoError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::PoolTimedOut => RepoError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                RepoError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => RepoError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => RepoError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => RepoError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::AnyDriverError(err) => RepoError::connection(
                format!("Driver error: {}", err),
                "Check database driver configuration",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                RepoError::mapping(col.clone(), format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                RepoError::mapping(index, format!("Failed to decode column: {}", source))
            }
            sqlx::Error::Decode(source) => {
                RepoError::mapping("<unknown>", format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => RepoError::internal("Database worker crashed"),
            other => RepoError::Store {
                message: other.to_string(),
                sql_state: None,
                source: Some(other),
            },
        }
    }
}

/// Result type alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
