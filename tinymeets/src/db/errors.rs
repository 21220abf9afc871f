use crate::types::Operation;
use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        /// `table.column` list reported by SQLite, e.g. `users.email`
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Entity cannot be modified or deleted due to protection rules
    /// NOTE: use this only for DB-level protection rules, not user roles etc. - that's handled at
    /// the API layer.
    #[error("{operation:?} cannot be applied to entity of type {entity_type}: {reason}")]
    ProtectedEntity {
        operation: Operation,
        reason: String,
        entity_type: String,
        entity_id: Option<String>,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                // SQLite doesn't populate constraint()/table(), the detail lives in the message
                let constraint = db_err.constraint().map(|s| s.to_string()).or_else(|| constraint_from_message(&message));
                let table = db_err
                    .table()
                    .map(|s| s.to_string())
                    .or_else(|| constraint.as_deref().and_then(table_from_constraint));

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_foreign_key_violation() || is_sqlite_restrict_violation(db_err.code().as_deref(), &message) {
                    DbError::ForeignKeyViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint,
                        table,
                        message,
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// `ON DELETE RESTRICT` surfaces as `SQLITE_CONSTRAINT_TRIGGER` (1811), which sqlx does not count
/// as a foreign key violation.
fn is_sqlite_restrict_violation(code: Option<&str>, message: &str) -> bool {
    code == Some("1811") || message.starts_with("FOREIGN KEY constraint failed")
}

/// Extract the constrained columns from a SQLite constraint message.
///
/// SQLite reports e.g. "UNIQUE constraint failed: users.email" or
/// "UNIQUE constraint failed: meetup_participants.meetup_id, meetup_participants.user_id".
fn constraint_from_message(message: &str) -> Option<String> {
    let (_, detail) = message.split_once("constraint failed: ")?;
    let detail = detail.trim();
    if detail.is_empty() { None } else { Some(detail.to_string()) }
}

fn table_from_constraint(constraint: &str) -> Option<String> {
    let first = constraint.split(',').next()?.trim();
    first.split_once('.').map(|(table, _)| table.to_string())
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
