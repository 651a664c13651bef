//! Domain errors for the Convoy coordination core.

use thiserror::Error;

/// Domain-level errors that can occur in the Convoy system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Invalid state for {entity} {id}: cannot {operation} while {state}")]
    InvalidState {
        entity: &'static str,
        id: String,
        state: String,
        operation: &'static str,
    },

    #[error("Concurrency conflict: {entity} {id} was modified")]
    Conflict { entity: &'static str, id: String },

    #[error("Storage unavailable after {attempts} attempts: {reason}")]
    StorageUnavailable { attempts: u32, reason: String },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Storage busy: {0}")]
    StorageBusy(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        state: impl std::fmt::Display,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.into(),
            state: state.to_string(),
            operation,
        }
    }

    /// Whether the storage-retry layer should attempt the operation again.
    ///
    /// Only store contention qualifies. Lifecycle and input errors surface
    /// immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageBusy(_) | Self::Conflict { .. })
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => Self::StorageBusy(err.to_string()),
            sqlx::Error::Database(db) => {
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
                let busy = db
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .is_some_and(|code| matches!(code & 0xff, 5 | 6));
                if busy {
                    Self::StorageBusy(err.to_string())
                } else {
                    Self::DatabaseError(err.to_string())
                }
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
