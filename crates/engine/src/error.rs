//! Engine error types.
//!
//! Errors split into two classes: caller-input errors (bad field name, bad
//! page bounds, empty tag set) and store failures. The calling layer maps
//! the classes to its own transport responses via [`EngineError::is_caller_error`]
//! without inspecting error text.

use thiserror::Error;

use crate::search::types::MAX_LIMIT;

/// Errors produced by query construction and execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No entity with this name is registered with the search service.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// A sort or search field name is not in the entity's field catalog.
    #[error("unknown field `{field}` for entity `{entity}`")]
    UnknownField { entity: String, field: String },

    /// Offset or limit is outside the permitted bounds.
    #[error("invalid page: offset must be >= 0 and limit in 0..={MAX_LIMIT}, got offset {offset} limit {limit}")]
    InvalidRange { offset: i64, limit: i64 },

    /// A tag-intersection search was requested with no tag names.
    #[error("tag search requires at least one tag name")]
    EmptyTagSet,

    /// The store rejected or failed to execute a query.
    #[error("query execution failed for entity `{entity}`")]
    Store {
        entity: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("internal engine error")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Wrap a store-level failure with the entity it occurred on.
    pub fn store(entity: &str, source: sqlx::Error) -> Self {
        Self::Store {
            entity: entity.to_string(),
            source,
        }
    }

    /// Whether this error is the caller's fault (4xx-equivalent) rather
    /// than a server-side failure.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Store { .. } | Self::Internal(_))
    }

    /// Whether a store failure looks transient: a pool or statement
    /// timeout, a cancelled statement, or a lost connection. The engine
    /// never retries; this only classifies for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => match source {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                // 57014 is query_canceled, raised when the statement
                // timeout fires mid-execution.
                sqlx::Error::Database(e) => e.code().as_deref() == Some("57014"),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_classified() {
        assert!(EngineError::UnknownEntity("voucher".to_string()).is_caller_error());
        assert!(
            EngineError::UnknownField {
                entity: "item".to_string(),
                field: "owner".to_string(),
            }
            .is_caller_error()
        );
        assert!(
            EngineError::InvalidRange {
                offset: -1,
                limit: 10,
            }
            .is_caller_error()
        );
        assert!(EngineError::EmptyTagSet.is_caller_error());
    }

    #[test]
    fn store_errors_classified() {
        let err = EngineError::store("item", sqlx::Error::PoolClosed);
        assert!(!err.is_caller_error());

        let err = EngineError::Internal(anyhow::anyhow!("bad wiring"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn timeouts_classify_as_retryable() {
        assert!(EngineError::store("item", sqlx::Error::PoolTimedOut).is_retryable());
        assert!(
            EngineError::store(
                "item",
                sqlx::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset)),
            )
            .is_retryable()
        );
        assert!(!EngineError::store("item", sqlx::Error::RowNotFound).is_retryable());
        assert!(!EngineError::EmptyTagSet.is_retryable());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = EngineError::UnknownField {
            entity: "item".to_string(),
            field: "secret".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("secret"));
        assert!(text.contains("item"));
    }
}
