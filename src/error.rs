//! Error types for store operations

use thiserror::Error;

/// Errors that can occur while working with the object store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Object type not registered: {0}")]
    NotRegistered(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid transaction state: {0}")]
    TransactionState(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_registered(object_type: impl Into<String>) -> Self {
        Self::NotRegistered(object_type.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::Dependency(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn transaction_state(msg: impl Into<String>) -> Self {
        Self::TransactionState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
