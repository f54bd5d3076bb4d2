//! The module contains the errors the engine can return.
//!
//! Every public operation returns [`ResultEngine`](crate::ResultEngine); the
//! outer layer maps an error to a user-facing message through
//! [`EngineError::kind`], never by inspecting the storage error.
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Payload or business-rule violation, raised before touching the ledgers.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// No actor identity was supplied.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(String),
    /// Operation invoked against a record of the wrong kind.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// A stored row could not be mapped back to its domain type.
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Stable error codes exposed to collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    Unauthorized,
    NotFound,
    BadRequest,
    InternalServerError,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Internal(_) | Self::Database(_) => ErrorKind::InternalServerError,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::BadRequest(a), Self::BadRequest(b)) => a == b,
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_internal() {
        let err = EngineError::from(DbErr::Custom("boom".to_string()));
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert_eq!(err.kind().code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn not_found_code() {
        let err = EngineError::NotFound("variant".to_string());
        assert_eq!(err.kind().code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "variant not found");
    }

    #[test]
    fn kind_serializes_as_code() {
        let json = serde_json::to_string(&ErrorKind::BadRequest).unwrap();
        assert_eq!(json, "\"BAD_REQUEST\"");
        let json = serde_json::to_string(&ErrorKind::ValidationError).unwrap();
        assert_eq!(json, "\"VALIDATION_ERROR\"");
    }
}
