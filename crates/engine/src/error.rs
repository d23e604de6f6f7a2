//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidThreshold`] thrown when a budget row is malformed. Alert
//!   evaluation reports it per threshold and keeps going.
//! - [`InvalidAmount`] and [`SameAccount`] thrown when a transfer request
//!   fails validation. Nothing is written.
//! - [`DuplicateTransfer`] thrown when a transfer id is reused for other
//!   accounts or another amount.
//! - [`PersistenceFailure`] thrown when the ledger store fails. It is the only
//!   retryable error.
//!
//!  [`InvalidThreshold`]: EngineError::InvalidThreshold
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`SameAccount`]: EngineError::SameAccount
//!  [`DuplicateTransfer`]: EngineError::DuplicateTransfer
//!  [`PersistenceFailure`]: EngineError::PersistenceFailure
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Source and destination account are the same: \"{0}\"")]
    SameAccount(String),
    #[error("Transfer \"{0}\" already committed with different content")]
    DuplicateTransfer(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the caller may retry the same request.
    ///
    /// Validation errors are deterministic, only store failures are worth a
    /// retry (the transfer id keeps the retry idempotent).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidThreshold(a), Self::InvalidThreshold(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::SameAccount(a), Self::SameAccount(b)) => a == b,
            (Self::DuplicateTransfer(a), Self::DuplicateTransfer(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::PersistenceFailure(a), Self::PersistenceFailure(b)) => {
                a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}
