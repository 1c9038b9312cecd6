use thiserror::Error;

use super::domain::{LoanId, LoanStatus};

/// Business errors for loan workflows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanError {
    #[error("a loan with document {0} already exists")]
    DuplicateDocument(String),
    #[error("loan not found with id: {0}")]
    NotFound(LoanId),
    #[error("invalid status transition from {current} to {requested}")]
    InvalidTransition { current: LoanStatus, requested: LoanStatus },
    /// Storage failure, passed through without interpretation.
    #[error("repository error: {0}")]
    Repository(String),
}

impl LoanError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            LoanError::DuplicateDocument(_) => 2001,
            LoanError::NotFound(_) => 2002,
            LoanError::InvalidTransition { .. } => 2003,
            LoanError::Repository(_) => 2100,
        }
    }
}
