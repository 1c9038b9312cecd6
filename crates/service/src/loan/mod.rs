//! Loan module: three-layer architecture (domain, repository, service).
//!
//! The domain owns the status state machine; the service coordinates it with a
//! repository that may be SeaORM-backed or in-memory.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use domain::{can_transition, Loan, LoanId, LoanStatus, NewLoan};
pub use errors::LoanError;
pub use repository::LoanRepository;
pub use service::LoanService;
