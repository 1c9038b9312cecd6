//! Service layer owning the loan lifecycle.
//! - Keeps the status state machine and its orchestration free of HTTP concerns.
//! - Talks to storage only through the `LoanRepository` trait.
//! - Reports failures as a closed `LoanError` enum.

pub mod loan;
#[cfg(test)]
pub mod test_support;
