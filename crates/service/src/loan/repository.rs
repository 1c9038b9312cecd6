use async_trait::async_trait;

use super::domain::{Loan, LoanId};
use super::errors::LoanError;

/// Storage contract consumed by the loan service.
///
/// Implementations own atomicity: a uniqueness constraint on the document is
/// expected to back up the service-level duplicate check.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn exists_by_document(&self, document: &str) -> Result<bool, LoanError>;
    /// Insert when the loan has no id yet (assigning one), update otherwise.
    async fn save(&self, loan: Loan) -> Result<Loan, LoanError>;
    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>, LoanError>;
    async fn find_all(&self) -> Result<Vec<Loan>, LoanError>;
}

/// Simple in-memory mock repository for tests, benches and doc examples
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard};

    /// Loans keyed by id; `find_all` returns them in id order.
    #[derive(Default)]
    pub struct MockLoanRepository {
        loans: Mutex<BTreeMap<LoanId, Loan>>,
        writes: AtomicUsize,
        unavailable: AtomicBool,
    }

    impl MockLoanRepository {
        /// Number of successful `save` calls so far.
        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Make every call fail with a repository error, simulating an outage.
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<LoanId, Loan>>, LoanError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(LoanError::Repository("storage unavailable".into()));
            }
            self.loans
                .lock()
                .map_err(|_| LoanError::Repository("mock store poisoned".into()))
        }
    }

    #[async_trait]
    impl LoanRepository for MockLoanRepository {
        async fn exists_by_document(&self, document: &str) -> Result<bool, LoanError> {
            let loans = self.lock()?;
            Ok(loans.values().any(|l| l.document == document))
        }

        async fn save(&self, loan: Loan) -> Result<Loan, LoanError> {
            let mut loans = self.lock()?;
            let saved = match loan.id {
                Some(id) => {
                    if !loans.contains_key(&id) {
                        return Err(LoanError::Repository(format!("no row with id {id} to update")));
                    }
                    loan
                }
                None => {
                    // same guarantee as the unique index on the real table
                    if loans.values().any(|l| l.document == loan.document) {
                        return Err(LoanError::DuplicateDocument(loan.document));
                    }
                    let next = loans.keys().next_back().copied().unwrap_or(0) + 1;
                    loan.with_id(next)
                }
            };
            if let Some(id) = saved.id {
                loans.insert(id, saved.clone());
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(saved)
        }

        async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>, LoanError> {
            let loans = self.lock()?;
            Ok(loans.get(&id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Loan>, LoanError> {
            let loans = self.lock()?;
            Ok(loans.values().cloned().collect())
        }
    }

}
