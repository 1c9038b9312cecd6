use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::domain::{Loan, LoanId, LoanStatus, NewLoan};
use super::errors::LoanError;
use super::repository::LoanRepository;

/// Loan business service independent of web framework.
///
/// Constructed once with its repository and shared (behind `Arc`) by callers.
/// Domain errors are raised here exactly once and returned untouched; storage
/// errors pass through as `LoanError::Repository`.
pub struct LoanService<R: LoanRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: LoanRepository + ?Sized> LoanService<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }

    /// Register a new application in `Pending`.
    ///
    /// Fails with `DuplicateDocument` without writing when another loan already
    /// uses the same document.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use rust_decimal::Decimal;
    /// use service::loan::{LoanService, LoanStatus, NewLoan, repository::mock::MockLoanRepository};
    /// let svc = LoanService::new(Arc::new(MockLoanRepository::default()));
    /// let draft = NewLoan { applicant_name: "Ana".into(), requested_amount: Decimal::new(1_500_000, 2), currency: "EUR".into(), document: "12345678A".into() };
    /// let loan = tokio_test::block_on(svc.create(draft)).unwrap();
    /// assert_eq!(loan.status(), LoanStatus::Pending);
    /// assert!(loan.id().is_some());
    /// ```
    #[instrument(skip(self, draft), fields(document = %draft.document))]
    pub async fn create(&self, draft: NewLoan) -> Result<Loan, LoanError> {
        if self.repo.exists_by_document(&draft.document).await? {
            warn!(document = %draft.document, "duplicate_document_rejected");
            return Err(LoanError::DuplicateDocument(draft.document));
        }

        let loan = Loan::open(draft, Utc::now());
        let saved = self.repo.save(loan).await?;
        info!(loan_id = ?saved.id(), currency = %saved.currency(), amount = %saved.requested_amount(), "loan_created");
        Ok(saved)
    }

    /// Fetch one loan; `NotFound` when the id is unknown.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: LoanId) -> Result<Loan, LoanError> {
        debug!(loan_id = id, "loading loan");
        match self.repo.find_by_id(id).await? {
            Some(loan) => Ok(loan),
            None => {
                warn!(loan_id = id, "loan_not_found");
                Err(LoanError::NotFound(id))
            }
        }
    }

    /// Every stored loan, in the repository's order.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Loan>, LoanError> {
        let loans = self.repo.find_all().await?;
        debug!(count = loans.len(), "loans listed");
        Ok(loans)
    }

    /// Apply a status transition and persist it.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use rust_decimal::Decimal;
    /// use service::loan::{LoanError, LoanService, LoanStatus, NewLoan, repository::mock::MockLoanRepository};
    /// let svc = LoanService::new(Arc::new(MockLoanRepository::default()));
    /// let draft = NewLoan { applicant_name: "Ana".into(), requested_amount: Decimal::ONE_HUNDRED, currency: "EUR".into(), document: "X1234567L".into() };
    /// let loan = tokio_test::block_on(svc.create(draft)).unwrap();
    /// let id = loan.id().unwrap();
    /// let approved = tokio_test::block_on(svc.change_status(id, LoanStatus::Approved, "alice")).unwrap();
    /// assert_eq!(approved.updated_by(), Some("alice"));
    /// let err = tokio_test::block_on(svc.change_status(id, LoanStatus::Pending, "alice")).unwrap_err();
    /// assert!(matches!(err, LoanError::InvalidTransition { .. }));
    /// ```
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: LoanId,
        new_status: LoanStatus,
        acting_user: &str,
    ) -> Result<Loan, LoanError> {
        let current = self.get_by_id(id).await?;
        let previous = current.status();

        let updated = match current.change_status(new_status, acting_user) {
            Ok(loan) => loan,
            Err(e) => {
                warn!(loan_id = id, from = %previous, to = %new_status, "invalid_status_transition");
                return Err(e);
            }
        };

        let saved = self.repo.save(updated).await?;
        info!(loan_id = id, from = %previous, to = %saved.status(), user = %acting_user, "loan_status_changed");
        Ok(saved)
    }
}
