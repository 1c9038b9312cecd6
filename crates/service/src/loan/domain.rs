use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::errors::LoanError;

/// Storage-assigned loan identifier.
pub type LoanId = i64;

/// Lifecycle state of a loan application.
///
/// `Pending` is the initial state; `Rejected` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Pending,
        LoanStatus::Approved,
        LoanStatus::Rejected,
        LoanStatus::Cancelled,
    ];

    /// Whether `self -> target` is a legal transition.
    ///
    /// Legal moves: Pending -> Approved, Pending -> Rejected, Approved -> Cancelled.
    /// Everything else, self-transitions included, is illegal.
    pub fn can_transition(self, target: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, target),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Cancelled)
        )
    }

    /// Targets reachable in one step from this state.
    pub fn allowed_targets(self) -> &'static [LoanStatus] {
        match self {
            LoanStatus::Pending => &[LoanStatus::Approved, LoanStatus::Rejected],
            LoanStatus::Approved => &[LoanStatus::Cancelled],
            LoanStatus::Rejected | LoanStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Free-function form of [`LoanStatus::can_transition`].
pub fn can_transition(current: LoanStatus, target: LoanStatus) -> bool {
    current.can_transition(target)
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown loan status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for LoanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Caller-supplied fields for a new loan application.
/// Status and timestamps are decided by the service, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub applicant_name: String,
    pub requested_amount: Decimal,
    pub currency: String,
    pub document: String,
}

/// A loan application.
///
/// Values are immutable from outside this crate: the only way to move a loan
/// forward is [`Loan::change_status`], which returns an updated copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loan {
    pub(crate) id: Option<LoanId>,
    pub(crate) applicant_name: String,
    pub(crate) requested_amount: Decimal,
    pub(crate) currency: String,
    pub(crate) document: String,
    pub(crate) status: LoanStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) updated_by: Option<String>,
}

impl Loan {
    /// Start a new application in `Pending`, stamped with `created_at`.
    pub fn open(draft: NewLoan, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            applicant_name: draft.applicant_name,
            requested_amount: draft.requested_amount,
            currency: draft.currency,
            document: draft.document,
            status: LoanStatus::Pending,
            created_at,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn id(&self) -> Option<LoanId> { self.id }
    pub fn applicant_name(&self) -> &str { &self.applicant_name }
    pub fn requested_amount(&self) -> Decimal { self.requested_amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn document(&self) -> &str { &self.document }
    pub fn status(&self) -> LoanStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> Option<DateTime<Utc>> { self.updated_at }
    pub fn updated_by(&self) -> Option<&str> { self.updated_by.as_deref() }

    pub fn is_pending(&self) -> bool { self.status == LoanStatus::Pending }
    pub fn is_approved(&self) -> bool { self.status == LoanStatus::Approved }
    pub fn is_rejected(&self) -> bool { self.status == LoanStatus::Rejected }
    pub fn is_cancelled(&self) -> bool { self.status == LoanStatus::Cancelled }

    /// Move to `target` on behalf of `acting_user`, stamping the change with now.
    pub fn change_status(&self, target: LoanStatus, acting_user: &str) -> Result<Loan, LoanError> {
        self.change_status_at(target, acting_user, Utc::now())
    }

    /// Same as [`Loan::change_status`] with an explicit timestamp.
    ///
    /// On an illegal transition `self` is untouched and `InvalidTransition`
    /// carries both states. The modification timestamp never precedes
    /// `created_at`.
    pub fn change_status_at(
        &self,
        target: LoanStatus,
        acting_user: &str,
        at: DateTime<Utc>,
    ) -> Result<Loan, LoanError> {
        if !self.status.can_transition(target) {
            return Err(LoanError::InvalidTransition { current: self.status, requested: target });
        }
        Ok(Loan {
            status: target,
            updated_at: Some(at.max(self.created_at)),
            updated_by: Some(acting_user.to_string()),
            ..self.clone()
        })
    }

    pub(crate) fn with_id(self, id: LoanId) -> Self {
        Self { id: Some(id), ..self }
    }
}
