use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, OriginalUri, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use models::errors::ModelError;
use models::loan as rules;
use service::loan::{Loan, LoanId, LoanRepository, LoanService, LoanStatus, NewLoan};

use crate::errors::{ErrorBody, JsonApiError};
use crate::metrics;

#[derive(Clone)]
pub struct ServerState {
    pub loans: Arc<LoanService<dyn LoanRepository>>,
}

impl ServerState {
    pub fn new(repo: Arc<dyn LoanRepository>) -> Self {
        Self { loans: Arc::new(LoanService::new(repo)) }
    }
}

/// Body of `POST /api/loans`. Every field is checked, missing ones included,
/// so a single 400 can report all problems at once.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct CreateLoanRequest {
    #[schema(example = "Juan Pérez García")]
    pub applicant_name: Option<String>,
    #[schema(value_type = Option<String>, example = "15000.00")]
    pub requested_amount: Option<Decimal>,
    #[schema(example = "EUR")]
    pub currency: Option<String>,
    #[schema(example = "12345678A")]
    pub document: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ChangeStatusRequest {
    #[schema(example = "APPROVED")]
    pub status: Option<String>,
    #[schema(example = "alice")]
    pub modified_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub id: LoanId,
    pub applicant_name: String,
    #[schema(value_type = String, example = "15000.00")]
    pub requested_amount: Decimal,
    pub currency: String,
    pub document: String,
    #[schema(value_type = String, example = "PENDING")]
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl LoanResponse {
    fn from_loan(loan: &Loan, path: &str) -> Result<Self, JsonApiError> {
        let id = loan.id().ok_or_else(|| {
            JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "loan was returned without an id", path)
        })?;
        Ok(Self {
            id,
            applicant_name: loan.applicant_name().to_string(),
            requested_amount: loan.requested_amount(),
            currency: loan.currency().to_string(),
            document: loan.document().to_string(),
            status: loan.status(),
            created_at: loan.created_at(),
            updated_at: loan.updated_at(),
            updated_by: loan.updated_by().map(str::to_string),
        })
    }
}

fn record(errors: &mut BTreeMap<String, String>, res: Result<(), ModelError>) {
    if let Err(ModelError::Validation { field, message }) = res {
        errors.entry(field.to_string()).or_insert(message);
    }
}

fn required(errors: &mut BTreeMap<String, String>, field: &str) {
    errors.insert(field.to_string(), format!("{field} is required"));
}

impl CreateLoanRequest {
    /// Collect every field error; on success hand back a draft for the service.
    pub fn validate(self) -> Result<NewLoan, BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        match &self.applicant_name {
            Some(v) => record(&mut errors, rules::validate_applicant_name(v)),
            None => required(&mut errors, "applicant_name"),
        }
        match &self.requested_amount {
            Some(v) => record(&mut errors, rules::validate_requested_amount(v)),
            None => required(&mut errors, "requested_amount"),
        }
        match &self.currency {
            Some(v) => record(&mut errors, rules::validate_currency(v)),
            None => required(&mut errors, "currency"),
        }
        match &self.document {
            Some(v) => record(&mut errors, rules::validate_document(v)),
            None => required(&mut errors, "document"),
        }

        match (self.applicant_name, self.requested_amount, self.currency, self.document) {
            (Some(applicant_name), Some(requested_amount), Some(currency), Some(document)) if errors.is_empty() => {
                Ok(NewLoan { applicant_name, requested_amount, currency, document })
            }
            _ => Err(errors),
        }
    }
}

impl ChangeStatusRequest {
    pub fn validate(self) -> Result<(LoanStatus, String), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        let status = match self.status.as_deref() {
            Some(raw) => match raw.parse::<LoanStatus>() {
                Ok(s) => Some(s),
                Err(e) => {
                    errors.insert("status".to_string(), e.to_string());
                    None
                }
            },
            None => {
                required(&mut errors, "status");
                None
            }
        };
        match &self.modified_by {
            Some(v) => record(&mut errors, rules::validate_modified_by(v)),
            None => required(&mut errors, "modified_by"),
        }

        match (status, self.modified_by) {
            (Some(status), Some(user)) if errors.is_empty() => Ok((status, user)),
            _ => Err(errors),
        }
    }
}

#[utoipa::path(
    post, path = "/api/loans", tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Created", body = LoanResponse),
        (status = 400, description = "Validation Error", body = ErrorBody),
        (status = 409, description = "Duplicate Document", body = ErrorBody)
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoanResponse>), JsonApiError> {
    let path = uri.path();
    let Json(input) = body.map_err(|rej| JsonApiError::from_json_rejection(rej, path))?;
    let draft = input.validate().map_err(|errs| JsonApiError::validation(errs, path))?;

    let loan = state.loans.create(draft).await.map_err(|e| JsonApiError::from_loan(e, path))?;
    metrics::LOANS_CREATED_TOTAL.inc();
    info!(loan_id = ?loan.id(), "create loan request served");
    Ok((StatusCode::CREATED, Json(LoanResponse::from_loan(&loan, path)?)))
}

#[utoipa::path(
    get, path = "/api/loans", tag = "loans",
    responses(
        (status = 200, description = "All loans", body = [LoanResponse]),
        (status = 500, description = "Storage Failure", body = ErrorBody)
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<LoanResponse>>, JsonApiError> {
    let path = uri.path();
    let loans = state.loans.get_all().await.map_err(|e| JsonApiError::from_loan(e, path))?;
    let out = loans
        .iter()
        .map(|l| LoanResponse::from_loan(l, path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(out))
}

#[utoipa::path(
    get, path = "/api/loans/{id}", tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "OK", body = LoanResponse),
        (status = 400, description = "Bad Id", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get(
    State(state): State<ServerState>,
    OriginalUri(uri): OriginalUri,
    id: Result<Path<LoanId>, PathRejection>,
) -> Result<Json<LoanResponse>, JsonApiError> {
    let path = uri.path();
    let Path(id) = id.map_err(|rej| JsonApiError::from_path_rejection(rej, path))?;
    let loan = state.loans.get_by_id(id).await.map_err(|e| JsonApiError::from_loan(e, path))?;
    Ok(Json(LoanResponse::from_loan(&loan, path)?))
}

#[utoipa::path(
    patch, path = "/api/loans/{id}/status", tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status Changed", body = LoanResponse),
        (status = 400, description = "Validation Error", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Invalid Transition", body = ErrorBody)
    )
)]
pub async fn change_status(
    State(state): State<ServerState>,
    OriginalUri(uri): OriginalUri,
    id: Result<Path<LoanId>, PathRejection>,
    body: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<LoanResponse>, JsonApiError> {
    let path = uri.path();
    let Path(id) = id.map_err(|rej| JsonApiError::from_path_rejection(rej, path))?;
    let Json(input) = body.map_err(|rej| JsonApiError::from_json_rejection(rej, path))?;
    let (target, user) = input.validate().map_err(|errs| JsonApiError::validation(errs, path))?;

    let loan = state
        .loans
        .change_status(id, target, &user)
        .await
        .map_err(|e| JsonApiError::from_loan(e, path))?;
    metrics::STATUS_CHANGES_TOTAL.with_label_values(&[target.as_str()]).inc();
    Ok(Json(LoanResponse::from_loan(&loan, path)?))
}
