use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::errors::ErrorBody;
use crate::routes::loans::{ChangeStatusRequest, CreateLoanRequest, LoanResponse};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::loans::create,
        crate::routes::loans::list,
        crate::routes::loans::get,
        crate::routes::loans::change_status,
    ),
    components(
        schemas(
            HealthResponse,
            CreateLoanRequest,
            ChangeStatusRequest,
            LoanResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "health"),
        (name = "loans", description = "Loan application lifecycle")
    )
)]
pub struct ApiDoc;
