use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const APPLICANT_NAME_MAX_LEN: usize = 128;
pub const MODIFIED_BY_MAX_LEN: usize = 128;
/// Fractional digits kept by the `DECIMAL(15, 2)` amount column.
pub const AMOUNT_SCALE: u32 = 2;
/// Integer digits available in the amount column (15 - 2).
pub const AMOUNT_INTEGER_DIGITS: u32 = 13;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub applicant_name: String,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub requested_amount: Decimal,
    pub currency: String,
    #[sea_orm(unique)]
    pub document: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
    pub updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency regex"));
// DNI: 8 digits + letter. NIE: X/Y/Z + 7 digits + letter.
static DOCUMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8}[A-Z]$|^[XYZ][0-9]{7}[A-Z]$").expect("document regex"));

pub fn validate_applicant_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::validation("applicant_name", "applicant name is required"));
    }
    if name.chars().count() > APPLICANT_NAME_MAX_LEN {
        return Err(ModelError::validation("applicant_name", format!("applicant name must be at most {APPLICANT_NAME_MAX_LEN} characters")));
    }
    Ok(())
}

pub fn validate_requested_amount(amount: &Decimal) -> Result<(), ModelError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(ModelError::validation("requested_amount", "requested amount must be positive"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(ModelError::validation(
            "requested_amount",
            format!("requested amount must have at most {AMOUNT_SCALE} decimal places"),
        ));
    }
    if *amount >= Decimal::from(10_i64.pow(AMOUNT_INTEGER_DIGITS)) {
        return Err(ModelError::validation(
            "requested_amount",
            format!("requested amount must be below 10^{AMOUNT_INTEGER_DIGITS}"),
        ));
    }
    Ok(())
}

pub fn validate_currency(currency: &str) -> Result<(), ModelError> {
    if !CURRENCY_RE.is_match(currency) {
        return Err(ModelError::validation("currency", "currency must be a 3-letter ISO code"));
    }
    Ok(())
}

pub fn validate_document(document: &str) -> Result<(), ModelError> {
    if !DOCUMENT_RE.is_match(document) {
        return Err(ModelError::validation(
            "document",
            "invalid document format; expected DNI (8 digits + letter) or NIE (X/Y/Z + 7 digits + letter)",
        ));
    }
    Ok(())
}

pub fn validate_modified_by(user: &str) -> Result<(), ModelError> {
    if user.trim().is_empty() {
        return Err(ModelError::validation("modified_by", "modifying user is required"));
    }
    if user.chars().count() > MODIFIED_BY_MAX_LEN {
        return Err(ModelError::validation("modified_by", format!("modifying user must be at most {MODIFIED_BY_MAX_LEN} characters")));
    }
    Ok(())
}

pub async fn exists_by_document(db: &DatabaseConnection, document: &str) -> Result<bool, ModelError> {
    let found = Entity::find()
        .filter(Column::Document.eq(document))
        .one(db)
        .await?;
    Ok(found.is_some())
}

pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// All loans, oldest first.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().order_by_asc(Column::Id).all(db).await?)
}

/// Insert a new row; the id is assigned by the database.
/// A clash on the unique `document` index comes back as `ModelError::Conflict`.
pub async fn insert(db: &DatabaseConnection, am: ActiveModel) -> Result<Model, ModelError> {
    Ok(am.insert(db).await?)
}

pub async fn update(db: &DatabaseConnection, am: ActiveModel) -> Result<Model, ModelError> {
    Ok(am.update(db).await?)
}
