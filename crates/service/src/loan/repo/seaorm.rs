use chrono::Utc;
use models::errors::ModelError;
use models::loan;
use sea_orm::{DatabaseConnection, NotSet, Set, Unchanged};

use crate::loan::domain::{Loan, LoanId, LoanStatus};
use crate::loan::errors::LoanError;
use crate::loan::repository::LoanRepository;

/// SeaORM-backed repository over the `loan` table.
pub struct SeaOrmLoanRepository {
    pub db: DatabaseConnection,
}

fn to_domain(m: loan::Model) -> Result<Loan, LoanError> {
    let status = m
        .status
        .parse::<LoanStatus>()
        .map_err(|e| LoanError::Repository(e.to_string()))?;
    Ok(Loan {
        id: Some(m.id),
        applicant_name: m.applicant_name,
        requested_amount: m.requested_amount,
        currency: m.currency,
        document: m.document,
        status,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.map(|t| t.with_timezone(&Utc)),
        updated_by: m.updated_by,
    })
}

fn repo_err(e: ModelError) -> LoanError {
    LoanError::Repository(e.to_string())
}

#[async_trait::async_trait]
impl LoanRepository for SeaOrmLoanRepository {
    async fn exists_by_document(&self, document: &str) -> Result<bool, LoanError> {
        loan::exists_by_document(&self.db, document).await.map_err(repo_err)
    }

    async fn save(&self, l: Loan) -> Result<Loan, LoanError> {
        let row = match l.id {
            None => {
                let am = loan::ActiveModel {
                    id: NotSet,
                    applicant_name: Set(l.applicant_name),
                    requested_amount: Set(l.requested_amount),
                    currency: Set(l.currency),
                    document: Set(l.document.clone()),
                    status: Set(l.status.as_str().to_string()),
                    created_at: Set(l.created_at.into()),
                    updated_at: Set(l.updated_at.map(Into::into)),
                    updated_by: Set(l.updated_by),
                };
                // a concurrent insert that slipped past the existence check lands here
                loan::insert(&self.db, am).await.map_err(|e| match e {
                    ModelError::Conflict(_) => LoanError::DuplicateDocument(l.document),
                    other => repo_err(other),
                })?
            }
            Some(id) => {
                // only lifecycle columns are ever rewritten
                let am = loan::ActiveModel {
                    id: Unchanged(id),
                    applicant_name: NotSet,
                    requested_amount: NotSet,
                    currency: NotSet,
                    document: NotSet,
                    status: Set(l.status.as_str().to_string()),
                    created_at: NotSet,
                    updated_at: Set(l.updated_at.map(Into::into)),
                    updated_by: Set(l.updated_by),
                };
                loan::update(&self.db, am).await.map_err(repo_err)?
            }
        };
        to_domain(row)
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>, LoanError> {
        loan::find_by_id(&self.db, id)
            .await
            .map_err(repo_err)?
            .map(to_domain)
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Loan>, LoanError> {
        loan::list_all(&self.db)
            .await
            .map_err(repo_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::domain::NewLoan;
    use crate::loan::service::LoanService;
    use crate::test_support::get_db;
    use rust_decimal::Decimal;
    use sea_orm::EntityTrait;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_document() -> String {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();
        format!("{:08}S", nanos % 100_000_000)
    }

    #[tokio::test]
    async fn loan_lifecycle_against_postgres() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
            return Ok(());
        }
        let db = get_db().await?;
        let svc = LoanService::new(Arc::new(SeaOrmLoanRepository { db: db.clone() }));
        let document = unique_document();
        let draft = NewLoan {
            applicant_name: "Db Tester".into(),
            requested_amount: Decimal::new(250_050, 2),
            currency: "EUR".into(),
            document: document.clone(),
        };

        let created = svc.create(draft.clone()).await?;
        let id = created.id().expect("db assigns id");
        assert_eq!(created.status(), LoanStatus::Pending);
        assert_eq!(created.requested_amount(), Decimal::new(250_050, 2));
        assert!(created.updated_at().is_none());

        assert_eq!(svc.create(draft).await.unwrap_err(), LoanError::DuplicateDocument(document.clone()));

        let approved = svc.change_status(id, LoanStatus::Approved, "alice").await?;
        assert_eq!(approved.status(), LoanStatus::Approved);
        assert_eq!(approved.updated_by(), Some("alice"));
        assert_eq!(approved.created_at(), created.created_at());
        assert_eq!(approved.document(), document);

        let err = svc.change_status(id, LoanStatus::Rejected, "alice").await.unwrap_err();
        assert!(matches!(err, LoanError::InvalidTransition { .. }));
        assert_eq!(svc.get_by_id(id).await?.status(), LoanStatus::Approved);
        assert!(svc.get_all().await?.iter().any(|l| l.id() == Some(id)));

        // cleanup
        loan::Entity::delete_by_id(id).exec(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn racing_insert_maps_unique_violation_to_duplicate() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
            return Ok(());
        }
        let db = get_db().await?;
        let repo = SeaOrmLoanRepository { db: db.clone() };
        let document = unique_document();
        let fresh = || {
            Loan::open(
                NewLoan {
                    applicant_name: "Race".into(),
                    requested_amount: Decimal::ONE,
                    currency: "USD".into(),
                    document: document.clone(),
                },
                Utc::now(),
            )
        };

        // bypass the service check to hit the index directly
        let first = repo.save(fresh()).await?;
        let second = repo.save(fresh()).await;
        assert_eq!(second.unwrap_err(), LoanError::DuplicateDocument(document.clone()));

        loan::Entity::delete_by_id(first.id().expect("id")).exec(&db).await?;
        Ok(())
    }
}
