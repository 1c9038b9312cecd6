use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Loan: listing by status
        manager
            .create_index(
                Index::create()
                    .name("idx_loan_status")
                    .table(Loan::Table)
                    .col(Loan::Status)
                    .to_owned(),
            )
            .await?;

        // Loan: ordering by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_loan_created_at")
                    .table(Loan::Table)
                    .col(Loan::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_loan_status").table(Loan::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_loan_created_at").table(Loan::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Loan { Table, Status, CreatedAt }
