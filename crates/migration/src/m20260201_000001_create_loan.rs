//! Create `loan` table.
//!
//! One row per loan application. `document` carries a unique constraint so that
//! concurrent creations with the same document cannot both commit.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Loan::Table)
                    .if_not_exists()
                    .col(big_integer(Loan::Id).auto_increment().primary_key())
                    .col(string_len(Loan::ApplicantName, 128).not_null())
                    .col(decimal_len(Loan::RequestedAmount, 15, 2).not_null())
                    .col(string_len(Loan::Currency, 3).not_null())
                    .col(string_len(Loan::Document, 16).unique_key().not_null())
                    .col(string_len(Loan::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Loan::CreatedAt).not_null())
                    // Modification metadata stays NULL until the first status change
                    .col(
                        ColumnDef::new(Loan::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Loan::UpdatedBy)
                            .string_len(128)
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Loan::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Loan {
    Table,
    Id,
    ApplicantName,
    RequestedAmount,
    Currency,
    Document,
    Status,
    CreatedAt,
    UpdatedAt,
    UpdatedBy,
}
