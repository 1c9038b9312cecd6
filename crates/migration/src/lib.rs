//! Migrator for the loan schema.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20260201_000001_create_loan;
mod m20260201_000002_add_loan_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260201_000001_create_loan::Migration),
            // Indexes should always be applied last
            Box::new(m20260201_000002_add_loan_indexes::Migration),
        ]
    }
}
