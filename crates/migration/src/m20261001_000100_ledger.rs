//! Cash ledger schema.
//!
//! - `cash_balance`: single-row projection of the cash ledger (id = 1)
//! - `cash_audit_logs`: append-only cash ledger with balance snapshots
//! - `transactions`: business events (income, expense, employee loan)
//! - `transaction_items`: ordered lines of a transaction

use sea_orm_migration::prelude::*;

use crate::m20261001_000000_catalog::{Employees, StockMutations};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum CashBalance {
    Table,
    Id,
    Balance,
    OpeningBalance,
    UpdatedAt,
}

#[derive(Iden)]
enum CashAuditLogs {
    Table,
    Id,
    Kind,
    Amount,
    PreviousBalance,
    NextBalance,
    Note,
    CreatedBy,
    TransactionId,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Kind,
    TotalAmount,
    Source,
    Note,
    CreatedBy,
    AuditLogId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TransactionItems {
    Table,
    Id,
    TransactionId,
    Position,
    Name,
    Quantity,
    Unit,
    Supplier,
    TotalPrice,
    MutationId,
    EmployeeId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CashBalance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashBalance::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CashBalance::Balance).big_integer().not_null())
                    .col(
                        ColumnDef::new(CashBalance::OpeningBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashBalance::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // The audit log <-> transaction link is stored on both sides without
        // foreign keys: each side is written in the same scope and deleted
        // together.
        manager
            .create_table(
                Table::create()
                    .table(CashAuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashAuditLogs::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CashAuditLogs::Kind).string().not_null())
                    .col(ColumnDef::new(CashAuditLogs::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(CashAuditLogs::PreviousBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CashAuditLogs::NextBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashAuditLogs::Note).string())
                    .col(ColumnDef::new(CashAuditLogs::CreatedBy).string().not_null())
                    .col(ColumnDef::new(CashAuditLogs::TransactionId).string())
                    .col(ColumnDef::new(CashAuditLogs::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cash_audit_logs-created_at")
                    .table(CashAuditLogs::Table)
                    .col(CashAuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Source).string())
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::AuditLogId).string())
                    .col(ColumnDef::new(Transactions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Transactions::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-kind-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::Kind)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionItems::Position).integer().not_null())
                    .col(ColumnDef::new(TransactionItems::Name).string().not_null())
                    .col(ColumnDef::new(TransactionItems::Quantity).double().not_null())
                    .col(ColumnDef::new(TransactionItems::Unit).string())
                    .col(ColumnDef::new(TransactionItems::Supplier).string())
                    .col(
                        ColumnDef::new(TransactionItems::TotalPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionItems::MutationId).string())
                    .col(ColumnDef::new(TransactionItems::EmployeeId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_items-transaction_id")
                            .from(TransactionItems::Table, TransactionItems::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_items-mutation_id")
                            .from(TransactionItems::Table, TransactionItems::MutationId)
                            .to(StockMutations::Table, StockMutations::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_items-employee_id")
                            .from(TransactionItems::Table, TransactionItems::EmployeeId)
                            .to(Employees::Table, Employees::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transaction_items-transaction_id")
                    .table(TransactionItems::Table)
                    .col(TransactionItems::TransactionId)
                    .col(TransactionItems::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transaction_items-mutation_id")
                    .table(TransactionItems::Table)
                    .col(TransactionItems::MutationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashAuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashBalance::Table).to_owned())
            .await?;
        Ok(())
    }
}
