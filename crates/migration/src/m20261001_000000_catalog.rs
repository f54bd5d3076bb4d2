//! Catalog schema: what is kept in stock and who can borrow cash.
//!
//! - `items`: catalog entries with their immutable default unit
//! - `unit_conversions`: per-item multipliers into the default unit
//! - `variants`: stock-keeping units with the materialized `current_stock`
//! - `stock_mutations`: append-only stock ledger
//! - `employees`: registry referenced by employee loans

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Items {
    Table,
    Id,
    Name,
    Slug,
    DefaultUnit,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum UnitConversions {
    Table,
    Id,
    ItemId,
    FromUnit,
    ToUnit,
    Multiplier,
}

#[derive(Iden)]
enum Variants {
    Table,
    Id,
    ItemId,
    Name,
    Unit,
    CurrentStock,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum StockMutations {
    Table,
    Id,
    VariantId,
    Kind,
    Quantity,
    Unit,
    Multiplier,
    NormalizedQuantity,
    Source,
    Note,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Employees {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(ColumnDef::new(Items::Slug).string().not_null())
                    .col(ColumnDef::new(Items::DefaultUnit).string().not_null())
                    .col(ColumnDef::new(Items::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-items-slug")
                    .table(Items::Table)
                    .col(Items::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Unit conversions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(UnitConversions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UnitConversions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UnitConversions::ItemId).string().not_null())
                    .col(ColumnDef::new(UnitConversions::FromUnit).string().not_null())
                    .col(ColumnDef::new(UnitConversions::ToUnit).string().not_null())
                    .col(ColumnDef::new(UnitConversions::Multiplier).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-unit_conversions-item_id")
                            .from(UnitConversions::Table, UnitConversions::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-unit_conversions-item_id-from_unit")
                    .table(UnitConversions::Table)
                    .col(UnitConversions::ItemId)
                    .col(UnitConversions::FromUnit)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Variants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Variants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Variants::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Variants::ItemId).string().not_null())
                    .col(ColumnDef::new(Variants::Name).string().not_null())
                    .col(ColumnDef::new(Variants::Unit).string().not_null())
                    .col(
                        ColumnDef::new(Variants::CurrentStock)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Variants::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-variants-item_id")
                            .from(Variants::Table, Variants::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-variants-item_id")
                    .table(Variants::Table)
                    .col(Variants::ItemId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Stock mutations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(StockMutations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMutations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockMutations::VariantId).string().not_null())
                    .col(ColumnDef::new(StockMutations::Kind).string().not_null())
                    .col(ColumnDef::new(StockMutations::Quantity).double().not_null())
                    .col(ColumnDef::new(StockMutations::Unit).string().not_null())
                    .col(ColumnDef::new(StockMutations::Multiplier).double().not_null())
                    .col(
                        ColumnDef::new(StockMutations::NormalizedQuantity)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMutations::Source).string())
                    .col(ColumnDef::new(StockMutations::Note).string())
                    .col(ColumnDef::new(StockMutations::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(StockMutations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-stock_mutations-variant_id")
                            .from(StockMutations::Table, StockMutations::VariantId)
                            .to(Variants::Table, Variants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stock_mutations-variant_id-created_at")
                    .table(StockMutations::Table)
                    .col(StockMutations::VariantId)
                    .col(StockMutations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Employees
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employees::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Employees::Name).string().not_null())
                    .col(ColumnDef::new(Employees::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employees::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockMutations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Variants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UnitConversions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        Ok(())
    }
}
