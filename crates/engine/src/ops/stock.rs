//! Stock ledger and the variant stock projection.
//!
//! `current_stock` is only shifted by a server-side `current_stock + delta`
//! expression in the same scope as the mutation row it mirrors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    AddStockCmd, EngineError, LineLink, RecordMutationCmd, RemoveStockCmd, ResultEngine,
    StockMutation, StockMutationKind, Transaction, TransactionItem, TransactionKind, UnitRef,
    UpdateVariantCmd, Variant, stock_mutations, transaction_items, variants,
    util::{
        ensure_positive_amount, ensure_positive_quantity, normalize_optional_text,
        normalize_required, parse_uuid, require_actor,
    },
};

use super::{
    Engine,
    units::{load_item, resolve_conversion},
    with_tx,
};

/// Result of booking stock into a variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockArrival {
    pub variant: Variant,
    pub mutation: StockMutation,
    /// The expense recorded when the arrival was also a purchase.
    pub transaction: Option<Transaction>,
}

pub(super) async fn load_variant<C: ConnectionTrait>(
    db: &C,
    variant_id: Uuid,
) -> ResultEngine<Variant> {
    let model = variants::Entity::find_by_id(variant_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("variant".to_string()))?;
    Variant::try_from(model)
}

async fn shift_variant_stock(
    db_tx: &DatabaseTransaction,
    variant_id: Uuid,
    delta: f64,
) -> ResultEngine<f64> {
    let res = variants::Entity::update_many()
        .col_expr(
            variants::Column::CurrentStock,
            Expr::col(variants::Column::CurrentStock).add(delta),
        )
        .filter(variants::Column::Id.eq(variant_id.to_string()))
        .exec(db_tx)
        .await?;
    if res.rows_affected == 0 {
        return Err(EngineError::NotFound("variant".to_string()));
    }
    Ok(load_variant(db_tx, variant_id).await?.current_stock)
}

/// Writes a mutation row and moves the variant's stock by its delta.
/// Returns the variant's stock afterwards.
pub(super) async fn append_mutation(
    db_tx: &DatabaseTransaction,
    mutation: &StockMutation,
) -> ResultEngine<f64> {
    stock_mutations::ActiveModel::from(mutation)
        .insert(db_tx)
        .await?;
    let stock = shift_variant_stock(db_tx, mutation.variant_id, mutation.stock_delta()).await?;
    tracing::debug!(
        mutation_id = %mutation.id,
        variant_id = %mutation.variant_id,
        kind = mutation.kind.as_str(),
        quantity = mutation.quantity,
        unit = %mutation.unit,
        normalized = mutation.normalized_quantity,
        stock,
        "stock mutation appended"
    );
    Ok(stock)
}

/// Applies the inverse of a mutation to its variant and deletes the row.
pub(super) async fn reverse_mutation(
    db_tx: &DatabaseTransaction,
    mutation_id: Uuid,
) -> ResultEngine<StockMutation> {
    let model = stock_mutations::Entity::find_by_id(mutation_id.to_string())
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound("stock mutation".to_string()))?;
    let mutation = StockMutation::try_from(model)?;

    let stock = shift_variant_stock(db_tx, mutation.variant_id, -mutation.stock_delta()).await?;
    stock_mutations::Entity::delete_by_id(mutation.id.to_string())
        .exec(db_tx)
        .await?;
    tracing::debug!(
        mutation_id = %mutation.id,
        variant_id = %mutation.variant_id,
        kind = mutation.kind.as_str(),
        normalized = mutation.normalized_quantity,
        stock,
        "stock mutation reversed"
    );
    Ok(mutation)
}

/// Sets the variant's stock to `new_stock` and books the difference from the
/// stock read in this scope as one `ADJUSTMENT`. Writes nothing when they
/// are equal.
pub(super) async fn adjust_variant_stock(
    db_tx: &DatabaseTransaction,
    variant_id: Uuid,
    new_stock: f64,
    created_by: &str,
) -> ResultEngine<Option<StockMutation>> {
    if !new_stock.is_finite() {
        return Err(EngineError::Validation(
            "stock must be a finite number".to_string(),
        ));
    }
    let variant = load_variant(db_tx, variant_id).await?;
    let delta = new_stock - variant.current_stock;
    if delta == 0.0 {
        return Ok(None);
    }

    let mutation = StockMutation::new(
        variant.id,
        StockMutationKind::Adjustment,
        delta,
        variant.unit.clone(),
        1.0,
        None,
        Some(format!(
            "stock adjusted from {} to {}",
            variant.current_stock, new_stock
        )),
        created_by.to_string(),
    );
    stock_mutations::ActiveModel::from(&mutation)
        .insert(db_tx)
        .await?;
    // Assigned, not shifted: `old + (new - old)` can land one ulp off `new`.
    variants::Entity::update_many()
        .col_expr(variants::Column::CurrentStock, Expr::value(new_stock))
        .filter(variants::Column::Id.eq(variant.id.to_string()))
        .exec(db_tx)
        .await?;
    tracing::debug!(
        mutation_id = %mutation.id,
        variant_id = %variant.id,
        delta,
        stock = new_stock,
        "stock adjusted"
    );
    Ok(Some(mutation))
}

/// Books an initial `IN` for a freshly created variant.
pub(super) async fn book_initial_stock(
    db_tx: &DatabaseTransaction,
    variant: &mut Variant,
    quantity: f64,
    created_by: &str,
) -> ResultEngine<()> {
    if quantity == 0.0 {
        return Ok(());
    }
    let mutation = StockMutation::new(
        variant.id,
        StockMutationKind::In,
        quantity,
        variant.unit.clone(),
        1.0,
        Some("initial stock".to_string()),
        None,
        created_by.to_string(),
    );
    variant.current_stock = append_mutation(db_tx, &mutation).await?;
    Ok(())
}

fn ensure_initial_stock(quantity: f64) -> ResultEngine<()> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(EngineError::Validation(
            "initial stock must be >= 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Books stock into a variant. With a purchase order the arrival is also
    /// recorded as an expense paid from cash, its single line linked to the
    /// new mutation.
    pub async fn add_stock(&self, cmd: AddStockCmd) -> ResultEngine<StockArrival> {
        let actor = require_actor(&cmd.user_id)?;
        ensure_positive_quantity(cmd.quantity, "quantity")?;
        if let Some(order) = &cmd.order {
            ensure_positive_amount(order.total_price, "total price")?;
        }
        let note = normalize_optional_text(cmd.note.as_deref());
        let supplier = cmd
            .order
            .as_ref()
            .and_then(|order| normalize_optional_text(order.supplier.as_deref()));

        let arrival = with_tx!(self, |db_tx| {
            let mut variant = load_variant(&db_tx, cmd.variant_id).await?;
            let item = load_item(&db_tx, variant.item_id).await?;
            let conversion = resolve_conversion(&db_tx, item.id, &cmd.unit).await?;

            let mutation = StockMutation::new(
                variant.id,
                StockMutationKind::In,
                cmd.quantity,
                conversion.from_unit.clone(),
                conversion.multiplier,
                supplier.clone(),
                note.clone(),
                actor.clone(),
            );
            variant.current_stock = append_mutation(&db_tx, &mutation).await?;

            let transaction = match &cmd.order {
                Some(order) => {
                    let mut tx =
                        Transaction::new(TransactionKind::Expense, supplier.clone(), note, actor.clone());
                    tx.items.push(TransactionItem {
                        id: Uuid::new_v4(),
                        transaction_id: tx.id,
                        position: 0,
                        name: format!("{} - {}", item.name, variant.name),
                        quantity: cmd.quantity,
                        unit: Some(conversion.from_unit.clone()),
                        supplier,
                        total_price: order.total_price,
                        link: LineLink::Stock {
                            mutation_id: mutation.id,
                        },
                    });
                    Some(self.insert_transaction(&db_tx, tx).await?)
                }
                None => None,
            };

            Ok(StockArrival {
                variant,
                mutation,
                transaction,
            })
        })?;

        tracing::info!(
            variant_id = %arrival.variant.id,
            normalized = arrival.mutation.normalized_quantity,
            stock = arrival.variant.current_stock,
            purchase = arrival.transaction.is_some(),
            "stock added"
        );
        Ok(arrival)
    }

    /// Takes stock out of a variant with an `OUT` mutation.
    pub async fn remove_stock(&self, cmd: RemoveStockCmd) -> ResultEngine<StockMutation> {
        let actor = require_actor(&cmd.user_id)?;
        ensure_positive_quantity(cmd.quantity, "quantity")?;
        let note = normalize_optional_text(cmd.note.as_deref());

        let (mutation, stock) = with_tx!(self, |db_tx| {
            let variant = load_variant(&db_tx, cmd.variant_id).await?;
            let conversion = resolve_conversion(&db_tx, variant.item_id, &cmd.unit).await?;
            let mutation = StockMutation::new(
                variant.id,
                StockMutationKind::Out,
                cmd.quantity,
                conversion.from_unit,
                conversion.multiplier,
                None,
                note,
                actor,
            );
            let stock = append_mutation(&db_tx, &mutation).await?;
            Ok((mutation, stock))
        })?;

        tracing::info!(
            variant_id = %mutation.variant_id,
            normalized = mutation.normalized_quantity,
            stock,
            "stock removed"
        );
        Ok(mutation)
    }

    /// Writes a manual stock ledger entry.
    pub async fn record_stock_mutation(
        &self,
        cmd: RecordMutationCmd,
    ) -> ResultEngine<StockMutation> {
        let actor = require_actor(&cmd.user_id)?;
        match cmd.kind {
            StockMutationKind::In | StockMutationKind::Out => {
                ensure_positive_quantity(cmd.quantity, "quantity")?;
            }
            StockMutationKind::Adjustment => {
                if !cmd.quantity.is_finite() || cmd.quantity == 0.0 {
                    return Err(EngineError::Validation(
                        "adjustment quantity must be non-zero".to_string(),
                    ));
                }
            }
        }
        let source = normalize_optional_text(cmd.source.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let mutation = with_tx!(self, |db_tx| {
            let variant = load_variant(&db_tx, cmd.variant_id).await?;
            let unit = cmd
                .unit
                .clone()
                .unwrap_or_else(|| UnitRef::Name(variant.unit.clone()));
            let conversion = resolve_conversion(&db_tx, variant.item_id, &unit).await?;
            let mutation = StockMutation::new(
                variant.id,
                cmd.kind,
                cmd.quantity,
                conversion.from_unit,
                conversion.multiplier,
                source,
                note,
                actor,
            );
            append_mutation(&db_tx, &mutation).await?;
            Ok(mutation)
        })?;

        tracing::info!(
            mutation_id = %mutation.id,
            variant_id = %mutation.variant_id,
            kind = mutation.kind.as_str(),
            "stock mutation recorded"
        );
        Ok(mutation)
    }

    /// Ledger rows for one variant, oldest first.
    pub async fn stock_mutations(&self, variant_id: Uuid) -> ResultEngine<Vec<StockMutation>> {
        stock_mutations::Entity::find()
            .filter(stock_mutations::Column::VariantId.eq(variant_id.to_string()))
            .order_by_asc(stock_mutations::Column::CreatedAt)
            .order_by_asc(stock_mutations::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(StockMutation::try_from)
            .collect()
    }

    pub async fn variant(&self, variant_id: Uuid) -> ResultEngine<Variant> {
        load_variant(&self.database, variant_id).await
    }

    /// Adds a variant to an item. It uses the item's default unit and any
    /// positive initial stock is booked as an `IN` mutation.
    pub async fn create_variant(
        &self,
        item_id: Uuid,
        name: &str,
        initial_stock: f64,
        user_id: &str,
    ) -> ResultEngine<Variant> {
        let actor = require_actor(user_id)?;
        let name = normalize_required(name, "variant name")?;
        ensure_initial_stock(initial_stock)?;

        let variant = with_tx!(self, |db_tx| {
            let item = load_item(&db_tx, item_id).await?;
            let mut variant = Variant::new(item.id, name, item.default_unit);
            variants::ActiveModel::from(&variant).insert(&db_tx).await?;
            book_initial_stock(&db_tx, &mut variant, initial_stock, &actor).await?;
            Ok(variant)
        })?;

        tracing::info!(
            variant_id = %variant.id,
            item_id = %variant.item_id,
            stock = variant.current_stock,
            "variant created"
        );
        Ok(variant)
    }

    /// Renames a variant and/or sets its stock. A stock change is booked as
    /// one `ADJUSTMENT`; an unchanged value writes no ledger row.
    pub async fn update_variant(&self, cmd: UpdateVariantCmd) -> ResultEngine<Variant> {
        let actor = require_actor(&cmd.user_id)?;
        let name = cmd
            .name
            .as_deref()
            .map(|name| normalize_required(name, "variant name"))
            .transpose()?;

        let (variant, adjustment) = with_tx!(self, |db_tx| {
            let mut variant = load_variant(&db_tx, cmd.variant_id).await?;

            if let Some(name) = name {
                let active = variants::ActiveModel {
                    id: ActiveValue::Set(variant.id.to_string()),
                    name: ActiveValue::Set(name.clone()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                variant.name = name;
            }

            let adjustment = match cmd.current_stock {
                Some(stock) => adjust_variant_stock(&db_tx, variant.id, stock, &actor).await?,
                None => None,
            };
            if adjustment.is_some() {
                variant = load_variant(&db_tx, variant.id).await?;
            }
            Ok((variant, adjustment))
        })?;

        tracing::info!(
            variant_id = %variant.id,
            adjusted = adjustment.is_some(),
            stock = variant.current_stock,
            "variant updated"
        );
        Ok(variant)
    }

    /// Deletes a variant. Transaction lines that bought it keep their price
    /// but lose the stock link; every mutation is reversed before the
    /// variant row goes.
    pub async fn delete_variant(&self, variant_id: Uuid, user_id: &str) -> ResultEngine<()> {
        require_actor(user_id)?;

        let reversed = with_tx!(self, |db_tx| {
            let variant = load_variant(&db_tx, variant_id).await?;
            let mutation_ids: Vec<String> = stock_mutations::Entity::find()
                .filter(stock_mutations::Column::VariantId.eq(variant.id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect();

            if !mutation_ids.is_empty() {
                transaction_items::Entity::update_many()
                    .col_expr(
                        transaction_items::Column::MutationId,
                        Expr::value(Option::<String>::None),
                    )
                    .filter(transaction_items::Column::MutationId.is_in(mutation_ids.clone()))
                    .exec(&db_tx)
                    .await?;
            }

            for id in &mutation_ids {
                reverse_mutation(&db_tx, parse_uuid(id, "stock mutation")?).await?;
            }

            variants::Entity::delete_by_id(variant.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(mutation_ids.len())
        })?;

        tracing::info!(%variant_id, reversed, "variant deleted");
        Ok(())
    }
}
