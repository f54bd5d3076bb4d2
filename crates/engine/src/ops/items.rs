use std::collections::HashSet;

use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Item, ItemDetail, NewItemCmd, ResultEngine, UnitConversion, Variant, items,
    unit_conversions, variants,
    util::{ensure_multiplier, normalize_required, require_actor, slugify},
};

use super::{
    Engine,
    stock::book_initial_stock,
    units::{item_conversions, load_item},
    with_tx,
};

fn item_slug(name: &str) -> ResultEngine<String> {
    slugify(name).ok_or_else(|| {
        EngineError::Validation("item name must contain letters or digits".to_string())
    })
}

async fn ensure_slug_free<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let mut query = items::Entity::find().filter(items::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(items::Column::Id.ne(id.to_string()));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::Validation(format!(
            "an item with slug {slug} already exists"
        )));
    }
    Ok(())
}

async fn item_detail<C: ConnectionTrait>(db: &C, item: Item) -> ResultEngine<ItemDetail> {
    let conversions = item_conversions(db, item.id).await?;
    let variants = variants::Entity::find()
        .filter(variants::Column::ItemId.eq(item.id.to_string()))
        .order_by_asc(variants::Column::CreatedAt)
        .order_by_asc(variants::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Variant::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    Ok(ItemDetail {
        item,
        conversions,
        variants,
    })
}

impl Engine {
    /// Creates an item with its unit table and variants.
    ///
    /// The reflexive `default_unit x1` conversion is always inserted. Initial
    /// variant stock is booked as `IN` mutations so the projection matches
    /// the ledger from the start.
    pub async fn create_item(&self, cmd: NewItemCmd) -> ResultEngine<ItemDetail> {
        let actor = require_actor(&cmd.user_id)?;
        let name = normalize_required(&cmd.name, "item name")?;
        let default_unit = normalize_required(&cmd.default_unit, "default unit")?;
        let slug = item_slug(&name)?;

        let mut seen = HashSet::from([default_unit.clone()]);
        let mut extra_units = Vec::with_capacity(cmd.conversions.len());
        for conversion in &cmd.conversions {
            let unit = normalize_required(&conversion.from_unit, "unit")?;
            ensure_multiplier(conversion.multiplier)?;
            if unit == default_unit {
                if conversion.multiplier != 1.0 {
                    return Err(EngineError::Validation(
                        "the default unit conversion is fixed at 1".to_string(),
                    ));
                }
                continue;
            }
            if !seen.insert(unit.clone()) {
                return Err(EngineError::Validation(format!("duplicate unit {unit}")));
            }
            extra_units.push((unit, conversion.multiplier));
        }

        let mut new_variants = Vec::with_capacity(cmd.variants.len());
        for variant in &cmd.variants {
            let variant_name = normalize_required(&variant.name, "variant name")?;
            if !variant.initial_stock.is_finite() || variant.initial_stock < 0.0 {
                return Err(EngineError::Validation(
                    "initial stock must be >= 0".to_string(),
                ));
            }
            new_variants.push((variant_name, variant.initial_stock));
        }

        let detail = with_tx!(self, |db_tx| {
            ensure_slug_free(&db_tx, &slug, None).await?;

            let item = Item::new(name, slug, default_unit, actor.clone());
            items::ActiveModel::from(&item).insert(&db_tx).await?;

            let mut conversions = vec![UnitConversion::reflexive(item.id, &item.default_unit)];
            for (unit, multiplier) in extra_units {
                conversions.push(UnitConversion::new(
                    item.id,
                    unit,
                    item.default_unit.clone(),
                    multiplier,
                ));
            }
            for conversion in &conversions {
                unit_conversions::ActiveModel::from(conversion)
                    .insert(&db_tx)
                    .await?;
            }

            let mut variants = Vec::with_capacity(new_variants.len());
            for (variant_name, initial_stock) in new_variants {
                let mut variant = Variant::new(item.id, variant_name, item.default_unit.clone());
                variants::ActiveModel::from(&variant).insert(&db_tx).await?;
                book_initial_stock(&db_tx, &mut variant, initial_stock, &actor).await?;
                variants.push(variant);
            }

            Ok(ItemDetail {
                item,
                conversions,
                variants,
            })
        })?;

        tracing::info!(
            item_id = %detail.item.id,
            slug = %detail.item.slug,
            units = detail.conversions.len(),
            variants = detail.variants.len(),
            "item created"
        );
        Ok(detail)
    }

    /// Renames an item and refreshes its slug. The default unit never changes.
    pub async fn rename_item(&self, item_id: Uuid, name: &str, user_id: &str) -> ResultEngine<Item> {
        require_actor(user_id)?;
        let name = normalize_required(name, "item name")?;
        let slug = item_slug(&name)?;

        let item = with_tx!(self, |db_tx| {
            let mut item = load_item(&db_tx, item_id).await?;
            ensure_slug_free(&db_tx, &slug, Some(item.id)).await?;

            let active = items::ActiveModel {
                id: ActiveValue::Set(item.id.to_string()),
                name: ActiveValue::Set(name.clone()),
                slug: ActiveValue::Set(slug.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            item.name = name;
            item.slug = slug;
            Ok(item)
        })?;

        tracing::info!(item_id = %item.id, slug = %item.slug, "item renamed");
        Ok(item)
    }

    pub async fn item(&self, item_id: Uuid) -> ResultEngine<ItemDetail> {
        let item = load_item(&self.database, item_id).await?;
        item_detail(&self.database, item).await
    }

    pub async fn item_by_slug(&self, slug: &str) -> ResultEngine<ItemDetail> {
        let model = items::Entity::find()
            .filter(items::Column::Slug.eq(slug.trim()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("item".to_string()))?;
        item_detail(&self.database, Item::try_from(model)?).await
    }
}
