use uuid::Uuid;

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Item, ResultEngine, UnitConversion, UnitRef, items, unit_conversions,
    util::{ensure_multiplier, normalize_required, require_actor},
};

use super::{Engine, with_tx};

pub(super) async fn load_item<C: ConnectionTrait>(db: &C, item_id: Uuid) -> ResultEngine<Item> {
    let model = items::Entity::find_by_id(item_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("item".to_string()))?;
    Item::try_from(model)
}

pub(super) async fn item_conversions<C: ConnectionTrait>(
    db: &C,
    item_id: Uuid,
) -> ResultEngine<Vec<UnitConversion>> {
    unit_conversions::Entity::find()
        .filter(unit_conversions::Column::ItemId.eq(item_id.to_string()))
        .order_by_asc(unit_conversions::Column::FromUnit)
        .all(db)
        .await?
        .into_iter()
        .map(UnitConversion::try_from)
        .collect()
}

/// Resolves a unit reference against one item's conversion table.
pub(super) async fn resolve_conversion<C: ConnectionTrait>(
    db: &C,
    item_id: Uuid,
    unit: &UnitRef,
) -> ResultEngine<UnitConversion> {
    let query = unit_conversions::Entity::find()
        .filter(unit_conversions::Column::ItemId.eq(item_id.to_string()));
    let query = match unit {
        UnitRef::Id(id) => query.filter(unit_conversions::Column::Id.eq(id.to_string())),
        UnitRef::Name(name) => query.filter(unit_conversions::Column::FromUnit.eq(name.trim())),
    };
    let model = query
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("unit conversion".to_string()))?;
    UnitConversion::try_from(model)
}

async fn load_conversion<C: ConnectionTrait>(
    db: &C,
    conversion_id: Uuid,
) -> ResultEngine<UnitConversion> {
    let model = unit_conversions::Entity::find_by_id(conversion_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("unit conversion".to_string()))?;
    UnitConversion::try_from(model)
}

impl Engine {
    /// Adds a unit to an item's conversion table (`from_unit -> default_unit`).
    pub async fn add_unit_conversion(
        &self,
        item_id: Uuid,
        from_unit: &str,
        multiplier: f64,
        user_id: &str,
    ) -> ResultEngine<UnitConversion> {
        require_actor(user_id)?;
        let from_unit = normalize_required(from_unit, "unit")?;
        ensure_multiplier(multiplier)?;

        with_tx!(self, |db_tx| {
            let item = load_item(&db_tx, item_id).await?;
            let taken = unit_conversions::Entity::find()
                .filter(unit_conversions::Column::ItemId.eq(item_id.to_string()))
                .filter(unit_conversions::Column::FromUnit.eq(from_unit.as_str()))
                .one(&db_tx)
                .await?;
            if taken.is_some() {
                return Err(EngineError::Validation(format!(
                    "unit {from_unit} already exists for this item"
                )));
            }

            let conversion = UnitConversion::new(item.id, from_unit, item.default_unit, multiplier);
            unit_conversions::ActiveModel::from(&conversion)
                .insert(&db_tx)
                .await?;
            tracing::info!(
                item_id = %item.id,
                unit = %conversion.from_unit,
                multiplier,
                "unit conversion added"
            );
            Ok(conversion)
        })
    }

    /// Re-scales a unit. Existing stock mutations keep the multiplier they
    /// were written with.
    pub async fn update_unit_conversion(
        &self,
        conversion_id: Uuid,
        multiplier: f64,
        user_id: &str,
    ) -> ResultEngine<UnitConversion> {
        require_actor(user_id)?;
        ensure_multiplier(multiplier)?;

        with_tx!(self, |db_tx| {
            let mut conversion = load_conversion(&db_tx, conversion_id).await?;
            if conversion.is_reflexive() {
                return Err(EngineError::Validation(
                    "the default unit conversion is fixed at 1".to_string(),
                ));
            }

            let active = unit_conversions::ActiveModel {
                id: ActiveValue::Set(conversion.id.to_string()),
                multiplier: ActiveValue::Set(multiplier),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            conversion.multiplier = multiplier;
            Ok(conversion)
        })
    }

    pub async fn delete_unit_conversion(&self, conversion_id: Uuid, user_id: &str) -> ResultEngine<()> {
        require_actor(user_id)?;

        with_tx!(self, |db_tx| {
            let conversion = load_conversion(&db_tx, conversion_id).await?;
            if conversion.is_reflexive() {
                return Err(EngineError::Validation(
                    "the default unit conversion cannot be deleted".to_string(),
                ));
            }
            unit_conversions::Entity::delete_by_id(conversion.id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(
                item_id = %conversion.item_id,
                unit = %conversion.from_unit,
                "unit conversion deleted"
            );
            Ok(())
        })
    }
}
