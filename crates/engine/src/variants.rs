//! Variants and their stock projection.
//!
//! `current_stock` is a materialized running total of the variant's stock
//! mutations, expressed in `unit` (the item's default unit). It is only ever
//! changed by the stock ledger, in the same scope as the mutation row.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub created_at: DateTime<Utc>,
}

impl Variant {
    /// New variants start empty; initial stock is booked through the ledger.
    pub(crate) fn new(item_id: Uuid, name: String, unit: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            name,
            unit,
            current_stock: 0.0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Items,
    #[sea_orm(has_many = "super::stock_mutations::Entity")]
    StockMutations,
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::stock_mutations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMutations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Variant> for ActiveModel {
    fn from(variant: &Variant) -> Self {
        Self {
            id: ActiveValue::Set(variant.id.to_string()),
            item_id: ActiveValue::Set(variant.item_id.to_string()),
            name: ActiveValue::Set(variant.name.clone()),
            unit: ActiveValue::Set(variant.unit.clone()),
            current_stock: ActiveValue::Set(variant.current_stock),
            created_at: ActiveValue::Set(variant.created_at),
        }
    }
}

impl TryFrom<Model> for Variant {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "variant")?,
            item_id: parse_uuid(&model.item_id, "item")?,
            name: model.name,
            unit: model.unit,
            current_stock: model.current_stock,
            created_at: model.created_at,
        })
    }
}
