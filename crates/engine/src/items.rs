//! Catalog items.
//!
//! An [`Item`] is a kind of stock (e.g. "Kain Katun"). All stock arithmetic
//! for its variants happens in the item's `default_unit`, which never changes
//! after creation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, UnitConversion, Variant, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub default_unit: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub(crate) fn new(name: String, slug: String, default_unit: String, created_by: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            default_unit,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// An item together with its conversions and variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: Item,
    pub conversions: Vec<UnitConversion>,
    pub variants: Vec<Variant>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub default_unit: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unit_conversions::Entity")]
    UnitConversions,
    #[sea_orm(has_many = "super::variants::Entity")]
    Variants,
}

impl Related<super::unit_conversions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitConversions.def()
    }
}

impl Related<super::variants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Item> for ActiveModel {
    fn from(item: &Item) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            name: ActiveValue::Set(item.name.clone()),
            slug: ActiveValue::Set(item.slug.clone()),
            default_unit: ActiveValue::Set(item.default_unit.clone()),
            created_by: ActiveValue::Set(item.created_by.clone()),
            created_at: ActiveValue::Set(item.created_at),
        }
    }
}

impl TryFrom<Model> for Item {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "item")?,
            name: model.name,
            slug: model.slug,
            default_unit: model.default_unit,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
