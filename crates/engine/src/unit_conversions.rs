//! Per-item unit conversion table.
//!
//! A [`UnitConversion`] says how many default units one `from_unit` is worth
//! (e.g. `roll -> meter x40`). Every item always owns the reflexive
//! `default_unit -> default_unit x1` row.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub id: Uuid,
    pub item_id: Uuid,
    pub from_unit: String,
    pub to_unit: String,
    pub multiplier: f64,
}

impl UnitConversion {
    pub(crate) fn new(item_id: Uuid, from_unit: String, to_unit: String, multiplier: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            from_unit,
            to_unit,
            multiplier,
        }
    }

    /// The `default_unit -> default_unit` row every item carries.
    pub(crate) fn reflexive(item_id: Uuid, default_unit: &str) -> Self {
        Self::new(item_id, default_unit.to_string(), default_unit.to_string(), 1.0)
    }

    pub fn is_reflexive(&self) -> bool {
        self.from_unit == self.to_unit
    }

    /// Converts a quantity expressed in `from_unit` into the default unit.
    pub fn normalize(&self, quantity: f64) -> f64 {
        quantity * self.multiplier
    }
}

/// How a caller names the unit of a quantity: by conversion id or by unit
/// name (e.g. `"roll"`). Both are resolved against the owning item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum UnitRef {
    Id(Uuid),
    Name(String),
}

impl From<Uuid> for UnitRef {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for UnitRef {
    fn from(value: &str) -> Self {
        Self::Name(value.trim().to_string())
    }
}

impl From<String> for UnitRef {
    fn from(value: String) -> Self {
        Self::Name(value.trim().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "unit_conversions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    pub from_unit: String,
    pub to_unit: String,
    pub multiplier: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Items,
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&UnitConversion> for ActiveModel {
    fn from(conversion: &UnitConversion) -> Self {
        Self {
            id: ActiveValue::Set(conversion.id.to_string()),
            item_id: ActiveValue::Set(conversion.item_id.to_string()),
            from_unit: ActiveValue::Set(conversion.from_unit.clone()),
            to_unit: ActiveValue::Set(conversion.to_unit.clone()),
            multiplier: ActiveValue::Set(conversion.multiplier),
        }
    }
}

impl TryFrom<Model> for UnitConversion {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "unit conversion")?,
            item_id: parse_uuid(&model.item_id, "item")?,
            from_unit: model.from_unit,
            to_unit: model.to_unit,
            multiplier: model.multiplier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_multiplier() {
        let roll = UnitConversion::new(Uuid::new_v4(), "roll".into(), "meter".into(), 40.0);
        assert_eq!(roll.normalize(5.0), 200.0);
        assert!(!roll.is_reflexive());

        let meter = UnitConversion::reflexive(roll.item_id, "meter");
        assert_eq!(meter.normalize(12.5), 12.5);
        assert!(meter.is_reflexive());
    }

    #[test]
    fn unit_ref_from_name_trims() {
        assert_eq!(UnitRef::from(" roll "), UnitRef::Name("roll".to_string()));
    }
}
