//! Stock ledger rows.
//!
//! A [`StockMutation`] is an append-only record of a change to a variant's
//! stock. The unit and multiplier used at write time are snapshotted on the
//! row, so reversing it later never depends on the current conversion table.
//!
//! `normalized_quantity` is always expressed in the item's default unit:
//! - `In` / `Out`: a positive magnitude
//! - `Adjustment`: signed (negative means the stock went down)

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMutationKind {
    In,
    Out,
    Adjustment,
}

impl StockMutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Adjustment => "ADJUSTMENT",
        }
    }
}

impl TryFrom<&str> for StockMutationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            other => Err(EngineError::Internal(format!(
                "invalid stock mutation kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockMutation {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub kind: StockMutationKind,
    /// Quantity as entered, in `unit`.
    pub quantity: f64,
    pub unit: String,
    pub multiplier: f64,
    pub normalized_quantity: f64,
    pub source: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl StockMutation {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        variant_id: Uuid,
        kind: StockMutationKind,
        quantity: f64,
        unit: String,
        multiplier: f64,
        source: Option<String>,
        note: Option<String>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant_id,
            kind,
            quantity,
            unit,
            multiplier,
            normalized_quantity: quantity * multiplier,
            source,
            note,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// The effect of this row on `Variant::current_stock`.
    pub fn stock_delta(&self) -> f64 {
        match self.kind {
            StockMutationKind::In => self.normalized_quantity,
            StockMutationKind::Out => -self.normalized_quantity,
            StockMutationKind::Adjustment => self.normalized_quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_mutations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub variant_id: String,
    pub kind: String,
    pub quantity: f64,
    pub unit: String,
    pub multiplier: f64,
    pub normalized_quantity: f64,
    pub source: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::variants::Entity",
        from = "Column::VariantId",
        to = "super::variants::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Variants,
}

impl Related<super::variants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&StockMutation> for ActiveModel {
    fn from(mutation: &StockMutation) -> Self {
        Self {
            id: ActiveValue::Set(mutation.id.to_string()),
            variant_id: ActiveValue::Set(mutation.variant_id.to_string()),
            kind: ActiveValue::Set(mutation.kind.as_str().to_string()),
            quantity: ActiveValue::Set(mutation.quantity),
            unit: ActiveValue::Set(mutation.unit.clone()),
            multiplier: ActiveValue::Set(mutation.multiplier),
            normalized_quantity: ActiveValue::Set(mutation.normalized_quantity),
            source: ActiveValue::Set(mutation.source.clone()),
            note: ActiveValue::Set(mutation.note.clone()),
            created_by: ActiveValue::Set(mutation.created_by.clone()),
            created_at: ActiveValue::Set(mutation.created_at),
        }
    }
}

impl TryFrom<Model> for StockMutation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "stock mutation")?,
            variant_id: parse_uuid(&model.variant_id, "variant")?,
            kind: StockMutationKind::try_from(model.kind.as_str())?,
            quantity: model.quantity,
            unit: model.unit,
            multiplier: model.multiplier,
            normalized_quantity: model.normalized_quantity,
            source: model.source,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutation(kind: StockMutationKind, quantity: f64, multiplier: f64) -> StockMutation {
        StockMutation::new(
            Uuid::new_v4(),
            kind,
            quantity,
            "roll".to_string(),
            multiplier,
            None,
            None,
            "tester".to_string(),
        )
    }

    #[test]
    fn delta_sign_follows_kind() {
        assert_eq!(mutation(StockMutationKind::In, 5.0, 40.0).stock_delta(), 200.0);
        assert_eq!(mutation(StockMutationKind::Out, 2.0, 40.0).stock_delta(), -80.0);
        assert_eq!(
            mutation(StockMutationKind::Adjustment, -30.0, 1.0).stock_delta(),
            -30.0
        );
    }

    #[test]
    fn kind_round_trips_through_storage_text() {
        for kind in [
            StockMutationKind::In,
            StockMutationKind::Out,
            StockMutationKind::Adjustment,
        ] {
            assert_eq!(StockMutationKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(StockMutationKind::try_from("in").is_err());
    }
}
