//! Transaction lines.
//!
//! A line is either plain, tied to a stock mutation (a purchase that also
//! moved physical stock), or tied to an employee (a loan). [`LineLink`] makes
//! that branch explicit; storage keeps it as two nullable columns.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "link", rename_all = "snake_case")]
pub enum LineLink {
    None,
    Stock { mutation_id: Uuid },
    Employee { employee_id: Uuid },
}

impl LineLink {
    pub fn mutation_id(self) -> Option<Uuid> {
        match self {
            Self::Stock { mutation_id } => Some(mutation_id),
            _ => None,
        }
    }

    pub fn employee_id(self) -> Option<Uuid> {
        match self {
            Self::Employee { employee_id } => Some(employee_id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: Uuid,
    pub transaction_id: Uuid,
    /// Zero-based order in which the caller supplied the line.
    pub position: i32,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub total_price: Money,
    pub link: LineLink,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_id: String,
    pub position: i32,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub total_price: i64,
    pub mutation_id: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransactionItem> for ActiveModel {
    fn from(item: &TransactionItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            transaction_id: ActiveValue::Set(item.transaction_id.to_string()),
            position: ActiveValue::Set(item.position),
            name: ActiveValue::Set(item.name.clone()),
            quantity: ActiveValue::Set(item.quantity),
            unit: ActiveValue::Set(item.unit.clone()),
            supplier: ActiveValue::Set(item.supplier.clone()),
            total_price: ActiveValue::Set(item.total_price.rupiah()),
            mutation_id: ActiveValue::Set(item.link.mutation_id().map(|id| id.to_string())),
            employee_id: ActiveValue::Set(item.link.employee_id().map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for TransactionItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let mutation_id = parse_optional_uuid(model.mutation_id.as_deref(), "stock mutation")?;
        let employee_id = parse_optional_uuid(model.employee_id.as_deref(), "employee")?;
        let link = match (mutation_id, employee_id) {
            (None, None) => LineLink::None,
            (Some(mutation_id), None) => LineLink::Stock { mutation_id },
            (None, Some(employee_id)) => LineLink::Employee { employee_id },
            (Some(_), Some(_)) => {
                return Err(EngineError::Internal(
                    "transaction line linked to both stock and employee".to_string(),
                ));
            }
        };

        Ok(Self {
            id: parse_uuid(&model.id, "transaction line")?,
            transaction_id: parse_uuid(&model.transaction_id, "transaction")?,
            position: model.position,
            name: model.name,
            quantity: model.quantity,
            unit: model.unit,
            supplier: model.supplier,
            total_price: Money::new(model.total_price),
            link,
        })
    }
}
