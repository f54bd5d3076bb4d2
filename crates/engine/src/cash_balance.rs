//! The cash balance projection.
//!
//! There is exactly one row, keyed by [`CASH_BALANCE_ID`]. It is created on
//! first use with the engine's configured opening balance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

pub const CASH_BALANCE_ID: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    pub balance: Money,
    /// Balance before any audit log was written.
    pub opening_balance: Money,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cash_balance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub balance: i64,
    pub opening_balance: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn opening(opening_balance: Money) -> Self {
        Self {
            id: ActiveValue::Set(CASH_BALANCE_ID),
            balance: ActiveValue::Set(opening_balance.rupiah()),
            opening_balance: ActiveValue::Set(opening_balance.rupiah()),
            updated_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl From<Model> for CashBalance {
    fn from(model: Model) -> Self {
        Self {
            balance: Money::new(model.balance),
            opening_balance: Money::new(model.opening_balance),
            updated_at: model.updated_at,
        }
    }
}
