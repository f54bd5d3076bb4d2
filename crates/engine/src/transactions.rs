//! Transaction primitives.
//!
//! A `Transaction` is a business event (expense, income, employee loan). It
//! owns its ordered `TransactionItem` lines and links to the cash audit log it
//! produced.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CashEntry, EngineError, Money, TransactionItem,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
    EmployeeLoan,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::EmployeeLoan => "EMPLOYEE_LOAN",
        }
    }

    /// The cash movement a transaction of this kind books.
    pub fn cash_entry(self) -> CashEntry {
        match self {
            Self::Income => CashEntry::Income,
            Self::Expense => CashEntry::Expense,
            Self::EmployeeLoan => CashEntry::EmployeeLoan,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            "EMPLOYEE_LOAN" => Ok(Self::EmployeeLoan),
            other => Err(EngineError::Internal(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    /// Always the sum of the lines' `total_price`.
    pub total_amount: Money,
    pub source: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub audit_log_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<TransactionItem>,
}

impl Transaction {
    pub(crate) fn new(
        kind: TransactionKind,
        source: Option<String>,
        note: Option<String>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            total_amount: Money::ZERO,
            source,
            note,
            created_by,
            audit_log_id: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub total_amount: i64,
    pub source: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub audit_log_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_items::Entity")]
    TransactionItems,
}

impl Related<super::transaction_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            total_amount: ActiveValue::Set(tx.total_amount.rupiah()),
            source: ActiveValue::Set(tx.source.clone()),
            note: ActiveValue::Set(tx.note.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            audit_log_id: ActiveValue::Set(tx.audit_log_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            total_amount: Money::new(model.total_amount),
            source: model.source,
            note: model.note,
            created_by: model.created_by,
            audit_log_id: parse_optional_uuid(model.audit_log_id.as_deref(), "cash audit log")?,
            created_at: model.created_at,
            updated_at: model.updated_at,
            items: Vec::new(),
        })
    }
}
