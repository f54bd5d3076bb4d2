//! Cash ledger rows.
//!
//! A [`CashAuditLog`] stores an unsigned `amount` together with the balance
//! before and after it was applied. The sign of the change is implied by the
//! kind (and, for adjustments, by the two balance snapshots).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashEntryKind {
    Income,
    Expense,
    EmployeeLoan,
    Adjustment,
}

impl CashEntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::EmployeeLoan => "EMPLOYEE_LOAN",
            Self::Adjustment => "ADJUSTMENT",
        }
    }
}

impl TryFrom<&str> for CashEntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            "EMPLOYEE_LOAN" => Ok(Self::EmployeeLoan),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            other => Err(EngineError::Internal(format!(
                "invalid cash entry kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
}

/// A cash movement to apply, carrying everything needed to sign its amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "direction", rename_all = "snake_case")]
pub enum CashEntry {
    Income,
    Expense,
    EmployeeLoan,
    Adjustment(AdjustmentDirection),
}

impl CashEntry {
    pub fn kind(self) -> CashEntryKind {
        match self {
            Self::Income => CashEntryKind::Income,
            Self::Expense => CashEntryKind::Expense,
            Self::EmployeeLoan => CashEntryKind::EmployeeLoan,
            Self::Adjustment(_) => CashEntryKind::Adjustment,
        }
    }

    /// Balance delta for an unsigned `amount`.
    pub fn signed(self, amount: Money) -> Money {
        match self {
            Self::Income | Self::Adjustment(AdjustmentDirection::Increase) => amount,
            Self::Expense
            | Self::EmployeeLoan
            | Self::Adjustment(AdjustmentDirection::Decrease) => -amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAuditLog {
    pub id: Uuid,
    pub kind: CashEntryKind,
    pub amount: Money,
    pub previous_balance: Money,
    pub next_balance: Money,
    pub note: Option<String>,
    pub created_by: String,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CashAuditLog {
    pub(crate) fn new(
        entry: CashEntry,
        amount: Money,
        previous_balance: Money,
        note: Option<String>,
        created_by: String,
        transaction_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: entry.kind(),
            amount,
            previous_balance,
            next_balance: previous_balance + entry.signed(amount),
            note,
            created_by,
            transaction_id,
            created_at: Utc::now(),
        }
    }

    /// The delta this row applied to the balance.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            CashEntryKind::Income => self.amount,
            CashEntryKind::Expense | CashEntryKind::EmployeeLoan => -self.amount,
            CashEntryKind::Adjustment => {
                if self.next_balance < self.previous_balance {
                    -self.amount
                } else {
                    self.amount
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cash_audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub amount: i64,
    pub previous_balance: i64,
    pub next_balance: i64,
    pub note: Option<String>,
    pub created_by: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CashAuditLog> for ActiveModel {
    fn from(log: &CashAuditLog) -> Self {
        Self {
            id: ActiveValue::Set(log.id.to_string()),
            kind: ActiveValue::Set(log.kind.as_str().to_string()),
            amount: ActiveValue::Set(log.amount.rupiah()),
            previous_balance: ActiveValue::Set(log.previous_balance.rupiah()),
            next_balance: ActiveValue::Set(log.next_balance.rupiah()),
            note: ActiveValue::Set(log.note.clone()),
            created_by: ActiveValue::Set(log.created_by.clone()),
            transaction_id: ActiveValue::Set(log.transaction_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(log.created_at),
        }
    }
}

impl TryFrom<Model> for CashAuditLog {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "cash audit log")?,
            kind: CashEntryKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount),
            previous_balance: Money::new(model.previous_balance),
            next_balance: Money::new(model.next_balance),
            note: model.note,
            created_by: model.created_by,
            transaction_id: parse_optional_uuid(model.transaction_id.as_deref(), "transaction")?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(entry: CashEntry, amount: i64, previous: i64) -> CashAuditLog {
        CashAuditLog::new(
            entry,
            Money::new(amount),
            Money::new(previous),
            None,
            "tester".to_string(),
            None,
        )
    }

    #[test]
    fn next_balance_follows_sign_table() {
        assert_eq!(log(CashEntry::Income, 500, 1_000).next_balance, Money::new(1_500));
        assert_eq!(log(CashEntry::Expense, 150, 1_000).next_balance, Money::new(850));
        assert_eq!(
            log(CashEntry::EmployeeLoan, 2_000, 850).next_balance,
            Money::new(-1_150)
        );
        assert_eq!(
            log(
                CashEntry::Adjustment(AdjustmentDirection::Decrease),
                100,
                1_000
            )
            .next_balance,
            Money::new(900)
        );
    }

    #[test]
    fn signed_amount_recovers_adjustment_direction() {
        let up = log(CashEntry::Adjustment(AdjustmentDirection::Increase), 300, 0);
        let down = log(CashEntry::Adjustment(AdjustmentDirection::Decrease), 300, 0);
        assert_eq!(up.signed_amount(), Money::new(300));
        assert_eq!(down.signed_amount(), Money::new(-300));
        assert_eq!(log(CashEntry::Expense, 40, 0).signed_amount(), Money::new(-40));
    }
}
