//! Cash ledger and the balance projection.
//!
//! The balance row is only ever shifted by a server-side `balance + delta`
//! expression; the value read back afterwards is what the audit log
//! snapshots.

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    CashAdjustmentCmd, CashAuditLog, CashBalance, CashEntry, EngineError, Money, ResultEngine,
    cash_audit_logs,
    cash_balance::{self, CASH_BALANCE_ID},
    util::{ensure_positive_amount, normalize_optional_text, require_actor},
};

use super::{Engine, with_tx};

async fn shift_cash_balance(db_tx: &DatabaseTransaction, delta: Money) -> ResultEngine<Money> {
    cash_balance::Entity::update_many()
        .col_expr(
            cash_balance::Column::Balance,
            Expr::col(cash_balance::Column::Balance).add(delta.rupiah()),
        )
        .col_expr(cash_balance::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cash_balance::Column::Id.eq(CASH_BALANCE_ID))
        .exec(db_tx)
        .await?;
    let row = cash_balance::Entity::find_by_id(CASH_BALANCE_ID)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::Internal("cash balance row missing".to_string()))?;
    Ok(Money::new(row.balance))
}

impl Engine {
    /// Returns the balance row, creating it with the opening balance on first use.
    /// A concurrent first insert is absorbed by `ON CONFLICT DO NOTHING`.
    async fn ensure_cash_balance(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<cash_balance::Model> {
        if let Some(row) = cash_balance::Entity::find_by_id(CASH_BALANCE_ID)
            .one(db_tx)
            .await?
        {
            return Ok(row);
        }

        let inserted = cash_balance::Entity::insert(cash_balance::ActiveModel::opening(
            self.opening_balance,
        ))
        .on_conflict(
            OnConflict::column(cash_balance::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db_tx)
        .await?;
        if inserted > 0 {
            tracing::info!(opening_balance = %self.opening_balance, "cash balance initialised");
        }
        cash_balance::Entity::find_by_id(CASH_BALANCE_ID)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::Internal("cash balance row missing".to_string()))
    }

    /// Applies a cash movement and records it in the audit log.
    pub(super) async fn apply_cash_delta(
        &self,
        db_tx: &DatabaseTransaction,
        entry: CashEntry,
        amount: Money,
        note: Option<String>,
        created_by: &str,
        transaction_id: Option<Uuid>,
    ) -> ResultEngine<CashAuditLog> {
        self.ensure_cash_balance(db_tx).await?;
        let delta = entry.signed(amount);
        let next_balance = shift_cash_balance(db_tx, delta).await?;
        let log = CashAuditLog::new(
            entry,
            amount,
            next_balance - delta,
            note,
            created_by.to_string(),
            transaction_id,
        );
        cash_audit_logs::ActiveModel::from(&log)
            .insert(db_tx)
            .await?;
        tracing::debug!(
            log_id = %log.id,
            kind = log.kind.as_str(),
            amount = %log.amount,
            previous = %log.previous_balance,
            next = %log.next_balance,
            "cash log appended"
        );
        Ok(log)
    }

    /// Undoes a log's effect on top of the current balance and deletes it.
    pub(super) async fn reverse_cash_log(
        &self,
        db_tx: &DatabaseTransaction,
        log_id: Uuid,
    ) -> ResultEngine<CashAuditLog> {
        let model = cash_audit_logs::Entity::find_by_id(log_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("cash audit log".to_string()))?;
        let log = CashAuditLog::try_from(model)?;

        self.ensure_cash_balance(db_tx).await?;
        let balance = shift_cash_balance(db_tx, -log.signed_amount()).await?;
        cash_audit_logs::Entity::delete_by_id(log.id.to_string())
            .exec(db_tx)
            .await?;
        tracing::debug!(
            log_id = %log.id,
            kind = log.kind.as_str(),
            amount = %log.amount,
            balance = %balance,
            "cash log reversed"
        );
        Ok(log)
    }

    /// Manual cash correction. Writes an `ADJUSTMENT` log and no transaction.
    pub async fn adjust_cash(&self, cmd: CashAdjustmentCmd) -> ResultEngine<CashAuditLog> {
        let actor = require_actor(&cmd.user_id)?;
        ensure_positive_amount(cmd.amount, "amount")?;
        let note = normalize_optional_text(cmd.note.as_deref());

        let log = with_tx!(self, |db_tx| {
            self.apply_cash_delta(
                &db_tx,
                CashEntry::Adjustment(cmd.direction),
                cmd.amount,
                note,
                &actor,
                None,
            )
            .await
        })?;
        tracing::info!(
            log_id = %log.id,
            amount = %log.signed_amount(),
            balance = %log.next_balance,
            "cash adjusted"
        );
        Ok(log)
    }

    /// Current cash balance. Does not write: before the first cash movement
    /// this reports the configured opening balance.
    pub async fn cash_balance(&self) -> ResultEngine<CashBalance> {
        let row = cash_balance::Entity::find_by_id(CASH_BALANCE_ID)
            .one(&self.database)
            .await?;
        Ok(match row {
            Some(row) => CashBalance::from(row),
            None => CashBalance {
                balance: self.opening_balance,
                opening_balance: self.opening_balance,
                updated_at: Utc::now(),
            },
        })
    }

    /// All cash audit logs, oldest first.
    pub async fn cash_audit_logs(&self) -> ResultEngine<Vec<CashAuditLog>> {
        cash_audit_logs::Entity::find()
            .order_by_asc(cash_audit_logs::Column::CreatedAt)
            .order_by_asc(cash_audit_logs::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(CashAuditLog::try_from)
            .collect()
    }
}
