use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    CashAuditLog, Money, ResultEngine, StockMutation, cash_audit_logs,
    cash_balance::{self, CASH_BALANCE_ID},
    stock_mutations, variants,
    util::parse_uuid,
};

use super::{Engine, with_tx};

const STOCK_TOLERANCE: f64 = 1e-9;

/// A variant whose stored stock disagrees with its ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockDrift {
    pub variant_id: Uuid,
    pub stored: f64,
    pub ledger: f64,
}

/// Outcome of [`Engine::verify_projections`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub variants_checked: usize,
    pub stock_drifts: Vec<StockDrift>,
    pub stored_balance: Money,
    /// Opening balance plus every signed audit log amount.
    pub ledger_balance: Money,
}

impl ProjectionReport {
    pub fn is_consistent(&self) -> bool {
        self.stock_drifts.is_empty() && self.stored_balance == self.ledger_balance
    }
}

impl Engine {
    /// Recomputes both projections from their ledgers and reports any
    /// difference. Nothing is written.
    pub async fn verify_projections(&self) -> ResultEngine<ProjectionReport> {
        let report = with_tx!(self, |db_tx| {
            let mut ledger_stock: HashMap<Uuid, f64> = HashMap::new();
            for model in stock_mutations::Entity::find().all(&db_tx).await? {
                let mutation = StockMutation::try_from(model)?;
                *ledger_stock.entry(mutation.variant_id).or_default() += mutation.stock_delta();
            }

            let variant_models = variants::Entity::find().all(&db_tx).await?;
            let variants_checked = variant_models.len();
            let mut stock_drifts = Vec::new();
            for model in variant_models {
                let variant_id = parse_uuid(&model.id, "variant")?;
                let ledger = ledger_stock.get(&variant_id).copied().unwrap_or_default();
                if (model.current_stock - ledger).abs() > STOCK_TOLERANCE {
                    stock_drifts.push(StockDrift {
                        variant_id,
                        stored: model.current_stock,
                        ledger,
                    });
                }
            }

            let (stored_balance, opening_balance) =
                match cash_balance::Entity::find_by_id(CASH_BALANCE_ID)
                    .one(&db_tx)
                    .await?
                {
                    Some(row) => (Money::new(row.balance), Money::new(row.opening_balance)),
                    None => (self.opening_balance, self.opening_balance),
                };
            let mut ledger_balance = opening_balance;
            for model in cash_audit_logs::Entity::find().all(&db_tx).await? {
                ledger_balance = ledger_balance + CashAuditLog::try_from(model)?.signed_amount();
            }

            Ok(ProjectionReport {
                variants_checked,
                stock_drifts,
                stored_balance,
                ledger_balance,
            })
        })?;

        for drift in &report.stock_drifts {
            tracing::warn!(
                variant_id = %drift.variant_id,
                stored = drift.stored,
                ledger = drift.ledger,
                "variant stock drifted from its ledger"
            );
        }
        if report.stored_balance != report.ledger_balance {
            tracing::warn!(
                stored = %report.stored_balance,
                ledger = %report.ledger_balance,
                "cash balance drifted from its ledger"
            );
        }
        tracing::info!(
            variants = report.variants_checked,
            consistent = report.is_consistent(),
            "projections verified"
        );
        Ok(report)
    }
}
