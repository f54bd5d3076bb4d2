//! Stock and cash ledger engine for the workshop.
//!
//! Every business operation runs in one database transaction and keeps the
//! two projections (`Variant::current_stock` and the cash balance) in step
//! with their append-only ledgers (stock mutations and cash audit logs).

pub use cash_audit_logs::{AdjustmentDirection, CashAuditLog, CashEntry, CashEntryKind};
pub use cash_balance::CashBalance;
pub use commands::{
    AddStockCmd, CashAdjustmentCmd, EmployeeLoanCmd, ExpenseCmd, ExpenseLine, IncomeCmd,
    NewConversion, NewItemCmd, NewVariant, PlainLine, PurchaseOrder, RecordMutationCmd,
    RemoveStockCmd, StockedLine, TransactionListFilter, UpdateVariantCmd,
};
pub use employees::Employee;
pub use error::{EngineError, ErrorKind};
pub use items::{Item, ItemDetail};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, ProjectionReport, StockArrival, StockDrift};
pub use stock_mutations::{StockMutation, StockMutationKind};
pub use transaction_items::{LineLink, TransactionItem};
pub use transactions::{Transaction, TransactionKind};
pub use unit_conversions::{UnitConversion, UnitRef};
pub use variants::Variant;

mod cash_audit_logs;
mod cash_balance;
mod commands;
mod employees;
mod error;
mod items;
mod money;
mod ops;
mod stock_mutations;
mod transaction_items;
mod transactions;
mod unit_conversions;
mod util;
mod variants;

type ResultEngine<T> = Result<T, EngineError>;
