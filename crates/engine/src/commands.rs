//! Command structs for engine operations.
//!
//! These types group parameters for write operations (items, stock, cash,
//! expense/income/loan), keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AdjustmentDirection, Money, StockMutationKind, TransactionKind, UnitRef};

/// Extra unit accepted when creating an item.
#[derive(Clone, Debug, PartialEq)]
pub struct NewConversion {
    pub from_unit: String,
    pub multiplier: f64,
}

/// Variant created together with its item.
#[derive(Clone, Debug, PartialEq)]
pub struct NewVariant {
    pub name: String,
    /// In the item's default unit.
    pub initial_stock: f64,
}

/// Create a catalog item.
#[derive(Clone, Debug)]
pub struct NewItemCmd {
    pub name: String,
    pub default_unit: String,
    pub conversions: Vec<NewConversion>,
    pub variants: Vec<NewVariant>,
    pub user_id: String,
}

impl NewItemCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        default_unit: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default_unit: default_unit.into(),
            conversions: Vec::new(),
            variants: Vec::new(),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn conversion(mut self, from_unit: impl Into<String>, multiplier: f64) -> Self {
        self.conversions.push(NewConversion {
            from_unit: from_unit.into(),
            multiplier,
        });
        self
    }

    #[must_use]
    pub fn variant(mut self, name: impl Into<String>, initial_stock: f64) -> Self {
        self.variants.push(NewVariant {
            name: name.into(),
            initial_stock,
        });
        self
    }
}

/// A transaction line that does not touch stock.
#[derive(Clone, Debug, PartialEq)]
pub struct PlainLine {
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub total_price: Money,
}

impl PlainLine {
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: f64, total_price: impl Into<Money>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: None,
            supplier: None,
            total_price: total_price.into(),
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }
}

/// A purchase line for a catalog variant.
///
/// With `append_to_stock` (the default) the purchased quantity is also booked
/// as an `IN` stock mutation linked to the line.
#[derive(Clone, Debug, PartialEq)]
pub struct StockedLine {
    pub item_id: Uuid,
    pub variant_id: Uuid,
    pub unit: UnitRef,
    pub quantity: f64,
    pub supplier: Option<String>,
    pub total_price: Money,
    pub append_to_stock: bool,
}

impl StockedLine {
    #[must_use]
    pub fn new(
        item_id: Uuid,
        variant_id: Uuid,
        unit: impl Into<UnitRef>,
        quantity: f64,
        total_price: impl Into<Money>,
    ) -> Self {
        Self {
            item_id,
            variant_id,
            unit: unit.into(),
            quantity,
            supplier: None,
            total_price: total_price.into(),
            append_to_stock: true,
        }
    }

    #[must_use]
    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    #[must_use]
    pub fn append_to_stock(mut self, append: bool) -> Self {
        self.append_to_stock = append;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpenseLine {
    Plain(PlainLine),
    Stocked(StockedLine),
}

impl ExpenseLine {
    pub fn total_price(&self) -> Money {
        match self {
            Self::Plain(line) => line.total_price,
            Self::Stocked(line) => line.total_price,
        }
    }
}

impl From<PlainLine> for ExpenseLine {
    fn from(line: PlainLine) -> Self {
        Self::Plain(line)
    }
}

impl From<StockedLine> for ExpenseLine {
    fn from(line: StockedLine) -> Self {
        Self::Stocked(line)
    }
}

/// Create (or replace the lines of) an expense transaction.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub lines: Vec<ExpenseLine>,
    pub source: Option<String>,
    pub note: Option<String>,
    pub user_id: String,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            source: None,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: impl Into<ExpenseLine>) -> Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create (or replace the lines of) an income transaction.
#[derive(Clone, Debug)]
pub struct IncomeCmd {
    pub lines: Vec<PlainLine>,
    pub source: Option<String>,
    pub note: Option<String>,
    pub user_id: String,
}

impl IncomeCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            source: None,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: PlainLine) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Marks a stock arrival as a purchase that must also be paid from cash.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseOrder {
    pub supplier: Option<String>,
    pub total_price: Money,
}

impl PurchaseOrder {
    #[must_use]
    pub fn new(total_price: impl Into<Money>) -> Self {
        Self {
            supplier: None,
            total_price: total_price.into(),
        }
    }

    #[must_use]
    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }
}

/// Book stock into a variant.
#[derive(Clone, Debug)]
pub struct AddStockCmd {
    pub variant_id: Uuid,
    pub unit: UnitRef,
    pub quantity: f64,
    pub note: Option<String>,
    pub order: Option<PurchaseOrder>,
    pub user_id: String,
}

impl AddStockCmd {
    #[must_use]
    pub fn new(
        variant_id: Uuid,
        unit: impl Into<UnitRef>,
        quantity: f64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            variant_id,
            unit: unit.into(),
            quantity,
            note: None,
            order: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: PurchaseOrder) -> Self {
        self.order = Some(order);
        self
    }
}

/// Take stock out of a variant.
#[derive(Clone, Debug)]
pub struct RemoveStockCmd {
    pub variant_id: Uuid,
    pub unit: UnitRef,
    pub quantity: f64,
    pub note: Option<String>,
    pub user_id: String,
}

impl RemoveStockCmd {
    #[must_use]
    pub fn new(
        variant_id: Uuid,
        unit: impl Into<UnitRef>,
        quantity: f64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            variant_id,
            unit: unit.into(),
            quantity,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Manual stock ledger entry.
#[derive(Clone, Debug)]
pub struct RecordMutationCmd {
    pub variant_id: Uuid,
    pub kind: StockMutationKind,
    /// Positive for `In`/`Out`, signed and non-zero for `Adjustment`.
    pub quantity: f64,
    /// Defaults to the item's default unit.
    pub unit: Option<UnitRef>,
    pub source: Option<String>,
    pub note: Option<String>,
    pub user_id: String,
}

impl RecordMutationCmd {
    #[must_use]
    pub fn new(
        variant_id: Uuid,
        kind: StockMutationKind,
        quantity: f64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            variant_id,
            kind,
            quantity,
            unit: None,
            source: None,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<UnitRef>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Edit a variant's name and/or its stock value.
#[derive(Clone, Debug)]
pub struct UpdateVariantCmd {
    pub variant_id: Uuid,
    pub name: Option<String>,
    /// New stock in the default unit; the difference is booked as an adjustment.
    pub current_stock: Option<f64>,
    pub user_id: String,
}

impl UpdateVariantCmd {
    #[must_use]
    pub fn new(variant_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            variant_id,
            name: None,
            current_stock: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn current_stock(mut self, stock: f64) -> Self {
        self.current_stock = Some(stock);
        self
    }
}

/// Manual cash correction. No transaction is recorded for it.
#[derive(Clone, Debug)]
pub struct CashAdjustmentCmd {
    pub direction: AdjustmentDirection,
    pub amount: Money,
    pub note: Option<String>,
    pub user_id: String,
}

impl CashAdjustmentCmd {
    #[must_use]
    pub fn new(
        direction: AdjustmentDirection,
        amount: impl Into<Money>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            amount: amount.into(),
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create or update a loan to an employee.
#[derive(Clone, Debug)]
pub struct EmployeeLoanCmd {
    pub employee_id: Uuid,
    pub amount: Money,
    pub note: Option<String>,
    pub user_id: String,
}

impl EmployeeLoanCmd {
    #[must_use]
    pub fn new(employee_id: Uuid, amount: impl Into<Money>, user_id: impl Into<String>) -> Self {
        Self {
            employee_id,
            amount: amount.into(),
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Filters for listing transactions. Both date bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionListFilter {
    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }
}
