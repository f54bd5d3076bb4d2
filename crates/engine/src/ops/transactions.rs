//! Transaction orchestration.
//!
//! Expenses, incomes and employee loans are written together with their
//! lines, the stock mutations of stocked lines and exactly one cash audit log.
//! Deleting or updating a transaction unwinds all of them first. Lines go
//! before their stock mutations are reversed, since they reference them.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{
    EmployeeLoanCmd, EngineError, ExpenseCmd, ExpenseLine, IncomeCmd, LineLink, Money, PlainLine,
    ResultEngine, StockMutation, StockMutationKind, StockedLine, Transaction, TransactionItem,
    TransactionKind, TransactionListFilter, transaction_items, transactions,
    util::{
        ensure_positive_amount, ensure_positive_quantity, normalize_optional_text,
        normalize_required, require_actor,
    },
};

use super::{
    Engine,
    employees::load_employee,
    stock::{append_mutation, load_variant, reverse_mutation},
    units::{load_item, resolve_conversion},
    with_tx,
};

fn ensure_lines<T>(lines: &[T]) -> ResultEngine<()> {
    if lines.is_empty() {
        return Err(EngineError::Validation(
            "at least one line is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_plain_line(line: &PlainLine) -> ResultEngine<()> {
    normalize_required(&line.name, "line name")?;
    ensure_positive_quantity(line.quantity, "quantity")?;
    ensure_positive_amount(line.total_price, "total price")
}

fn validate_expense(cmd: &ExpenseCmd) -> ResultEngine<String> {
    let actor = require_actor(&cmd.user_id)?;
    ensure_lines(&cmd.lines)?;
    for line in &cmd.lines {
        match line {
            ExpenseLine::Plain(plain) => {
                normalize_required(&plain.name, "line name")?;
                ensure_positive_quantity(plain.quantity, "quantity")?;
            }
            ExpenseLine::Stocked(stocked) => ensure_positive_quantity(stocked.quantity, "quantity")?,
        }
        ensure_positive_amount(line.total_price(), "total price")?;
    }
    Ok(actor)
}

fn validate_income(cmd: &IncomeCmd) -> ResultEngine<String> {
    let actor = require_actor(&cmd.user_id)?;
    ensure_lines(&cmd.lines)?;
    for line in &cmd.lines {
        validate_plain_line(line)?;
    }
    Ok(actor)
}

fn plain_item(transaction_id: Uuid, position: i32, line: &PlainLine) -> TransactionItem {
    TransactionItem {
        id: Uuid::new_v4(),
        transaction_id,
        position,
        name: line.name.trim().to_string(),
        quantity: line.quantity,
        unit: normalize_optional_text(line.unit.as_deref()),
        supplier: normalize_optional_text(line.supplier.as_deref()),
        total_price: line.total_price,
        link: LineLink::None,
    }
}

/// Resolves a stocked line and, when it appends to stock, books its `IN`
/// mutation. Returns the line linked to that mutation.
async fn stocked_item(
    db_tx: &DatabaseTransaction,
    transaction_id: Uuid,
    position: i32,
    line: &StockedLine,
    created_by: &str,
) -> ResultEngine<TransactionItem> {
    let item = load_item(db_tx, line.item_id).await?;
    let variant = load_variant(db_tx, line.variant_id).await?;
    if variant.item_id != item.id {
        return Err(EngineError::NotFound("variant".to_string()));
    }
    let conversion = resolve_conversion(db_tx, item.id, &line.unit).await?;
    let supplier = normalize_optional_text(line.supplier.as_deref());

    let link = if line.append_to_stock {
        let mutation = StockMutation::new(
            variant.id,
            StockMutationKind::In,
            line.quantity,
            conversion.from_unit.clone(),
            conversion.multiplier,
            supplier.clone(),
            Some("automatic stock-in".to_string()),
            created_by.to_string(),
        );
        append_mutation(db_tx, &mutation).await?;
        LineLink::Stock {
            mutation_id: mutation.id,
        }
    } else {
        LineLink::None
    };

    Ok(TransactionItem {
        id: Uuid::new_v4(),
        transaction_id,
        position,
        name: format!("{} - {}", item.name, variant.name),
        quantity: line.quantity,
        unit: Some(conversion.from_unit),
        supplier,
        total_price: line.total_price,
        link,
    })
}

/// Builds expense lines in caller order, booking stock for stocked lines.
async fn expense_items(
    db_tx: &DatabaseTransaction,
    transaction_id: Uuid,
    lines: &[ExpenseLine],
    created_by: &str,
) -> ResultEngine<Vec<TransactionItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for (position, line) in (0i32..).zip(lines) {
        let item = match line {
            ExpenseLine::Plain(line) => plain_item(transaction_id, position, line),
            ExpenseLine::Stocked(line) => {
                stocked_item(db_tx, transaction_id, position, line, created_by).await?
            }
        };
        items.push(item);
    }
    Ok(items)
}

fn income_items(transaction_id: Uuid, lines: &[PlainLine]) -> Vec<TransactionItem> {
    (0i32..)
        .zip(lines)
        .map(|(position, line)| plain_item(transaction_id, position, line))
        .collect()
}

async fn loan_item(
    db_tx: &DatabaseTransaction,
    transaction_id: Uuid,
    cmd: &EmployeeLoanCmd,
) -> ResultEngine<(String, TransactionItem)> {
    let employee = load_employee(db_tx, cmd.employee_id).await?;
    let item = TransactionItem {
        id: Uuid::new_v4(),
        transaction_id,
        position: 0,
        name: format!("Loan {}", employee.name),
        quantity: 1.0,
        unit: None,
        supplier: None,
        total_price: cmd.amount,
        link: LineLink::Employee {
            employee_id: employee.id,
        },
    };
    Ok((employee.name, item))
}

fn total_of(items: &[TransactionItem]) -> ResultEngine<Money> {
    items.iter().try_fold(Money::ZERO, |acc, item| {
        acc.checked_add(item.total_price)
            .ok_or_else(|| EngineError::Validation("total amount overflows".to_string()))
    })
}

async fn write_lines(db_tx: &DatabaseTransaction, items: &[TransactionItem]) -> ResultEngine<()> {
    for item in items {
        transaction_items::ActiveModel::from(item)
            .insert(db_tx)
            .await?;
    }
    Ok(())
}

async fn load_lines(
    db_tx: &impl ConnectionTrait,
    transaction_id: Uuid,
) -> ResultEngine<Vec<TransactionItem>> {
    transaction_items::Entity::find()
        .filter(transaction_items::Column::TransactionId.eq(transaction_id.to_string()))
        .order_by_asc(transaction_items::Column::Position)
        .all(db_tx)
        .await?
        .into_iter()
        .map(TransactionItem::try_from)
        .collect()
}

async fn load_transaction(
    db: &impl ConnectionTrait,
    transaction_id: Uuid,
) -> ResultEngine<Transaction> {
    let model = transactions::Entity::find_by_id(transaction_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
    let mut tx = Transaction::try_from(model)?;
    tx.items = load_lines(db, tx.id).await?;
    Ok(tx)
}

impl Engine {
    /// Inserts a new transaction with its lines and books its cash movement.
    pub(super) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        mut tx: Transaction,
    ) -> ResultEngine<Transaction> {
        tx.total_amount = total_of(&tx.items)?;
        transactions::ActiveModel::from(&tx).insert(db_tx).await?;
        write_lines(db_tx, &tx.items).await?;
        let actor = tx.created_by.clone();
        self.book_cash(db_tx, &mut tx, &actor).await?;
        Ok(tx)
    }

    /// Writes the cash log for `tx` and links it back to the transaction row.
    async fn book_cash(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &mut Transaction,
        created_by: &str,
    ) -> ResultEngine<()> {
        let log = self
            .apply_cash_delta(
                db_tx,
                tx.kind.cash_entry(),
                tx.total_amount,
                tx.note.clone(),
                created_by,
                Some(tx.id),
            )
            .await?;
        tx.audit_log_id = Some(log.id);

        let active = transactions::ActiveModel {
            id: ActiveValue::Set(tx.id.to_string()),
            audit_log_id: ActiveValue::Set(Some(log.id.to_string())),
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(())
    }

    /// Removes every effect of a transaction except its own row.
    async fn unwind_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        expected: TransactionKind,
    ) -> ResultEngine<Transaction> {
        let tx = load_transaction(db_tx, transaction_id).await?;
        if tx.kind != expected {
            return Err(EngineError::BadRequest(format!(
                "transaction is {}, not {}",
                tx.kind.as_str(),
                expected.as_str()
            )));
        }
        let log_id = tx
            .audit_log_id
            .ok_or_else(|| EngineError::NotFound("cash audit log".to_string()))?;
        self.reverse_cash_log(db_tx, log_id).await?;

        transaction_items::Entity::delete_many()
            .filter(transaction_items::Column::TransactionId.eq(tx.id.to_string()))
            .exec(db_tx)
            .await?;
        for mutation_id in tx.items.iter().filter_map(|item| item.link.mutation_id()) {
            reverse_mutation(db_tx, mutation_id).await?;
        }
        Ok(tx)
    }

    /// Replaces the lines of an unwound transaction and books it again under
    /// the same id.
    async fn rewrite_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        mut tx: Transaction,
        items: Vec<TransactionItem>,
        source: Option<String>,
        note: Option<String>,
        actor: &str,
    ) -> ResultEngine<Transaction> {
        tx.items = items;
        tx.total_amount = total_of(&tx.items)?;
        tx.source = source;
        tx.note = note;
        tx.updated_at = Utc::now();

        let active = transactions::ActiveModel {
            id: ActiveValue::Set(tx.id.to_string()),
            total_amount: ActiveValue::Set(tx.total_amount.rupiah()),
            source: ActiveValue::Set(tx.source.clone()),
            note: ActiveValue::Set(tx.note.clone()),
            audit_log_id: ActiveValue::Set(None),
            updated_at: ActiveValue::Set(tx.updated_at),
            ..Default::default()
        };
        active.update(db_tx).await?;
        write_lines(db_tx, &tx.items).await?;
        self.book_cash(db_tx, &mut tx, actor).await?;
        Ok(tx)
    }

    async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        expected: TransactionKind,
    ) -> ResultEngine<()> {
        require_actor(user_id)?;

        let tx = with_tx!(self, |db_tx| {
            let tx = self
                .unwind_transaction(&db_tx, transaction_id, expected)
                .await?;
            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(tx)
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            kind = tx.kind.as_str(),
            amount = %tx.total_amount,
            "transaction deleted"
        );
        Ok(())
    }

    /// Records an expense. Stocked lines with `append_to_stock` also book an
    /// `IN` mutation; the whole expense is paid from cash in one log.
    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Transaction> {
        let actor = validate_expense(&cmd)?;
        let source = normalize_optional_text(cmd.source.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let mut tx = Transaction::new(TransactionKind::Expense, source, note, actor.clone());
            tx.items = expense_items(&db_tx, tx.id, &cmd.lines, &actor).await?;
            self.insert_transaction(&db_tx, tx).await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            lines = tx.items.len(),
            amount = %tx.total_amount,
            "expense created"
        );
        Ok(tx)
    }

    /// Replaces an expense's lines. The old cash log and stock mutations are
    /// reversed and everything is derived again from `cmd`.
    pub async fn update_expense(
        &self,
        transaction_id: Uuid,
        cmd: ExpenseCmd,
    ) -> ResultEngine<Transaction> {
        let actor = validate_expense(&cmd)?;
        let source = normalize_optional_text(cmd.source.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let tx = self
                .unwind_transaction(&db_tx, transaction_id, TransactionKind::Expense)
                .await?;
            let items = expense_items(&db_tx, tx.id, &cmd.lines, &actor).await?;
            self.rewrite_transaction(&db_tx, tx, items, source, note, &actor)
                .await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            lines = tx.items.len(),
            amount = %tx.total_amount,
            "expense updated"
        );
        Ok(tx)
    }

    pub async fn delete_expense(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<()> {
        self.delete_transaction(transaction_id, user_id, TransactionKind::Expense)
            .await
    }

    /// Records an income. Income lines never touch stock.
    pub async fn create_income(&self, cmd: IncomeCmd) -> ResultEngine<Transaction> {
        let actor = validate_income(&cmd)?;
        let source = normalize_optional_text(cmd.source.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let mut tx = Transaction::new(TransactionKind::Income, source, note, actor);
            tx.items = income_items(tx.id, &cmd.lines);
            self.insert_transaction(&db_tx, tx).await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            lines = tx.items.len(),
            amount = %tx.total_amount,
            "income created"
        );
        Ok(tx)
    }

    pub async fn update_income(
        &self,
        transaction_id: Uuid,
        cmd: IncomeCmd,
    ) -> ResultEngine<Transaction> {
        let actor = validate_income(&cmd)?;
        let source = normalize_optional_text(cmd.source.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let tx = self
                .unwind_transaction(&db_tx, transaction_id, TransactionKind::Income)
                .await?;
            let items = income_items(tx.id, &cmd.lines);
            self.rewrite_transaction(&db_tx, tx, items, source, note, &actor)
                .await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            amount = %tx.total_amount,
            "income updated"
        );
        Ok(tx)
    }

    pub async fn delete_income(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<()> {
        self.delete_transaction(transaction_id, user_id, TransactionKind::Income)
            .await
    }

    /// Lends cash to an employee. The transaction carries a single line
    /// tagged with the employee.
    pub async fn create_employee_loan(&self, cmd: EmployeeLoanCmd) -> ResultEngine<Transaction> {
        let actor = require_actor(&cmd.user_id)?;
        ensure_positive_amount(cmd.amount, "amount")?;
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let mut tx = Transaction::new(TransactionKind::EmployeeLoan, None, note, actor);
            let (employee_name, item) = loan_item(&db_tx, tx.id, &cmd).await?;
            tx.source = Some(employee_name);
            tx.items = vec![item];
            self.insert_transaction(&db_tx, tx).await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            employee_id = %cmd.employee_id,
            amount = %tx.total_amount,
            "employee loan created"
        );
        Ok(tx)
    }

    /// Changes a loan. The old log is undone and a new one written, so the
    /// transaction always has exactly one `EMPLOYEE_LOAN` log.
    pub async fn update_employee_loan(
        &self,
        transaction_id: Uuid,
        cmd: EmployeeLoanCmd,
    ) -> ResultEngine<Transaction> {
        let actor = require_actor(&cmd.user_id)?;
        ensure_positive_amount(cmd.amount, "amount")?;
        let note = normalize_optional_text(cmd.note.as_deref());

        let tx = with_tx!(self, |db_tx| {
            let tx = self
                .unwind_transaction(&db_tx, transaction_id, TransactionKind::EmployeeLoan)
                .await?;
            let (employee_name, item) = loan_item(&db_tx, tx.id, &cmd).await?;
            self.rewrite_transaction(&db_tx, tx, vec![item], Some(employee_name), note, &actor)
                .await
        })?;

        tracing::info!(
            transaction_id = %tx.id,
            amount = %tx.total_amount,
            "employee loan updated"
        );
        Ok(tx)
    }

    pub async fn delete_employee_loan(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.delete_transaction(transaction_id, user_id, TransactionKind::EmployeeLoan)
            .await
    }

    /// A transaction with its lines in caller order.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        load_transaction(&self.database, transaction_id).await
    }

    /// Transactions matching `filter`, oldest first, each with its lines.
    pub async fn transactions(
        &self,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find();
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lte(to));
        }
        let models = query
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = models.iter().map(|model| model.id.clone()).collect();
        let mut lines: HashMap<Uuid, Vec<TransactionItem>> = HashMap::new();
        for model in transaction_items::Entity::find()
            .filter(transaction_items::Column::TransactionId.is_in(ids))
            .order_by_asc(transaction_items::Column::Position)
            .all(&self.database)
            .await?
        {
            let item = TransactionItem::try_from(model)?;
            lines.entry(item.transaction_id).or_default().push(item);
        }

        models
            .into_iter()
            .map(|model| {
                let mut tx = Transaction::try_from(model)?;
                tx.items = lines.remove(&tx.id).unwrap_or_default();
                Ok(tx)
            })
            .collect()
    }
}
