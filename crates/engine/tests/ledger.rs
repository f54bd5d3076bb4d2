use std::time::Duration;

use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use engine::{
    AdjustmentDirection, CashAdjustmentCmd, CashEntryKind, EmployeeLoanCmd, Engine, EngineError,
    ErrorKind, ExpenseCmd, IncomeCmd, ItemDetail, LineLink, NewItemCmd, PlainLine, StockedLine,
    TransactionKind, TransactionListFilter,
};
use migration::MigratorTrait;
use uuid::Uuid;

const ACTOR: &str = "admin";

async fn engine_with_db(opening_balance: i64) -> Engine {
    engine_and_db(opening_balance).await.0
}

async fn engine_and_db(opening_balance: i64) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .opening_balance(opening_balance)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn kain_katun(engine: &Engine) -> ItemDetail {
    engine
        .create_item(
            NewItemCmd::new("Kain Katun", "meter", ACTOR)
                .conversion("roll", 40.0)
                .variant("Putih", 0.0),
        )
        .await
        .unwrap()
}

async fn balance(engine: &Engine) -> i64 {
    engine.cash_balance().await.unwrap().balance.rupiah()
}

async fn assert_consistent(engine: &Engine) {
    let report = engine.verify_projections().await.unwrap();
    assert!(report.is_consistent(), "projection drift: {report:?}");
}

#[tokio::test]
async fn cash_balance_starts_at_opening_balance() {
    let engine = engine_with_db(1_000_000).await;
    let cash = engine.cash_balance().await.unwrap();
    assert_eq!(cash.balance.rupiah(), 1_000_000);
    assert_eq!(cash.opening_balance.rupiah(), 1_000_000);
    assert!(engine.cash_audit_logs().await.unwrap().is_empty());
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn expense_is_paid_with_one_audit_log() {
    let engine = engine_with_db(1_000_000).await;

    let tx = engine
        .create_expense(
            ExpenseCmd::new(ACTOR)
                .line(PlainLine::new("Benang", 10.0, 100_000).unit("gulung"))
                .line(PlainLine::new("Jarum", 1.0, 50_000))
                .note("belanja mingguan"),
        )
        .await
        .unwrap();

    assert_eq!(tx.kind, TransactionKind::Expense);
    assert_eq!(tx.total_amount.rupiah(), 150_000);
    assert_eq!(tx.items.len(), 2);
    assert_eq!(tx.items[0].unit.as_deref(), Some("gulung"));
    assert_eq!(balance(&engine).await, 850_000);

    let logs = engine.cash_audit_logs().await.unwrap();
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.kind, CashEntryKind::Expense);
    assert_eq!(log.amount.rupiah(), 150_000);
    assert_eq!(log.previous_balance.rupiah(), 1_000_000);
    assert_eq!(log.next_balance.rupiah(), 850_000);
    assert_eq!(log.transaction_id, Some(tx.id));
    assert_eq!(tx.audit_log_id, Some(log.id));

    let stored = engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.audit_log_id, Some(log.id));
    assert_eq!(stored.items[1].name, "Jarum");
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn deleting_an_expense_restores_cash() {
    let engine = engine_with_db(1_000_000).await;
    let tx = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 10.0, 150_000)))
        .await
        .unwrap();

    engine.delete_expense(tx.id, ACTOR).await.unwrap();

    assert_eq!(balance(&engine).await, 1_000_000);
    assert!(engine.cash_audit_logs().await.unwrap().is_empty());
    assert_eq!(
        engine.transaction(tx.id).await.unwrap_err(),
        EngineError::NotFound("transaction".to_string())
    );
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn stocked_expense_books_stock_and_unwinds_it() {
    let engine = engine_with_db(1_000_000).await;
    let detail = kain_katun(&engine).await;
    let putih = detail.variants[0].id;

    let tx = engine
        .create_expense(
            ExpenseCmd::new(ACTOR)
                .line(StockedLine::new(detail.item.id, putih, "roll", 2.0, 400_000).supplier("Toko Sinar"))
                .line(PlainLine::new("Ongkir", 1.0, 20_000)),
        )
        .await
        .unwrap();

    assert_eq!(tx.items[0].name, "Kain Katun - Putih");
    let mutation_id = tx.items[0].link.mutation_id().unwrap();
    let mutations = engine.stock_mutations(putih).await.unwrap();
    assert_eq!(mutations.len(), 1);
    assert_eq!(mutations[0].id, mutation_id);
    assert_eq!(mutations[0].note.as_deref(), Some("automatic stock-in"));
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 80.0);
    assert_eq!(balance(&engine).await, 580_000);

    engine.delete_expense(tx.id, ACTOR).await.unwrap();
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 0.0);
    assert!(engine.stock_mutations(putih).await.unwrap().is_empty());
    assert_eq!(balance(&engine).await, 1_000_000);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn stocked_line_without_append_leaves_stock_alone() {
    let engine = engine_with_db(1_000_000).await;
    let detail = kain_katun(&engine).await;
    let putih = detail.variants[0].id;

    let tx = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(
            StockedLine::new(detail.item.id, putih, "roll", 1.0, 200_000).append_to_stock(false),
        ))
        .await
        .unwrap();

    assert_eq!(tx.items[0].link, LineLink::None);
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 0.0);
    assert_eq!(balance(&engine).await, 800_000);
}

#[tokio::test]
async fn failed_expense_writes_nothing() {
    let engine = engine_with_db(1_000_000).await;
    let detail = kain_katun(&engine).await;
    let putih = detail.variants[0].id;

    let err = engine
        .create_expense(
            ExpenseCmd::new(ACTOR)
                .line(PlainLine::new("Benang", 1.0, 10_000))
                .line(StockedLine::new(detail.item.id, putih, "roll", 2.0, 400_000))
                .line(StockedLine::new(
                    detail.item.id,
                    Uuid::new_v4(),
                    "roll",
                    1.0,
                    200_000,
                )),
        )
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::NotFound("variant".to_string()));
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 0.0);
    assert!(engine.stock_mutations(putih).await.unwrap().is_empty());
    assert!(engine.cash_audit_logs().await.unwrap().is_empty());
    assert!(
        engine
            .transactions(&TransactionListFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(balance(&engine).await, 1_000_000);
}

#[tokio::test]
async fn invalid_lines_are_rejected_before_any_write() {
    let engine = engine_with_db(1_000_000).await;

    let err = engine.create_expense(ExpenseCmd::new(ACTOR)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 0.0, 10_000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .create_income(IncomeCmd::new(ACTOR).line(PlainLine::new("Jahit kemeja", 1.0, 0)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .create_expense(ExpenseCmd::new("   ").line(PlainLine::new("Benang", 1.0, 10_000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    assert!(engine.cash_audit_logs().await.unwrap().is_empty());
    assert_eq!(balance(&engine).await, 1_000_000);
}

#[tokio::test]
async fn updating_an_expense_replaces_lines_stock_and_cash() {
    let engine = engine_with_db(1_000_000).await;
    let detail = kain_katun(&engine).await;
    let putih = detail.variants[0].id;

    let created = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(StockedLine::new(
            detail.item.id,
            putih,
            "roll",
            2.0,
            400_000,
        )))
        .await
        .unwrap();
    assert_eq!(balance(&engine).await, 600_000);

    let updated = engine
        .update_expense(
            created.id,
            ExpenseCmd::new("kasir")
                .line(StockedLine::new(detail.item.id, putih, "roll", 1.0, 200_000))
                .line(PlainLine::new("Ongkir", 1.0, 15_000)),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_by, ACTOR);
    assert_eq!(updated.total_amount.rupiah(), 215_000);
    assert_eq!(updated.items.len(), 2);
    assert_ne!(updated.audit_log_id, created.audit_log_id);
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 40.0);
    assert_eq!(engine.stock_mutations(putih).await.unwrap().len(), 1);
    assert_eq!(balance(&engine).await, 785_000);

    let logs = engine.cash_audit_logs().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].created_by, "kasir");
    assert_eq!(logs[0].previous_balance.rupiah(), 1_000_000);
    assert_eq!(logs[0].next_balance.rupiah(), 785_000);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn income_create_update_delete() {
    let engine = engine_with_db(100_000).await;

    let tx = engine
        .create_income(
            IncomeCmd::new(ACTOR)
                .line(PlainLine::new("Jahit kemeja", 3.0, 90_000).unit("pcs"))
                .source("Bu Ani"),
        )
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Income);
    assert_eq!(tx.source.as_deref(), Some("Bu Ani"));
    assert_eq!(balance(&engine).await, 190_000);

    let tx = engine
        .update_income(
            tx.id,
            IncomeCmd::new(ACTOR).line(PlainLine::new("Jahit kemeja", 4.0, 120_000)),
        )
        .await
        .unwrap();
    assert_eq!(tx.total_amount.rupiah(), 120_000);
    assert_eq!(tx.source, None);
    assert_eq!(balance(&engine).await, 220_000);

    let logs = engine.cash_audit_logs().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].kind, CashEntryKind::Income);

    engine.delete_income(tx.id, ACTOR).await.unwrap();
    assert_eq!(balance(&engine).await, 100_000);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn deleting_through_the_wrong_kind_is_a_bad_request() {
    let engine = engine_with_db(1_000_000).await;
    let tx = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 1.0, 50_000)))
        .await
        .unwrap();

    let err = engine.delete_income(tx.id, ACTOR).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let err = engine.delete_employee_loan(tx.id, ACTOR).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    assert_eq!(balance(&engine).await, 950_000);
    assert_eq!(engine.transaction(tx.id).await.unwrap().items.len(), 1);

    let err = engine.delete_expense(Uuid::new_v4(), ACTOR).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("transaction".to_string()));
}

#[tokio::test]
async fn employee_loan_update_keeps_one_log() {
    let engine = engine_with_db(850_000).await;
    let budi = engine.create_employee("Budi", ACTOR).await.unwrap();

    let loan = engine
        .create_employee_loan(EmployeeLoanCmd::new(budi.id, 2_000_000, ACTOR))
        .await
        .unwrap();
    assert_eq!(loan.kind, TransactionKind::EmployeeLoan);
    assert_eq!(loan.source.as_deref(), Some("Budi"));
    assert_eq!(loan.items.len(), 1);
    assert_eq!(loan.items[0].name, "Loan Budi");
    assert_eq!(
        loan.items[0].link,
        LineLink::Employee {
            employee_id: budi.id
        }
    );
    assert_eq!(balance(&engine).await, -1_150_000);

    let loan = engine
        .update_employee_loan(loan.id, EmployeeLoanCmd::new(budi.id, 500_000, ACTOR))
        .await
        .unwrap();
    assert_eq!(loan.total_amount.rupiah(), 500_000);
    assert_eq!(balance(&engine).await, 350_000);

    let logs = engine.cash_audit_logs().await.unwrap();
    let loan_logs: Vec<_> = logs
        .iter()
        .filter(|log| log.kind == CashEntryKind::EmployeeLoan)
        .collect();
    assert_eq!(loan_logs.len(), 1);
    assert_eq!(loan_logs[0].amount.rupiah(), 500_000);
    assert_eq!(loan_logs[0].previous_balance.rupiah(), 850_000);
    assert_eq!(loan_logs[0].next_balance.rupiah(), 350_000);
    assert_eq!(loan.audit_log_id, Some(loan_logs[0].id));

    engine.delete_employee_loan(loan.id, ACTOR).await.unwrap();
    assert_eq!(balance(&engine).await, 850_000);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn loan_to_unknown_employee_is_not_found() {
    let engine = engine_with_db(500_000).await;
    let err = engine
        .create_employee_loan(EmployeeLoanCmd::new(Uuid::new_v4(), 100_000, ACTOR))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("employee".to_string()));
    assert_eq!(balance(&engine).await, 500_000);
}

#[tokio::test]
async fn manual_adjustments_are_signed_by_direction() {
    let engine = engine_with_db(100_000).await;

    let up = engine
        .adjust_cash(CashAdjustmentCmd::new(AdjustmentDirection::Increase, 25_000, ACTOR))
        .await
        .unwrap();
    assert_eq!(up.kind, CashEntryKind::Adjustment);
    assert_eq!(up.transaction_id, None);
    assert_eq!(up.signed_amount().rupiah(), 25_000);
    assert_eq!(up.next_balance.rupiah(), 125_000);

    let down = engine
        .adjust_cash(
            CashAdjustmentCmd::new(AdjustmentDirection::Decrease, 200_000, ACTOR)
                .note("selisih kas"),
        )
        .await
        .unwrap();
    assert_eq!(down.amount.rupiah(), 200_000);
    assert_eq!(down.signed_amount().rupiah(), -200_000);
    assert_eq!(down.next_balance.rupiah(), -75_000);
    assert_eq!(balance(&engine).await, -75_000);

    assert!(
        engine
            .transactions(&TransactionListFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn deleting_an_older_transaction_keeps_the_ledger_sum() {
    let engine = engine_with_db(1_000_000).await;
    let first = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 1.0, 100_000)))
        .await
        .unwrap();
    engine
        .create_income(IncomeCmd::new(ACTOR).line(PlainLine::new("Jahit", 1.0, 300_000)))
        .await
        .unwrap();
    engine
        .adjust_cash(CashAdjustmentCmd::new(AdjustmentDirection::Decrease, 5_000, ACTOR))
        .await
        .unwrap();

    engine.delete_expense(first.id, ACTOR).await.unwrap();
    assert_eq!(balance(&engine).await, 1_295_000);
    assert_eq!(engine.cash_audit_logs().await.unwrap().len(), 2);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn transactions_filter_by_kind() {
    let engine = engine_with_db(1_000_000).await;
    let budi = engine.create_employee("Budi", ACTOR).await.unwrap();
    engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 1.0, 10_000)))
        .await
        .unwrap();
    engine
        .create_income(IncomeCmd::new(ACTOR).line(PlainLine::new("Jahit", 1.0, 30_000)))
        .await
        .unwrap();
    engine
        .create_employee_loan(EmployeeLoanCmd::new(budi.id, 50_000, ACTOR))
        .await
        .unwrap();

    let all = engine
        .transactions(&TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|tx| tx.items.len() == 1));

    let incomes = engine
        .transactions(&TransactionListFilter::default().kind(TransactionKind::Income))
        .await
        .unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(incomes[0].total_amount.rupiah(), 30_000);
}

#[tokio::test]
async fn transaction_without_audit_log_cannot_be_deleted() {
    let (engine, db) = engine_and_db(1_000_000).await;
    let detail = kain_katun(&engine).await;
    let putih = detail.variants[0].id;
    let tx = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(StockedLine::new(
            detail.item.id,
            putih,
            "roll",
            2.0,
            400_000,
        )))
        .await
        .unwrap();

    db.execute_unprepared("UPDATE transactions SET audit_log_id = NULL")
        .await
        .unwrap();

    let err = engine.delete_expense(tx.id, ACTOR).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("cash audit log".to_string()));

    let stored = engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.audit_log_id, None);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(engine.variant(putih).await.unwrap().current_stock, 80.0);
    assert_eq!(engine.stock_mutations(putih).await.unwrap().len(), 1);
    assert_eq!(engine.cash_audit_logs().await.unwrap().len(), 1);
    assert_eq!(balance(&engine).await, 600_000);
}

#[tokio::test]
async fn transactions_filter_by_date_range() {
    let engine = engine_with_db(1_000_000).await;

    let start = Utc::now();
    std::thread::sleep(Duration::from_millis(5));
    let first = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(PlainLine::new("Benang", 1.0, 10_000)))
        .await
        .unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let middle = Utc::now();
    std::thread::sleep(Duration::from_millis(5));
    let second = engine
        .create_income(IncomeCmd::new(ACTOR).line(PlainLine::new("Jahit", 1.0, 30_000)))
        .await
        .unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let end = Utc::now();

    let all = engine
        .transactions(&TransactionListFilter::default().from(start).to(end))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let early = engine
        .transactions(&TransactionListFilter::default().to(middle))
        .await
        .unwrap();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].id, first.id);

    let late = engine
        .transactions(&TransactionListFilter::default().from(middle))
        .await
        .unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].id, second.id);

    let exact = engine
        .transactions(
            &TransactionListFilter::default()
                .from(second.created_at)
                .to(second.created_at),
        )
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].id, second.id);

    let none = engine
        .transactions(&TransactionListFilter::default().to(start))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn first_cash_movements_share_one_balance_row() {
    let engine = engine_with_db(100_000).await;

    let (up, down) = tokio::join!(
        engine.adjust_cash(CashAdjustmentCmd::new(AdjustmentDirection::Increase, 20_000, ACTOR)),
        engine.adjust_cash(CashAdjustmentCmd::new(AdjustmentDirection::Decrease, 5_000, ACTOR)),
    );
    up.unwrap();
    down.unwrap();

    let cash = engine.cash_balance().await.unwrap();
    assert_eq!(cash.balance.rupiah(), 115_000);
    assert_eq!(cash.opening_balance.rupiah(), 100_000);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn existing_balance_row_is_kept() {
    let (engine, db) = engine_and_db(100_000).await;
    db.execute_unprepared(
        "INSERT INTO cash_balance (id, balance, opening_balance, updated_at) \
         VALUES (1, 42000, 42000, '2026-10-01T00:00:00+00:00')",
    )
    .await
    .unwrap();

    let log = engine
        .adjust_cash(CashAdjustmentCmd::new(AdjustmentDirection::Increase, 8_000, ACTOR))
        .await
        .unwrap();
    assert_eq!(log.previous_balance.rupiah(), 42_000);
    assert_eq!(log.next_balance.rupiah(), 50_000);
    assert_eq!(engine.cash_balance().await.unwrap().opening_balance.rupiah(), 42_000);
}

#[tokio::test]
async fn stocked_line_price_must_be_positive() {
    let engine = engine_with_db(1_000_000).await;
    let detail = kain_katun(&engine).await;

    let err = engine
        .create_expense(ExpenseCmd::new(ACTOR).line(StockedLine::new(
            detail.item.id,
            detail.variants[0].id,
            "roll",
            1.0,
            0,
        )))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(engine.stock_mutations(detail.variants[0].id).await.unwrap().is_empty());
}
