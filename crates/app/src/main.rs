use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{AddStockCmd, AdjustmentDirection, CashAdjustmentCmd, Engine, Money, NewItemCmd};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(about = "Maintenance commands for the workshop stock and cash ledger")]
struct Cli {
    /// Settings file, without extension (also read from `ATELIER_SETTINGS`).
    #[arg(long, env = "ATELIER_SETTINGS", default_value = "settings")]
    settings: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current cash balance.
    Balance,
    /// Correct the cash balance by hand.
    AdjustCash(AdjustCashArgs),
    Item(ItemArgs),
    Stock(StockArgs),
    /// Recompute stock and cash from the ledgers; exits with 1 on drift.
    Verify,
}

#[derive(Args, Debug)]
struct AdjustCashArgs {
    #[arg(long, conflicts_with = "decrease", required_unless_present = "decrease")]
    increase: bool,
    #[arg(long)]
    decrease: bool,
    /// Amount in rupiah, e.g. `150000` or `Rp150.000`.
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    note: Option<String>,
    #[arg(long, env = "ATELIER_ACTOR")]
    actor: String,
}

#[derive(Args, Debug)]
struct ItemArgs {
    #[command(subcommand)]
    command: ItemCommand,
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    Create(ItemCreateArgs),
}

#[derive(Args, Debug)]
struct ItemCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    default_unit: String,
    /// Extra unit as `unit=multiplier`, e.g. `roll=40`.
    #[arg(long = "conversion", value_parser = parse_pair)]
    conversions: Vec<(String, f64)>,
    /// Variant as `name=initial_stock`, e.g. `Putih=80`.
    #[arg(long = "variant", value_parser = parse_pair)]
    variants: Vec<(String, f64)>,
    #[arg(long, env = "ATELIER_ACTOR")]
    actor: String,
}

#[derive(Args, Debug)]
struct StockArgs {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    Add(StockAddArgs),
}

#[derive(Args, Debug)]
struct StockAddArgs {
    #[arg(long)]
    variant: Uuid,
    /// Unit name from the item's conversion table.
    #[arg(long)]
    unit: String,
    #[arg(long)]
    quantity: f64,
    #[arg(long)]
    note: Option<String>,
    #[arg(long, env = "ATELIER_ACTOR")]
    actor: String,
}

fn parse_pair(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid number in {raw}: {err}"))?;
    Ok((key.trim().to_string(), value))
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.settings)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "atelier={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    tracing::debug!(database = ?settings.database, "opening ledger database");
    let db = parse_database(&settings.database).await?;
    let engine = Engine::builder()
        .database(db)
        .opening_balance(settings.ledger.opening_balance)
        .build()
        .await?;

    match cli.command {
        Command::Balance => {
            let balance = engine.cash_balance().await?;
            println!("cash balance: {}", balance.balance);
        }
        Command::AdjustCash(args) => {
            let direction = if args.increase {
                AdjustmentDirection::Increase
            } else {
                AdjustmentDirection::Decrease
            };
            let mut cmd = CashAdjustmentCmd::new(direction, args.amount, args.actor);
            if let Some(note) = args.note {
                cmd = cmd.note(note);
            }
            let log = engine.adjust_cash(cmd).await?;
            println!(
                "adjusted {}: {} -> {}",
                log.signed_amount(),
                log.previous_balance,
                log.next_balance
            );
        }
        Command::Item(ItemArgs {
            command: ItemCommand::Create(args),
        }) => {
            let mut cmd = NewItemCmd::new(args.name, args.default_unit, args.actor);
            for (unit, multiplier) in args.conversions {
                cmd = cmd.conversion(unit, multiplier);
            }
            for (name, stock) in args.variants {
                cmd = cmd.variant(name, stock);
            }
            let detail = engine.create_item(cmd).await?;
            println!("created item: {} ({})", detail.item.name, detail.item.id);
            for variant in &detail.variants {
                println!(
                    "  variant {} ({}): {} {}",
                    variant.name, variant.id, variant.current_stock, variant.unit
                );
            }
        }
        Command::Stock(StockArgs {
            command: StockCommand::Add(args),
        }) => {
            let mut cmd = AddStockCmd::new(args.variant, args.unit, args.quantity, args.actor);
            if let Some(note) = args.note {
                cmd = cmd.note(note);
            }
            let arrival = engine.add_stock(cmd).await?;
            println!(
                "{}: +{} -> {} {}",
                arrival.variant.name,
                arrival.mutation.normalized_quantity,
                arrival.variant.current_stock,
                arrival.variant.unit
            );
        }
        Command::Verify => {
            let report = engine.verify_projections().await?;
            for drift in &report.stock_drifts {
                println!(
                    "variant {}: stored {} but ledger says {}",
                    drift.variant_id, drift.stored, drift.ledger
                );
            }
            println!(
                "cash: stored {} / ledger {}",
                report.stored_balance, report.ledger_balance
            );
            if !report.is_consistent() {
                std::process::exit(1);
            }
            println!("{} variants checked, all consistent", report.variants_checked);
        }
    }

    Ok(())
}
