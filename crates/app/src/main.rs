use chrono::Utc;
use clap::Parser;
use engine::{BudgetThreshold, Engine, SpendingSnapshot, TracingSink};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;

use cli::{Args, BudgetCommand, Command};

mod cli;
mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let settings = settings::Settings::new(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledgerctl={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect(&settings.database).await?;
    let engine = Engine::builder().database(db).build().await?;

    run(&engine, args.command).await
}

async fn connect(config: &settings::Database) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!("database ready");
    Ok(database)
}

async fn run(engine: &Engine, command: Command) -> Result<(), BoxError> {
    match command {
        Command::Transfer(transfer) => {
            let request = transfer.into_request(Utc::now());
            let receipt = engine.post_transfer(request).await.inspect_err(|err| {
                if err.is_retryable() {
                    tracing::error!("transfer not stored, safe to retry: {err}");
                }
            })?;
            print_json(&receipt)
        }
        Command::Show { transfer_id } => print_json(&engine.transfer(&transfer_id).await?),
        Command::Balance { account_id } => {
            let balance = engine.account_balance(&account_id).await?;
            println!("{account_id}: {balance}");
            Ok(())
        }
        Command::Budget(BudgetCommand::Set {
            category_id,
            limit,
            warn,
            start,
            end,
        }) => {
            let threshold = BudgetThreshold::new(category_id, limit, start, end).warn_ratio(warn);
            engine.upsert_budget(&threshold).await?;
            print_json(&threshold)
        }
        Command::Budget(BudgetCommand::List) => print_json(&engine.all_budgets().await?),
        Command::Budget(BudgetCommand::Remove { category_id }) => {
            engine.remove_budget(&category_id).await?;
            Ok(())
        }
        Command::Alerts { on, spent, peek } => {
            let on = on.unwrap_or_else(|| Utc::now().date_naive());
            let thresholds = engine.budget_thresholds(on).await?;
            let spending: SpendingSnapshot = spent.into_iter().collect();
            let report = if peek {
                engine.peek_budget_alerts(&thresholds, &spending)
            } else {
                engine
                    .alerts()
                    .evaluate_and_notify(&thresholds, &spending, &TracingSink)
            };
            for err in &report.rejected {
                eprintln!("skipped: {err}");
            }
            print_json(&report.alerts)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
