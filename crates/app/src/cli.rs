use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use engine::{MoneyCents, TransferRequest};

#[derive(Debug, Parser)]
#[command(name = "ledgerctl", version, about = "Budget alerts and account transfers")]
pub struct Args {
    /// Optional settings file path (TOML, extension may be omitted).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move money between two accounts.
    Transfer(TransferArgs),
    /// Show a committed transfer.
    Show { transfer_id: String },
    /// Net balance of an account across all transfers.
    Balance { account_id: String },
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// Evaluate the budgets active on a day against the given spending.
    Alerts {
        /// Day to evaluate (defaults to today, UTC).
        #[arg(long)]
        on: Option<NaiveDate>,
        /// Spending as `category=amount`, repeatable.
        #[arg(long = "spent", value_parser = parse_spent)]
        spent: Vec<(String, MoneyCents)>,
        /// List alerts in force without recording them.
        #[arg(long)]
        peek: bool,
    },
}

#[derive(Debug, clap::Args)]
pub struct TransferArgs {
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub to: String,
    /// Decimal amount, e.g. `50` or `12,30`.
    #[arg(long)]
    pub amount: MoneyCents,
    /// Idempotency key. A random one is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub memo: Option<String>,
    #[arg(long)]
    pub from_name: Option<String>,
    #[arg(long)]
    pub to_name: Option<String>,
}

impl TransferArgs {
    pub fn into_request(self, at: DateTime<Utc>) -> TransferRequest {
        let id = self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut request = TransferRequest::new(id, self.from, self.to, self.amount, at);
        if let Some(memo) = self.memo {
            request = request.memo(memo);
        }
        if let Some(name) = self.from_name {
            request = request.source_name(name);
        }
        if let Some(name) = self.to_name {
            request = request.destination_name(name);
        }
        request
    }
}

#[derive(Debug, Subcommand)]
pub enum BudgetCommand {
    /// Create or replace the budget of a category.
    Set {
        category_id: String,
        limit: MoneyCents,
        #[arg(long, default_value_t = engine::DEFAULT_WARN_RATIO)]
        warn: f64,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    List,
    Remove { category_id: String },
}

fn parse_spent(value: &str) -> Result<(String, MoneyCents), String> {
    let (category, amount) = value
        .split_once('=')
        .ok_or_else(|| format!("expected category=amount, got \"{value}\""))?;
    let category = category.trim();
    if category.is_empty() {
        return Err("category must not be empty".to_string());
    }
    let amount = amount.parse::<MoneyCents>().map_err(|err| err.to_string())?;
    Ok((category.to_string(), amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_spent_splits_category_and_amount() {
        assert_eq!(
            parse_spent("groceries=85,50").unwrap(),
            ("groceries".to_string(), MoneyCents::new(85_50))
        );
        assert!(parse_spent("groceries").is_err());
        assert!(parse_spent("=10").is_err());
        assert!(parse_spent("food=abc").is_err());
    }

    #[test]
    fn parses_transfer_command() {
        let args = Args::try_parse_from([
            "ledgerctl", "transfer", "--from", "A", "--to", "B", "--amount", "50", "--id", "t1",
        ])
        .unwrap();
        match args.command {
            Command::Transfer(TransferArgs {
                from, to, amount, id, ..
            }) => {
                assert_eq!((from.as_str(), to.as_str()), ("A", "B"));
                assert_eq!(amount, MoneyCents::new(50_00));
                assert_eq!(id.as_deref(), Some("t1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn transfer_args_build_the_request() {
        let args = Args::try_parse_from([
            "ledgerctl",
            "transfer",
            "--from",
            "A",
            "--to",
            "B",
            "--amount",
            "12,30",
            "--id",
            "t1",
            "--memo",
            "rent",
            "--to-name",
            "Savings",
        ])
        .unwrap();
        let Command::Transfer(transfer) = args.command else {
            panic!("expected transfer");
        };
        let at = Utc::now();
        let request = transfer.into_request(at);

        let expected = TransferRequest::new("t1", "A", "B", MoneyCents::new(12_30), at)
            .memo("rent")
            .destination_name("Savings");
        assert_eq!(request, expected);
        assert_eq!(request.source_account_name, None);
    }

    #[test]
    fn transfer_without_id_gets_a_generated_one() {
        let args = Args::try_parse_from([
            "ledgerctl", "transfer", "--from", "A", "--to", "B", "--amount", "1",
        ])
        .unwrap();
        let Command::Transfer(transfer) = args.command else {
            panic!("expected transfer");
        };
        let request = transfer.into_request(Utc::now());
        assert!(uuid::Uuid::parse_str(&request.transfer_id).is_ok());
        assert_eq!(request.memo, None);
    }

    #[test]
    fn parses_alerts_command() {
        let args = Args::try_parse_from([
            "ledgerctl",
            "alerts",
            "--on",
            "2024-01-20",
            "--spent",
            "groceries=85",
            "--spent",
            "rent=900",
            "--peek",
        ])
        .unwrap();
        let Command::Alerts { on, spent, peek } = args.command else {
            panic!("expected alerts");
        };
        assert_eq!(on, NaiveDate::from_ymd_opt(2024, 1, 20));
        assert_eq!(spent.len(), 2);
        assert!(peek);
    }
}
