//! Budget alert evaluation and transfer posting.
//!
//! The crate has two independent halves:
//!
//! - [`BudgetAlertEngine`] decides which budget alerts fire for a spending
//!   snapshot, remembering what was already surfaced to avoid repeating
//!   itself.
//! - [`TransferLedger`] books transfers between accounts as two balanced
//!   [`LedgerEntry`] rows, idempotently on the caller's transfer id.
//!
//! [`Engine`] wires both to a SQLite database through sea-orm.

pub use alerts::{
    AlertEvent, AlertHistory, AlertReport, BudgetAlertEngine, CollectingSink, NotificationSink,
    Severity, TracingSink,
};
pub use budgets::{BudgetThreshold, DEFAULT_WARN_RATIO, Expense, SpendingSnapshot};
pub use error::EngineError;
pub use ledger::TransferLedger;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use store::{CommitOutcome, DbLedgerStore, LedgerStore, MemoryLedgerStore};
pub use transfers::{EntrySide, LedgerEntry, Transfer, TransferReceipt, TransferRequest};

mod alerts;
mod budgets;
mod error;
mod ledger;
mod money;
mod ops;
mod store;
mod transfers;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
