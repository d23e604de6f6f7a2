use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{AlertHistory, BudgetAlertEngine, DbLedgerStore, ResultEngine, TransferLedger};

mod budgets;
mod transfers;

/// Database-backed facade over the alert engine and the transfer ledger.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    alerts: BudgetAlertEngine,
    ledger: TransferLedger<DbLedgerStore>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The alert engine, for callers that want to drive it directly.
    pub fn alerts(&self) -> &BudgetAlertEngine {
        &self.alerts
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    history: Option<Arc<AlertHistory>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Share an alert history with other engines. A fresh one is used
    /// otherwise.
    pub fn history(mut self, history: Arc<AlertHistory>) -> EngineBuilder {
        self.history = Some(history);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let alerts = match self.history {
            Some(history) => BudgetAlertEngine::with_history(history),
            None => BudgetAlertEngine::new(),
        };
        Ok(Engine {
            ledger: TransferLedger::new(DbLedgerStore::new(self.database.clone())),
            database: self.database,
            alerts,
        })
    }
}
