//! Ledger stores.
//!
//! A [`LedgerStore`] durably keeps committed transfers and their entries. The
//! store owns the uniqueness of the transfer id: [`LedgerStore::commit`] is a
//! compare-and-set, it either writes the transfer together with both entries or
//! reports the transfer already stored under that id.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, LedgerEntry, ResultEngine, TransferReceipt,
    transfers::{entry_entity, transfer_entity},
};

/// Result of a commit attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The receipt was written.
    Committed(TransferReceipt),
    /// A transfer with the same id was already stored. Nothing was written.
    Existing(TransferReceipt),
}

pub trait LedgerStore: Send + Sync {
    /// Atomically store the transfer and both of its entries, unless the
    /// transfer id is taken.
    fn commit(
        &self,
        receipt: &TransferReceipt,
    ) -> impl Future<Output = ResultEngine<CommitOutcome>> + Send;

    fn find(
        &self,
        transfer_id: &str,
    ) -> impl Future<Output = ResultEngine<Option<TransferReceipt>>> + Send;

    /// Entries touching `account_id`, oldest first.
    fn entries_for_account(
        &self,
        account_id: &str,
    ) -> impl Future<Output = ResultEngine<Vec<LedgerEntry>>> + Send;
}

/// Process-local store, handy for tests and for callers that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<MemoryLedger>,
}

#[derive(Debug, Default)]
struct MemoryLedger {
    receipts: Vec<TransferReceipt>,
    by_id: HashMap<String, usize>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLedger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of committed transfers.
    pub fn len(&self) -> usize {
        self.lock().receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().receipts.is_empty()
    }
}

impl LedgerStore for MemoryLedgerStore {
    async fn commit(&self, receipt: &TransferReceipt) -> ResultEngine<CommitOutcome> {
        let mut ledger = self.lock();
        let id = &receipt.transfer.transfer_id;
        if let Some(&index) = ledger.by_id.get(id) {
            return Ok(CommitOutcome::Existing(ledger.receipts[index].clone()));
        }
        let index = ledger.receipts.len();
        ledger.receipts.push(receipt.clone());
        ledger.by_id.insert(id.clone(), index);
        Ok(CommitOutcome::Committed(receipt.clone()))
    }

    async fn find(&self, transfer_id: &str) -> ResultEngine<Option<TransferReceipt>> {
        let ledger = self.lock();
        Ok(ledger
            .by_id
            .get(transfer_id)
            .map(|&index| ledger.receipts[index].clone()))
    }

    async fn entries_for_account(&self, account_id: &str) -> ResultEngine<Vec<LedgerEntry>> {
        Ok(self
            .lock()
            .receipts
            .iter()
            .flat_map(|r| r.entries.iter())
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }
}

/// Store backed by the `transfers` and `ledger_entries` tables.
#[derive(Clone, Debug)]
pub struct DbLedgerStore {
    database: DatabaseConnection,
}

impl DbLedgerStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    async fn load_entries(&self, transfer_id: &str) -> ResultEngine<[LedgerEntry; 2]> {
        let entries = entry_entity::Entity::find()
            .filter(entry_entity::Column::TransferId.eq(transfer_id))
            .order_by_asc(entry_entity::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        entries.try_into().map_err(|found: Vec<LedgerEntry>| {
            EngineError::KeyNotFound(format!(
                "expected 2 ledger entries for transfer {transfer_id}, found {}",
                found.len()
            ))
        })
    }
}

impl LedgerStore for DbLedgerStore {
    async fn commit(&self, receipt: &TransferReceipt) -> ResultEngine<CommitOutcome> {
        let transfer_id = receipt.transfer.transfer_id.as_str();
        if let Some(existing) = self.find(transfer_id).await? {
            return Ok(CommitOutcome::Existing(existing));
        }

        let db_tx = self.database.begin().await?;
        if let Err(err) = transfer_entity::ActiveModel::from(&receipt.transfer)
            .insert(&db_tx)
            .await
        {
            if let Err(rollback_err) = db_tx.rollback().await {
                tracing::warn!(%transfer_id, "rollback after failed insert: {rollback_err}");
            }
            // Lost the race on the primary key against a concurrent commit.
            if let Some(existing) = self.find(transfer_id).await? {
                return Ok(CommitOutcome::Existing(existing));
            }
            return Err(err.into());
        }
        for entry in &receipt.entries {
            entry_entity::ActiveModel::from(entry).insert(&db_tx).await?;
        }
        db_tx.commit().await?;

        Ok(CommitOutcome::Committed(receipt.clone()))
    }

    async fn find(&self, transfer_id: &str) -> ResultEngine<Option<TransferReceipt>> {
        let Some(model) = transfer_entity::Entity::find_by_id(transfer_id.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        let entries = self.load_entries(transfer_id).await?;
        Ok(Some(TransferReceipt {
            transfer: model.into(),
            entries,
        }))
    }

    async fn entries_for_account(&self, account_id: &str) -> ResultEngine<Vec<LedgerEntry>> {
        entry_entity::Entity::find()
            .filter(entry_entity::Column::AccountId.eq(account_id))
            .order_by_asc(entry_entity::Column::OccurredAt)
            .order_by_asc(entry_entity::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }
}
