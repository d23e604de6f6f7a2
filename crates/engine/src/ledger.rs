//! Transfer posting.
//!
//! [`TransferLedger::post_transfer`] validates a [`TransferRequest`], builds
//! the two balanced entries and hands the whole receipt to a [`LedgerStore`]
//! in one commit. The caller-supplied transfer id makes posting idempotent:
//! replaying a committed request returns the original receipt and writes
//! nothing.

use crate::{
    CommitOutcome, EngineError, LedgerEntry, LedgerStore, MoneyCents, ResultEngine,
    TransferReceipt, TransferRequest,
};

#[derive(Debug)]
pub struct TransferLedger<S> {
    store: S,
}

impl<S: LedgerStore> TransferLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Post a transfer.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] if `amount <= 0`.
    /// - [`EngineError::SameAccount`] if source and destination coincide.
    /// - [`EngineError::InvalidId`] if an id is blank.
    /// - [`EngineError::DuplicateTransfer`] if `transfer_id` is already
    ///   committed for other accounts or another amount. A replay of the same
    ///   movement returns the stored receipt, even when stamped later.
    /// - [`EngineError::PersistenceFailure`] if the store fails. Retrying the
    ///   same request is safe.
    pub async fn post_transfer(&self, request: TransferRequest) -> ResultEngine<TransferReceipt> {
        let receipt = TransferReceipt::new(request.into_transfer()?);

        match self.store.commit(&receipt).await? {
            CommitOutcome::Committed(receipt) => {
                tracing::debug!(
                    transfer_id = %receipt.transfer.transfer_id,
                    source = %receipt.transfer.source_account_id,
                    destination = %receipt.transfer.destination_account_id,
                    amount = %receipt.transfer.amount,
                    "transfer committed"
                );
                Ok(receipt)
            }
            CommitOutcome::Existing(existing) if existing.matches(&receipt.transfer) => {
                tracing::debug!(
                    transfer_id = %existing.transfer.transfer_id,
                    "transfer replayed, returning the original receipt"
                );
                Ok(existing)
            }
            CommitOutcome::Existing(existing) => {
                tracing::warn!(
                    transfer_id = %existing.transfer.transfer_id,
                    "transfer id reused for a different transfer"
                );
                Err(EngineError::DuplicateTransfer(existing.transfer.transfer_id))
            }
        }
    }

    /// The committed transfer with the given id.
    pub async fn transfer(&self, transfer_id: &str) -> ResultEngine<TransferReceipt> {
        self.store
            .find(transfer_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(transfer_id.to_string()))
    }

    pub async fn account_entries(&self, account_id: &str) -> ResultEngine<Vec<LedgerEntry>> {
        self.store.entries_for_account(account_id).await
    }

    /// Net effect of every transfer on `account_id`.
    pub async fn account_balance(&self, account_id: &str) -> ResultEngine<MoneyCents> {
        let entries = self.store.entries_for_account(account_id).await?;
        entries
            .iter()
            .try_fold(MoneyCents::ZERO, |total, e| total.checked_add(e.delta))
            .ok_or_else(|| EngineError::InvalidAmount(format!("balance of {account_id} overflows")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::{TimeZone, Utc};
    use sea_orm::DbErr;

    use super::*;
    use crate::{EntrySide, MemoryLedgerStore};

    fn request(id: &str, source: &str, destination: &str, amount: i64) -> TransferRequest {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        TransferRequest::new(id, source, destination, MoneyCents::new(amount), at)
    }

    /// Fails the first `failures` commits, then delegates.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryLedgerStore,
        failures: AtomicUsize,
    }

    impl LedgerStore for FlakyStore {
        async fn commit(&self, receipt: &TransferReceipt) -> ResultEngine<CommitOutcome> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(DbErr::Custom("disk I/O error".to_string()).into());
            }
            self.inner.commit(receipt).await
        }

        async fn find(&self, transfer_id: &str) -> ResultEngine<Option<TransferReceipt>> {
            self.inner.find(transfer_id).await
        }

        async fn entries_for_account(&self, account_id: &str) -> ResultEngine<Vec<LedgerEntry>> {
            self.inner.entries_for_account(account_id).await
        }
    }

    #[tokio::test]
    async fn post_creates_balanced_entries() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());
        let receipt = ledger
            .post_transfer(request("t1", "A", "B", 50_00).memo("savings"))
            .await
            .unwrap();

        assert_eq!(receipt.transfer.transfer_id, "t1");
        assert_eq!(receipt.transfer.memo.as_deref(), Some("savings"));
        assert_eq!(
            receipt
                .entries
                .iter()
                .map(|e| (e.side, e.account_id.as_str(), e.delta.cents()))
                .collect::<Vec<_>>(),
            vec![(EntrySide::Debit, "A", -50_00), (EntrySide::Credit, "B", 50_00)]
        );
        assert!(receipt.net_delta().is_zero());
        assert!(receipt.entries.iter().all(|e| e.transfer_id == "t1"));
    }

    #[tokio::test]
    async fn replay_returns_original_receipt() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());
        let first = ledger
            .post_transfer(request("t1", "A", "B", 50_00))
            .await
            .unwrap();
        let second = ledger
            .post_transfer(request("t1", "A", "B", 50_00))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.store().len(), 1);
        assert_eq!(ledger.account_balance("A").await.unwrap().cents(), -50_00);
        assert_eq!(ledger.account_balance("B").await.unwrap().cents(), 50_00);
    }

    #[tokio::test]
    async fn retry_with_new_timestamp_and_memo_is_a_replay() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());
        let first = ledger
            .post_transfer(request("t1", "A", "B", 50_00).memo("rent"))
            .await
            .unwrap();

        let later = first.transfer.timestamp + chrono::Duration::seconds(30);
        let retry = TransferRequest::new("t1", "A", "B", MoneyCents::new(50_00), later)
            .memo("rent, again")
            .destination_name("Savings");
        let second = ledger.post_transfer(retry).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.store().len(), 1);
    }

    #[tokio::test]
    async fn reused_id_for_other_transfer_is_rejected() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());
        ledger
            .post_transfer(request("t1", "A", "B", 50_00))
            .await
            .unwrap();

        let err = ledger
            .post_transfer(request("t1", "A", "B", 70_00))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateTransfer("t1".to_string()));
        assert_eq!(ledger.account_balance("B").await.unwrap().cents(), 50_00);
    }

    #[tokio::test]
    async fn rejected_requests_write_nothing() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());

        let err = ledger
            .post_transfer(request("t1", "A", "B", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert!(!err.is_retryable());

        let err = ledger
            .post_transfer(request("t2", "A", "A", 10_00))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SameAccount("A".to_string()));

        assert!(ledger.store().is_empty());
        assert!(ledger.account_entries("A").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_and_retry_is_safe() {
        let ledger = TransferLedger::new(FlakyStore {
            failures: AtomicUsize::new(1),
            ..Default::default()
        });

        let err = ledger
            .post_transfer(request("t1", "A", "B", 10_00))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PersistenceFailure(_)));
        assert!(err.is_retryable());
        assert!(ledger.store().inner.is_empty());

        let receipt = ledger
            .post_transfer(request("t1", "A", "B", 10_00))
            .await
            .unwrap();
        let again = ledger
            .post_transfer(request("t1", "A", "B", 10_00))
            .await
            .unwrap();
        assert_eq!(receipt, again);
        assert_eq!(ledger.store().inner.len(), 1);
    }

    #[tokio::test]
    async fn unknown_transfer_is_not_found() {
        let ledger = TransferLedger::new(MemoryLedgerStore::new());
        assert_eq!(
            ledger.transfer("nope").await.unwrap_err(),
            EngineError::KeyNotFound("nope".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_commit_once() {
        let ledger = Arc::new(TransferLedger::new(MemoryLedgerStore::new()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            tasks.spawn(async move { ledger.post_transfer(request("t1", "A", "B", 5_00)).await });
        }

        let mut receipts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            receipts.push(joined.unwrap().unwrap());
        }
        assert_eq!(receipts.len(), 16);
        assert!(receipts.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(ledger.store().len(), 1);
        assert_eq!(ledger.account_entries("B").await.unwrap().len(), 1);
    }
}
