use crate::{LedgerEntry, MoneyCents, ResultEngine, TransferReceipt, TransferRequest};

use super::Engine;

impl Engine {
    /// Post a transfer. See [`TransferLedger::post_transfer`](crate::TransferLedger::post_transfer).
    pub async fn post_transfer(&self, request: TransferRequest) -> ResultEngine<TransferReceipt> {
        self.ledger.post_transfer(request).await
    }

    pub async fn transfer(&self, transfer_id: &str) -> ResultEngine<TransferReceipt> {
        self.ledger.transfer(transfer_id).await
    }

    pub async fn account_entries(&self, account_id: &str) -> ResultEngine<Vec<LedgerEntry>> {
        self.ledger.account_entries(account_id).await
    }

    pub async fn account_balance(&self, account_id: &str) -> ResultEngine<MoneyCents> {
        self.ledger.account_balance(account_id).await
    }
}
