//! Transfer primitives.
//!
//! A [`Transfer`] moves an amount between two accounts. It is booked as
//! exactly two [`LedgerEntry`] rows, a debit on the source and a credit on the
//! destination, whose deltas always sum to zero.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine, util::normalize_optional_text};

/// Ask the ledger to move `amount` from `source_account_id` to
/// `destination_account_id`.
///
/// `transfer_id` is chosen by the caller and doubles as idempotency key:
/// posting the same request twice books it once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub transfer_id: String,
    pub source_account_id: String,
    pub source_account_name: Option<String>,
    pub destination_account_id: String,
    pub destination_account_name: Option<String>,
    pub amount: MoneyCents,
    pub timestamp: DateTime<Utc>,
    pub memo: Option<String>,
}

impl TransferRequest {
    #[must_use]
    pub fn new(
        transfer_id: impl Into<String>,
        source_account_id: impl Into<String>,
        destination_account_id: impl Into<String>,
        amount: MoneyCents,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            source_account_id: source_account_id.into(),
            source_account_name: None,
            destination_account_id: destination_account_id.into(),
            destination_account_name: None,
            amount,
            timestamp,
            memo: None,
        }
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    #[must_use]
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_account_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn destination_name(mut self, name: impl Into<String>) -> Self {
        self.destination_account_name = Some(name.into());
        self
    }

    /// Validate the request and turn it into the committed shape.
    pub(crate) fn into_transfer(self) -> ResultEngine<Transfer> {
        let transfer_id = required_id(&self.transfer_id, "transfer")?;
        let source_account_id = required_id(&self.source_account_id, "source account")?;
        let destination_account_id =
            required_id(&self.destination_account_id, "destination account")?;

        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "amount must be > 0, got {}",
                self.amount
            )));
        }
        if self.amount.checked_neg().is_none() {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        if source_account_id == destination_account_id {
            return Err(EngineError::SameAccount(source_account_id));
        }

        Ok(Transfer {
            transfer_id,
            source_account_id,
            source_account_name: normalize_optional_text(self.source_account_name.as_deref()),
            destination_account_id,
            destination_account_name: normalize_optional_text(
                self.destination_account_name.as_deref(),
            ),
            amount: self.amount,
            memo: normalize_optional_text(self.memo.as_deref()),
            timestamp: self.timestamp,
        })
    }
}

fn required_id(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidId(format!("{label} id must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// A committed transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub transfer_id: String,
    pub source_account_id: String,
    pub source_account_name: Option<String>,
    pub destination_account_id: String,
    pub destination_account_name: Option<String>,
    pub amount: MoneyCents,
    pub memo: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transfer {
    /// The two entries booking this transfer: debit first, credit second.
    #[must_use]
    pub fn entries(&self) -> [LedgerEntry; 2] {
        [
            LedgerEntry {
                transfer_id: self.transfer_id.clone(),
                side: EntrySide::Debit,
                account_id: self.source_account_id.clone(),
                delta: -self.amount,
                timestamp: self.timestamp,
            },
            LedgerEntry {
                transfer_id: self.transfer_id.clone(),
                side: EntrySide::Credit,
                account_id: self.destination_account_id.clone(),
                delta: self.amount,
                timestamp: self.timestamp,
            },
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for EntrySide {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::InvalidId(format!(
                "invalid ledger entry side: {other}"
            ))),
        }
    }
}

/// One balance change. `transfer_id` points back to the owning transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transfer_id: String,
    pub side: EntrySide,
    pub account_id: String,
    pub delta: MoneyCents,
    pub timestamp: DateTime<Utc>,
}

/// What the caller gets back from a successful post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer: Transfer,
    pub entries: [LedgerEntry; 2],
}

impl TransferReceipt {
    pub(crate) fn new(transfer: Transfer) -> Self {
        let entries = transfer.entries();
        Self { transfer, entries }
    }

    /// Sum of the entries' deltas. Zero for every well-formed receipt.
    #[must_use]
    pub fn net_delta(&self) -> MoneyCents {
        self.entries.iter().map(|e| e.delta).sum()
    }

    /// Whether `transfer` books the same movement as this receipt. Timestamp,
    /// memo and display names are not part of the posting, so a retry stamped
    /// later still matches.
    pub(crate) fn matches(&self, transfer: &Transfer) -> bool {
        self.transfer.source_account_id == transfer.source_account_id
            && self.transfer.destination_account_id == transfer.destination_account_id
            && self.transfer.amount == transfer.amount
    }
}

pub mod transfer_entity {
    //! `transfers` table. The primary key is the caller's transfer id, which is
    //! what makes concurrent duplicate commits collide.
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "transfers")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub source_account_id: String,
        pub source_account_name: Option<String>,
        pub destination_account_id: String,
        pub destination_account_name: Option<String>,
        pub amount_minor: i64,
        pub memo: Option<String>,
        pub occurred_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::entry_entity::Entity")]
        LedgerEntries,
    }

    impl Related<super::entry_entity::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::LedgerEntries.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&Transfer> for ActiveModel {
        fn from(transfer: &Transfer) -> Self {
            Self {
                id: ActiveValue::Set(transfer.transfer_id.clone()),
                source_account_id: ActiveValue::Set(transfer.source_account_id.clone()),
                source_account_name: ActiveValue::Set(transfer.source_account_name.clone()),
                destination_account_id: ActiveValue::Set(transfer.destination_account_id.clone()),
                destination_account_name: ActiveValue::Set(
                    transfer.destination_account_name.clone(),
                ),
                amount_minor: ActiveValue::Set(transfer.amount.cents()),
                memo: ActiveValue::Set(transfer.memo.clone()),
                occurred_at: ActiveValue::Set(transfer.timestamp),
            }
        }
    }

    impl From<Model> for Transfer {
        fn from(model: Model) -> Self {
            Self {
                transfer_id: model.id,
                source_account_id: model.source_account_id,
                source_account_name: model.source_account_name,
                destination_account_id: model.destination_account_id,
                destination_account_name: model.destination_account_name,
                amount: MoneyCents::new(model.amount_minor),
                memo: model.memo,
                timestamp: model.occurred_at,
            }
        }
    }
}

pub mod entry_entity {
    //! `ledger_entries` table.
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "ledger_entries")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub transfer_id: String,
        pub side: String,
        pub account_id: String,
        pub delta_minor: i64,
        pub occurred_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::transfer_entity::Entity",
            from = "Column::TransferId",
            to = "super::transfer_entity::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        Transfers,
    }

    impl Related<super::transfer_entity::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Transfers.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&LedgerEntry> for ActiveModel {
        fn from(entry: &LedgerEntry) -> Self {
            Self {
                id: ActiveValue::NotSet,
                transfer_id: ActiveValue::Set(entry.transfer_id.clone()),
                side: ActiveValue::Set(entry.side.as_str().to_string()),
                account_id: ActiveValue::Set(entry.account_id.clone()),
                delta_minor: ActiveValue::Set(entry.delta.cents()),
                occurred_at: ActiveValue::Set(entry.timestamp),
            }
        }
    }

    impl TryFrom<Model> for LedgerEntry {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                transfer_id: model.transfer_id,
                side: EntrySide::try_from(model.side.as_str())?,
                account_id: model.account_id,
                delta: MoneyCents::new(model.delta_minor),
                timestamp: model.occurred_at,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: i64) -> TransferRequest {
        TransferRequest::new("t1", "A", "B", MoneyCents::new(amount), Utc::now())
    }

    #[test]
    fn entries_balance_out() {
        let transfer = request(50_00).into_transfer().unwrap();
        let receipt = TransferReceipt::new(transfer);
        assert_eq!(receipt.entries[0].account_id, "A");
        assert_eq!(receipt.entries[0].delta, MoneyCents::new(-50_00));
        assert_eq!(receipt.entries[0].side, EntrySide::Debit);
        assert_eq!(receipt.entries[1].account_id, "B");
        assert_eq!(receipt.entries[1].delta, MoneyCents::new(50_00));
        assert!(receipt.net_delta().is_zero());
    }

    #[test]
    fn validation_errors() {
        assert!(matches!(
            request(0).into_transfer(),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            request(-1).into_transfer(),
            Err(EngineError::InvalidAmount(_))
        ));
        let same = TransferRequest::new("t1", "A", " A ", MoneyCents::new(1), Utc::now());
        assert_eq!(
            same.into_transfer(),
            Err(EngineError::SameAccount("A".to_string()))
        );
        let blank = TransferRequest::new("  ", "A", "B", MoneyCents::new(1), Utc::now());
        assert!(matches!(blank.into_transfer(), Err(EngineError::InvalidId(_))));
    }

    #[test]
    fn receipt_matches_on_accounts_and_amount() {
        let receipt = TransferReceipt::new(request(50_00).into_transfer().unwrap());

        let later = TransferRequest::new(
            "t1",
            "A",
            "B",
            MoneyCents::new(50_00),
            receipt.transfer.timestamp + chrono::Duration::milliseconds(3),
        )
        .memo("retry")
        .source_name("Checking")
        .into_transfer()
        .unwrap();
        assert!(receipt.matches(&later));

        assert!(!receipt.matches(&request(70_00).into_transfer().unwrap()));
        let reversed = TransferRequest::new("t1", "B", "A", MoneyCents::new(50_00), Utc::now());
        assert!(!receipt.matches(&reversed.into_transfer().unwrap()));
    }

    #[test]
    fn blank_memo_is_dropped() {
        let transfer = request(1).memo("   ").into_transfer().unwrap();
        assert_eq!(transfer.memo, None);
        let transfer = request(1).memo(" rent ").into_transfer().unwrap();
        assert_eq!(transfer.memo.as_deref(), Some("rent"));
    }
}
