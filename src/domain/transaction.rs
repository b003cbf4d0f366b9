use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction kinds and their posting semantics: Income credits the source
/// account, Expense debits it, Transfer moves funds between two accounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    /// The kind whose posted effect cancels this one's. A transfer stays a
    /// transfer; undoing one means running it back with the account pair
    /// swapped.
    pub fn reverse(self) -> Self {
        match self {
            TransactionKind::Income => TransactionKind::Expense,
            TransactionKind::Expense => TransactionKind::Income,
            TransactionKind::Transfer => TransactionKind::Transfer,
        }
    }
}

/// A posted transaction. Rows are soft-deleted (tombstoned) after their
/// balance effect has been reversed; lookups must exclude tombstoned rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: Uuid,
    pub source_account: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for posting a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub source_account: Uuid,
    #[serde(default)]
    pub destination_account: Option<Uuid>,
    #[serde(default)]
    pub category: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update for an existing transaction. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub source_account: Option<Uuid>,
    #[serde(default)]
    pub destination_account: Option<Uuid>,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TransactionPatch {
    /// True when applying the patch changes the transaction's posted balance
    /// effect, requiring a reverse-then-reapply cycle.
    pub fn affects_ledger(&self, existing: &Transaction) -> bool {
        self.amount.is_some_and(|amount| amount != existing.amount)
            || self.kind.is_some_and(|kind| kind != existing.kind)
            || self
                .source_account
                .is_some_and(|account| account != existing.source_account)
            || self
                .destination_account
                .is_some_and(|account| Some(account) != existing.destination_account)
    }
}
