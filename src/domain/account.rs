use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported account kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountKind {
    Cash,
    Bank,
    CreditCard,
    EWallet,
    Investment,
}

/// A financial account. Its balance reflects the net effect of all
/// non-reversed transactions touching it and is mutated only through the
/// balance ledger, never directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates a new account with the given opening balance.
    pub fn new(
        owner: Uuid,
        name: impl Into<String>,
        kind: AccountKind,
        opening_balance: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name: name.into(),
            kind,
            balance: opening_balance,
            credit_limit: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
