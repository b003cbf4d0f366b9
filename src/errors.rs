use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for ledger, loan, and storage layers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Loan not found: {0}")]
    LoanNotFound(Uuid),
    #[error("Insufficient funds: balance {balance} is below required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Persistence error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}
