pub mod balance_service;
pub mod loan_service;
pub mod transaction_service;

pub use balance_service::BalanceLedger;
pub use loan_service::LoanService;
pub use transaction_service::{PostReceipt, TransactionService};

use crate::errors::CoreError;

pub type ServiceResult<T> = Result<T, CoreError>;
