//! Domain models: accounts, transactions, loans, and the book aggregate.

pub mod account;
pub mod book;
pub mod loan;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use book::{Book, UnitOfWork};
pub use loan::{Loan, LoanKind, LoanPayment, LoanStatus, LoanTermsPatch, NewLoan, RecordPayment};
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionPatch};
