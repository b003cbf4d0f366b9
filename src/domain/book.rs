use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::Account;
use super::loan::{Loan, LoanPayment};
use super::transaction::Transaction;

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// The record arena holding every entity of one book of accounts.
///
/// Relationships between records are expressed as id fields and resolved via
/// the lookup helpers below; there are no live back-references. Every lookup
/// filters tombstoned rows and checks record ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub loan_payments: Vec<LoanPayment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Book::schema_version_default")]
    pub schema_version: u8,
}

impl Book {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            accounts: Vec::new(),
            transactions: Vec::new(),
            loans: Vec::new(),
            loan_payments: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_account(&mut self, account: Account) -> Uuid {
        let id = account.id;
        self.accounts.push(account);
        self.touch();
        id
    }

    pub fn add_transaction(&mut self, transaction: Transaction) -> Uuid {
        let id = transaction.id;
        self.transactions.push(transaction);
        id
    }

    pub fn add_loan(&mut self, loan: Loan) -> Uuid {
        let id = loan.id;
        self.loans.push(loan);
        id
    }

    pub fn add_loan_payment(&mut self, payment: LoanPayment) -> Uuid {
        let id = payment.id;
        self.loan_payments.push(payment);
        id
    }

    pub fn account(&self, owner: Uuid, id: Uuid) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.id == id && account.owner == owner && !account.is_deleted())
    }

    pub fn account_mut(&mut self, owner: Uuid, id: Uuid) -> Option<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|account| account.id == id && account.owner == owner && !account.is_deleted())
    }

    pub fn transaction(&self, owner: Uuid, id: Uuid) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|txn| txn.id == id && txn.owner == owner && !txn.is_deleted())
    }

    pub fn transaction_mut(&mut self, owner: Uuid, id: Uuid) -> Option<&mut Transaction> {
        self.transactions
            .iter_mut()
            .find(|txn| txn.id == id && txn.owner == owner && !txn.is_deleted())
    }

    pub fn loan(&self, owner: Uuid, id: Uuid) -> Option<&Loan> {
        self.loans
            .iter()
            .find(|loan| loan.id == id && loan.owner == owner && !loan.is_deleted())
    }

    pub fn loan_mut(&mut self, owner: Uuid, id: Uuid) -> Option<&mut Loan> {
        self.loans
            .iter_mut()
            .find(|loan| loan.id == id && loan.owner == owner && !loan.is_deleted())
    }

    /// Payments recorded against a loan, in posting order.
    pub fn payments_for(&self, loan: Uuid) -> impl Iterator<Item = &LoanPayment> {
        self.loan_payments
            .iter()
            .filter(move |payment| payment.loan == loan)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

/// Scoped atomic unit of work over a [`Book`].
///
/// `begin` snapshots the book; `commit` is the single commit point. Any other
/// exit path, including `?` on a service error, restores the snapshot when
/// the guard drops, so partial writes never survive. The exclusive `&mut`
/// borrow serializes concurrent writers to the same book, which closes the
/// window between a balance-sufficiency read and the following write.
#[derive(Debug)]
pub struct UnitOfWork<'a> {
    book: &'a mut Book,
    snapshot: Option<Book>,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(book: &'a mut Book) -> Self {
        let snapshot = Some(book.clone());
        Self { book, snapshot }
    }

    /// Commits every write performed through the guard and disarms rollback.
    pub fn commit(mut self) {
        self.snapshot = None;
        self.book.touch();
    }
}

impl Deref for UnitOfWork<'_> {
    type Target = Book;

    fn deref(&self) -> &Book {
        self.book
    }
}

impl DerefMut for UnitOfWork<'_> {
    fn deref_mut(&mut self) -> &mut Book {
        self.book
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.book = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::account::AccountKind;

    #[test]
    fn lookups_exclude_tombstoned_rows() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Tombstones");
        let mut account = Account::new(owner, "Wallet", AccountKind::Cash, dec!(10));
        account.deleted_at = Some(Utc::now());
        let id = book.add_account(account);
        assert!(book.account(owner, id).is_none());
    }

    #[test]
    fn lookups_check_ownership() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Owners");
        let id = book.add_account(Account::new(owner, "Bank", AccountKind::Bank, dec!(50)));
        assert!(book.account(owner, id).is_some());
        assert!(book.account(Uuid::new_v4(), id).is_none());
    }

    #[test]
    fn dropped_unit_of_work_rolls_back() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Rollback");
        let id = book.add_account(Account::new(owner, "Bank", AccountKind::Bank, dec!(100)));
        {
            let mut uow = UnitOfWork::begin(&mut book);
            if let Some(account) = uow.account_mut(owner, id) {
                account.balance = dec!(0);
            }
            // dropped without commit
        }
        assert_eq!(book.account(owner, id).unwrap().balance, dec!(100));
    }

    #[test]
    fn committed_unit_of_work_keeps_writes() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Commit");
        let id = book.add_account(Account::new(owner, "Bank", AccountKind::Bank, dec!(100)));
        let mut uow = UnitOfWork::begin(&mut book);
        if let Some(account) = uow.account_mut(owner, id) {
            account.balance = dec!(25);
        }
        uow.commit();
        assert_eq!(book.account(owner, id).unwrap().balance, dec!(25));
    }
}
