//! The balance ledger: the only code path allowed to mutate account balances.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::book::Book;
use crate::errors::CoreError;
use crate::money::round2;

use super::ServiceResult;

/// Applies signed balance deltas to accounts inside the caller's unit of
/// work. Balance-floor policy belongs to the posting layer; this primitive
/// only locates the row and mutates it.
pub struct BalanceLedger;

impl BalanceLedger {
    /// Applies a signed delta to an account's balance and returns the new
    /// balance. Fails with `AccountNotFound` when the account is absent,
    /// tombstoned, or owned by someone else.
    pub fn apply_delta(
        book: &mut Book,
        owner: Uuid,
        account: Uuid,
        delta: Decimal,
    ) -> ServiceResult<Decimal> {
        let row = book
            .account_mut(owner, account)
            .ok_or(CoreError::AccountNotFound(account))?;
        row.balance = round2(row.balance + delta);
        Ok(row.balance)
    }

    /// Moves `amount` from `source` to `destination` as two deltas. The
    /// caller's unit of work guarantees both commit together or not at all.
    pub fn apply_transfer(
        book: &mut Book,
        owner: Uuid,
        source: Uuid,
        destination: Uuid,
        amount: Decimal,
    ) -> ServiceResult<(Decimal, Decimal)> {
        let source_balance = Self::apply_delta(book, owner, source, -amount)?;
        let destination_balance = Self::apply_delta(book, owner, destination, amount)?;
        Ok((source_balance, destination_balance))
    }
}
