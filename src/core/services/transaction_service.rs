//! The transaction poster: validated posting, editing, and reversal of
//! transactions, with balance effects applied through the balance ledger
//! inside one unit of work.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::book::{Book, UnitOfWork};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionKind, TransactionPatch};
use crate::errors::CoreError;
use crate::money::round2;

use super::{BalanceLedger, ServiceResult};

/// Snapshot returned after a successful post: the persisted transaction plus
/// the updated balances of the accounts it touched.
#[derive(Debug, Clone, Serialize)]
pub struct PostReceipt {
    pub transaction: Transaction,
    pub source_balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_balance: Option<Decimal>,
}

pub struct TransactionService;

impl TransactionService {
    /// Validates and posts a new transaction. The row write and its balance
    /// deltas commit atomically; a failed funds check mutates nothing.
    pub fn create(
        book: &mut Book,
        owner: Uuid,
        input: NewTransaction,
    ) -> ServiceResult<PostReceipt> {
        let amount = round2(input.amount);
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("amount must be positive".into()));
        }
        let source = book
            .account(owner, input.source_account)
            .ok_or(CoreError::AccountNotFound(input.source_account))?;
        check_kind_rules(
            input.kind,
            input.source_account,
            input.destination_account,
            input.category,
        )?;
        check_funds(source.balance, amount, input.kind)?;

        let transaction = Transaction {
            id: Uuid::new_v4(),
            owner,
            source_account: input.source_account,
            destination_account: input.destination_account,
            category: input.category,
            kind: input.kind,
            amount,
            date: input.date,
            description: input.description,
            note: input.note,
            created_at: Utc::now(),
            deleted_at: None,
        };

        let mut uow = UnitOfWork::begin(book);
        let id = uow.add_transaction(transaction);
        let (source_balance, destination_balance) = apply_effect(
            &mut uow,
            owner,
            input.kind,
            input.source_account,
            input.destination_account,
            amount,
        )?;
        let transaction = uow
            .transaction(owner, id)
            .cloned()
            .ok_or(CoreError::TransactionNotFound(id))?;
        uow.commit();
        tracing::debug!(transaction = %id, %amount, "posted transaction");
        Ok(PostReceipt {
            transaction,
            source_balance,
            destination_balance,
        })
    }

    /// Applies a partial update. When the amount, kind, or either account
    /// changes, the old posted effect is reversed with the old values and the
    /// new effect reapplied with the new ones, all in one unit of work. Pure
    /// field edits bypass the ledger entirely.
    pub fn update(
        book: &mut Book,
        owner: Uuid,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ServiceResult<Transaction> {
        let existing = book
            .transaction(owner, id)
            .cloned()
            .ok_or(CoreError::TransactionNotFound(id))?;

        let new_kind = patch.kind.unwrap_or(existing.kind);
        let new_amount = round2(patch.amount.unwrap_or(existing.amount));
        let new_source = patch.source_account.unwrap_or(existing.source_account);
        // A kind change away from Transfer drops the stale destination, and a
        // change away from Income/Expense drops the stale category. A patch
        // that explicitly sets a field the resulting kind forbids is rejected
        // rather than silently discarded.
        let new_destination = match new_kind {
            TransactionKind::Transfer => patch
                .destination_account
                .or(existing.destination_account),
            _ => {
                if patch.destination_account.is_some() {
                    return Err(CoreError::Validation(
                        "only transfers may set a destination account".into(),
                    ));
                }
                None
            }
        };
        let new_category = match new_kind {
            TransactionKind::Transfer => {
                if patch.category.is_some() {
                    return Err(CoreError::Validation(
                        "transfer cannot carry a category".into(),
                    ));
                }
                None
            }
            _ => patch.category.or(existing.category),
        };

        if new_amount <= Decimal::ZERO {
            return Err(CoreError::Validation("amount must be positive".into()));
        }
        check_kind_rules(new_kind, new_source, new_destination, new_category)?;

        if !patch.affects_ledger(&existing) {
            let row = book
                .transaction_mut(owner, id)
                .ok_or(CoreError::TransactionNotFound(id))?;
            row.category = new_category;
            if let Some(date) = patch.date {
                row.date = date;
            }
            if let Some(description) = patch.description {
                row.description = Some(description);
            }
            if let Some(note) = patch.note {
                row.note = Some(note);
            }
            let updated = row.clone();
            book.touch();
            return Ok(updated);
        }

        let mut uow = UnitOfWork::begin(book);
        reverse_effect(
            &mut uow,
            owner,
            existing.kind,
            existing.source_account,
            existing.destination_account,
            existing.amount,
        )?;
        let source_balance = uow
            .account(owner, new_source)
            .map(|account| account.balance)
            .ok_or(CoreError::AccountNotFound(new_source))?;
        check_funds(source_balance, new_amount, new_kind)?;
        apply_effect(
            &mut uow,
            owner,
            new_kind,
            new_source,
            new_destination,
            new_amount,
        )?;

        let row = uow
            .transaction_mut(owner, id)
            .ok_or(CoreError::TransactionNotFound(id))?;
        row.kind = new_kind;
        row.amount = new_amount;
        row.source_account = new_source;
        row.destination_account = new_destination;
        row.category = new_category;
        if let Some(date) = patch.date {
            row.date = date;
        }
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        if let Some(note) = patch.note {
            row.note = Some(note);
        }
        let updated = row.clone();
        uow.commit();
        tracing::debug!(transaction = %id, "reposted transaction");
        Ok(updated)
    }

    /// Reverses the posted effect and tombstones the row, atomically.
    pub fn remove(book: &mut Book, owner: Uuid, id: Uuid) -> ServiceResult<Transaction> {
        let existing = book
            .transaction(owner, id)
            .cloned()
            .ok_or(CoreError::TransactionNotFound(id))?;

        let mut uow = UnitOfWork::begin(book);
        reverse_effect(
            &mut uow,
            owner,
            existing.kind,
            existing.source_account,
            existing.destination_account,
            existing.amount,
        )?;
        let row = uow
            .transaction_mut(owner, id)
            .ok_or(CoreError::TransactionNotFound(id))?;
        row.deleted_at = Some(Utc::now());
        let removed = row.clone();
        uow.commit();
        tracing::debug!(transaction = %id, "reversed and tombstoned transaction");
        Ok(removed)
    }
}

/// Applies the balance effect of a transaction of `kind` through the ledger.
fn apply_effect(
    book: &mut Book,
    owner: Uuid,
    kind: TransactionKind,
    source: Uuid,
    destination: Option<Uuid>,
    amount: Decimal,
) -> ServiceResult<(Decimal, Option<Decimal>)> {
    match kind {
        TransactionKind::Income => {
            Ok((BalanceLedger::apply_delta(book, owner, source, amount)?, None))
        }
        TransactionKind::Expense => Ok((
            BalanceLedger::apply_delta(book, owner, source, -amount)?,
            None,
        )),
        TransactionKind::Transfer => {
            let destination = destination.ok_or_else(|| {
                CoreError::Validation("transfer requires a destination account".into())
            })?;
            let (source_balance, destination_balance) =
                BalanceLedger::apply_transfer(book, owner, source, destination, amount)?;
            Ok((source_balance, Some(destination_balance)))
        }
    }
}

/// Undoes a previously posted effect. Income and expense invert through
/// `TransactionKind::reverse`; a transfer runs back across the pair, moving
/// the amount from the destination to the source.
fn reverse_effect(
    book: &mut Book,
    owner: Uuid,
    kind: TransactionKind,
    source: Uuid,
    destination: Option<Uuid>,
    amount: Decimal,
) -> ServiceResult<()> {
    match kind {
        TransactionKind::Transfer => {
            let destination = destination.ok_or_else(|| {
                CoreError::Validation("transfer requires a destination account".into())
            })?;
            apply_effect(
                book,
                owner,
                TransactionKind::Transfer,
                destination,
                Some(source),
                amount,
            )?;
        }
        kind => {
            apply_effect(book, owner, kind.reverse(), source, destination, amount)?;
        }
    }
    Ok(())
}

fn check_kind_rules(
    kind: TransactionKind,
    source: Uuid,
    destination: Option<Uuid>,
    category: Option<Uuid>,
) -> ServiceResult<()> {
    match kind {
        TransactionKind::Transfer => {
            let destination = destination.ok_or_else(|| {
                CoreError::Validation("transfer requires a destination account".into())
            })?;
            if destination == source {
                return Err(CoreError::Validation(
                    "transfer source and destination must differ".into(),
                ));
            }
            if category.is_some() {
                return Err(CoreError::Validation(
                    "transfer cannot carry a category".into(),
                ));
            }
        }
        TransactionKind::Income | TransactionKind::Expense => {
            if destination.is_some() {
                return Err(CoreError::Validation(
                    "only transfers may set a destination account".into(),
                ));
            }
            if category.is_none() {
                return Err(CoreError::Validation(
                    "income and expense require a category".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Expenses and transfers may not overdraw the source account.
fn check_funds(balance: Decimal, amount: Decimal, kind: TransactionKind) -> ServiceResult<()> {
    match kind {
        TransactionKind::Expense | TransactionKind::Transfer if balance < amount => {
            Err(CoreError::InsufficientFunds {
                balance,
                required: amount,
            })
        }
        _ => Ok(()),
    }
}
