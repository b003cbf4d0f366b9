//! Loan lifecycle: origination, payment recording, prepayment simulation,
//! and administrative term edits.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::amortization::prepayment::{
    self, PrepaymentOutcome, PrepaymentStrategy, SimulationInput,
};
use crate::amortization::{self, Schedule};
use crate::dates::add_months;
use crate::domain::book::{Book, UnitOfWork};
use crate::domain::loan::{
    Loan, LoanPayment, LoanStatus, LoanTermsPatch, NewLoan, RecordPayment,
};
use crate::errors::CoreError;
use crate::money::round2;

use super::ServiceResult;

pub struct LoanService;

impl LoanService {
    /// Originates a loan with a computed monthly payment. The first
    /// installment falls due one month after the start date.
    pub fn create(book: &mut Book, owner: Uuid, input: NewLoan) -> ServiceResult<Loan> {
        let amount = round2(input.original_amount);
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "loan amount must be positive".into(),
            ));
        }
        if input.term_months == 0 {
            return Err(CoreError::Validation(
                "loan term must be at least one month".into(),
            ));
        }
        if input.interest_rate < Decimal::ZERO {
            return Err(CoreError::Validation(
                "interest rate cannot be negative".into(),
            ));
        }

        let loan = Loan {
            id: Uuid::new_v4(),
            owner,
            kind: input.kind,
            name: input.name,
            original_amount: amount,
            interest_rate: input.interest_rate,
            term_months: input.term_months,
            remaining_principal: amount,
            remaining_months: input.term_months,
            monthly_payment: amortization::monthly_payment(
                amount,
                input.interest_rate,
                input.term_months,
            ),
            start_date: input.start_date,
            next_payment_date: Some(add_months(input.start_date, 1)),
            total_principal_paid: Decimal::ZERO,
            total_interest_paid: Decimal::ZERO,
            total_prepayment: Decimal::ZERO,
            status: LoanStatus::Active,
            created_at: Utc::now(),
            deleted_at: None,
        };

        let mut uow = UnitOfWork::begin(book);
        uow.add_loan(loan.clone());
        uow.commit();
        tracing::debug!(loan = %loan.id, %amount, "originated loan");
        Ok(loan)
    }

    /// Records an actual payment against an active loan.
    ///
    /// The payment splits into interest accrued on the remaining principal
    /// and the principal remainder; any prepayment reduces principal
    /// directly and re-solves the remaining term at the fixed payment. The
    /// audit row, the loan totals, and the due-date advance commit together.
    pub fn record_payment(
        book: &mut Book,
        owner: Uuid,
        loan_id: Uuid,
        input: RecordPayment,
    ) -> ServiceResult<LoanPayment> {
        let amount = round2(input.amount);
        let prepayment_amount = round2(input.prepayment_amount);
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "payment amount must be positive".into(),
            ));
        }
        if prepayment_amount < Decimal::ZERO {
            return Err(CoreError::Validation(
                "prepayment amount cannot be negative".into(),
            ));
        }

        let loan = book
            .loan(owner, loan_id)
            .cloned()
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        if !loan.is_active() {
            return Err(CoreError::InvalidState(format!(
                "loan is {:?}, payments require an active loan",
                loan.status
            )));
        }

        let rate = amortization::periodic_rate(loan.interest_rate);
        let interest = round2(loan.remaining_principal * rate);
        let principal = round2(amount - interest);
        let new_remaining = round2(loan.remaining_principal - principal - prepayment_amount);
        // Clamp instead of raising: the final installment routinely overshoots
        // the residual balance by a cent of rounding drift.
        let remaining_after = new_remaining.max(Decimal::ZERO);

        let remaining_months = if remaining_after.is_zero() {
            0
        } else if prepayment_amount > Decimal::ZERO {
            prepayment::solve_remaining_term(
                remaining_after,
                loan.interest_rate,
                loan.monthly_payment,
            )?
        } else {
            loan.remaining_months.saturating_sub(1)
        };

        let payment = LoanPayment {
            id: Uuid::new_v4(),
            loan: loan_id,
            payment_date: input.payment_date,
            amount,
            principal_portion: round2(principal + prepayment_amount),
            interest_portion: interest,
            prepayment_portion: prepayment_amount,
            remaining_principal_after: remaining_after,
            created_at: Utc::now(),
        };

        let mut uow = UnitOfWork::begin(book);
        uow.add_loan_payment(payment.clone());
        let row = uow
            .loan_mut(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        row.total_principal_paid = round2(row.total_principal_paid + principal + prepayment_amount);
        row.total_interest_paid = round2(row.total_interest_paid + interest);
        row.total_prepayment = round2(row.total_prepayment + prepayment_amount);
        row.next_payment_date = Some(add_months(
            row.next_payment_date.unwrap_or(row.start_date),
            1,
        ));
        row.remaining_principal = remaining_after;
        row.remaining_months = remaining_months;
        if row.remaining_principal.is_zero() || row.remaining_months == 0 {
            row.status = LoanStatus::PaidOff;
            row.remaining_principal = Decimal::ZERO;
            row.remaining_months = 0;
        }
        uow.commit();
        tracing::debug!(loan = %loan_id, %amount, %interest, "recorded loan payment");
        Ok(payment)
    }

    /// Amortization schedule over the loan's current position.
    pub fn schedule(book: &Book, owner: Uuid, loan_id: Uuid) -> ServiceResult<Schedule> {
        let loan = book
            .loan(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        Ok(Schedule::for_loan(loan))
    }

    /// Prepayment what-if against the loan's current position. Mutates
    /// nothing.
    pub fn simulate_prepayment(
        book: &Book,
        owner: Uuid,
        loan_id: Uuid,
        prepayment_amount: Decimal,
        strategy: PrepaymentStrategy,
    ) -> ServiceResult<PrepaymentOutcome> {
        let loan = book
            .loan(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        prepayment::simulate(&SimulationInput {
            remaining_principal: loan.remaining_principal,
            remaining_months: loan.remaining_months,
            monthly_payment: loan.monthly_payment,
            interest_rate: loan.interest_rate,
            prepayment_amount,
            strategy,
        })
    }

    /// Administrative edit of loan terms. Any change to amount, rate, or
    /// term recomputes the monthly payment over the remaining position.
    pub fn update_terms(
        book: &mut Book,
        owner: Uuid,
        loan_id: Uuid,
        patch: LoanTermsPatch,
    ) -> ServiceResult<Loan> {
        let loan = book
            .loan(owner, loan_id)
            .cloned()
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        if !loan.is_active() {
            return Err(CoreError::InvalidState(format!(
                "loan is {:?}, only active loans may be edited",
                loan.status
            )));
        }
        if let Some(rate) = patch.interest_rate {
            if rate < Decimal::ZERO {
                return Err(CoreError::Validation(
                    "interest rate cannot be negative".into(),
                ));
            }
        }
        if patch.term_months == Some(0) {
            return Err(CoreError::Validation(
                "loan term must be at least one month".into(),
            ));
        }

        let mut uow = UnitOfWork::begin(book);
        let row = uow
            .loan_mut(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(amount) = patch.original_amount {
            let amount = round2(amount);
            if amount <= Decimal::ZERO {
                return Err(CoreError::Validation(
                    "loan amount must be positive".into(),
                ));
            }
            // Shift the remaining principal by the same delta as the face
            // amount so already-paid principal stays accounted for.
            let delta = amount - row.original_amount;
            row.original_amount = amount;
            row.remaining_principal = round2(row.remaining_principal + delta).max(Decimal::ZERO);
        }
        if let Some(rate) = patch.interest_rate {
            row.interest_rate = rate;
        }
        if let Some(term) = patch.term_months {
            row.term_months = term;
            row.remaining_months = term;
        }
        row.monthly_payment = amortization::monthly_payment(
            row.remaining_principal,
            row.interest_rate,
            row.remaining_months,
        );
        let updated = row.clone();
        uow.commit();
        Ok(updated)
    }

    /// Administrative status change; only an active loan can default or be
    /// refinanced.
    pub fn mark_status(
        book: &mut Book,
        owner: Uuid,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> ServiceResult<Loan> {
        if !matches!(status, LoanStatus::Defaulted | LoanStatus::Refinanced) {
            return Err(CoreError::Validation(
                "only Defaulted or Refinanced may be set administratively".into(),
            ));
        }
        let mut uow = UnitOfWork::begin(book);
        let row = uow
            .loan_mut(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        if !row.is_active() {
            return Err(CoreError::InvalidState(format!(
                "loan is {:?}, only active loans may change status",
                row.status
            )));
        }
        row.status = status;
        let updated = row.clone();
        uow.commit();
        Ok(updated)
    }

    /// Tombstones a loan. Orthogonal to the status machine; allowed from any
    /// state.
    pub fn remove(book: &mut Book, owner: Uuid, loan_id: Uuid) -> ServiceResult<Loan> {
        let mut uow = UnitOfWork::begin(book);
        let row = uow
            .loan_mut(owner, loan_id)
            .ok_or(CoreError::LoanNotFound(loan_id))?;
        row.deleted_at = Some(Utc::now());
        let removed = row.clone();
        uow.commit();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::loan::LoanKind;

    fn new_loan(amount: Decimal, rate: Decimal, months: u32) -> NewLoan {
        NewLoan {
            kind: LoanKind::Personal,
            name: "Car".into(),
            original_amount: amount,
            interest_rate: rate,
            term_months: months,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        }
    }

    fn payment(amount: Decimal, prepayment: Decimal) -> RecordPayment {
        RecordPayment {
            payment_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            amount,
            prepayment_amount: prepayment,
        }
    }

    #[test]
    fn origination_computes_payment_and_due_date() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(100000), dec!(8), 12)).unwrap();
        assert_eq!(loan.monthly_payment, dec!(8698.84));
        assert_eq!(loan.remaining_principal, dec!(100000));
        assert_eq!(loan.remaining_months, 12);
        assert_eq!(
            loan.next_payment_date,
            Some(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap())
        );
    }

    #[test]
    fn payment_splits_interest_and_principal() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(100000), dec!(8), 12)).unwrap();
        let row =
            LoanService::record_payment(&mut book, owner, loan.id, payment(dec!(8698.84), dec!(0)))
                .unwrap();
        assert_eq!(row.interest_portion, dec!(666.67));
        assert_eq!(row.principal_portion, dec!(8032.17));
        assert_eq!(row.prepayment_portion, dec!(0));
        assert_eq!(row.remaining_principal_after, dec!(91967.83));

        let loan = book.loan(owner, loan.id).unwrap();
        assert_eq!(loan.remaining_months, 11);
        assert_eq!(loan.total_interest_paid, dec!(666.67));
        assert_eq!(
            loan.next_payment_date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
    }

    #[test]
    fn prepayment_resolves_remaining_term() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(100000), dec!(8), 12)).unwrap();
        let row = LoanService::record_payment(
            &mut book,
            owner,
            loan.id,
            payment(dec!(8698.84), dec!(41967.83)),
        )
        .unwrap();
        // 666.67 interest, 8032.17 scheduled principal, 41,967.83 prepayment.
        assert_eq!(row.principal_portion, dec!(50000.00));
        assert_eq!(row.remaining_principal_after, dec!(50000.00));

        let loan = book.loan(owner, loan.id).unwrap();
        assert_eq!(loan.total_prepayment, dec!(41967.83));
        assert_eq!(loan.remaining_months, 6);
        assert!(loan.is_active());
    }

    #[test]
    fn payments_on_non_active_loans_are_rejected() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(1000), dec!(0), 2)).unwrap();
        LoanService::mark_status(&mut book, owner, loan.id, LoanStatus::Defaulted).unwrap();
        let err =
            LoanService::record_payment(&mut book, owner, loan.id, payment(dec!(500), dec!(0)))
                .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn zero_rate_loan_pays_off_in_term() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(1200), dec!(0), 3)).unwrap();
        assert_eq!(loan.monthly_payment, dec!(400.00));
        for _ in 0..3 {
            LoanService::record_payment(&mut book, owner, loan.id, payment(dec!(400), dec!(0)))
                .unwrap();
        }
        let loan = book.loan(owner, loan.id).unwrap();
        assert_eq!(loan.status, LoanStatus::PaidOff);
        assert_eq!(loan.remaining_principal, Decimal::ZERO);
        assert_eq!(loan.remaining_months, 0);
    }

    #[test]
    fn overpaying_the_balance_clamps_to_payoff() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(1000), dec!(0), 4)).unwrap();
        let row =
            LoanService::record_payment(&mut book, owner, loan.id, payment(dec!(1500), dec!(0)))
                .unwrap();
        assert_eq!(row.remaining_principal_after, Decimal::ZERO);
        let loan = book.loan(owner, loan.id).unwrap();
        assert_eq!(loan.status, LoanStatus::PaidOff);
    }

    #[test]
    fn term_edits_recompute_the_monthly_payment() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(1200), dec!(0), 12)).unwrap();
        assert_eq!(loan.monthly_payment, dec!(100.00));
        let patch = LoanTermsPatch {
            term_months: Some(6),
            ..LoanTermsPatch::default()
        };
        let updated = LoanService::update_terms(&mut book, owner, loan.id, patch).unwrap();
        assert_eq!(updated.monthly_payment, dec!(200.00));
        assert_eq!(updated.remaining_months, 6);
    }

    #[test]
    fn removed_loans_disappear_from_lookups() {
        let owner = Uuid::new_v4();
        let mut book = Book::new("Loans");
        let loan =
            LoanService::create(&mut book, owner, new_loan(dec!(1000), dec!(5), 12)).unwrap();
        LoanService::remove(&mut book, owner, loan.id).unwrap();
        assert!(book.loan(owner, loan.id).is_none());
        let err = LoanService::schedule(&book, owner, loan.id).unwrap_err();
        assert!(matches!(err, CoreError::LoanNotFound(_)));
    }
}
