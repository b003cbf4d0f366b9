//! Annuity math: fixed monthly payment and amortization schedules.

pub mod prepayment;

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::dates::add_months;
use crate::domain::loan::Loan;
use crate::money::round2;

/// Converts an annual percentage rate into the monthly periodic rate, kept
/// at full precision for intermediate math.
pub fn periodic_rate(annual_rate_pct: Decimal) -> Decimal {
    annual_rate_pct / dec!(100) / dec!(12)
}

/// Fixed monthly payment for an amortizing loan:
/// `M = P * r * (1+r)^n / ((1+r)^n - 1)`, rounded to two places.
/// A zero rate degenerates to straight-line repayment `P / n`.
pub fn monthly_payment(principal: Decimal, annual_rate_pct: Decimal, months: u32) -> Decimal {
    if months == 0 {
        return Decimal::ZERO;
    }
    let rate = periodic_rate(annual_rate_pct);
    if rate.is_zero() {
        return round2(principal / Decimal::from(months));
    }
    let growth = (Decimal::ONE + rate).powi(i64::from(months));
    round2(principal * rate * growth / (growth - Decimal::ONE))
}

/// One row of an amortization schedule. All money fields are rounded to two
/// places.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduleEntry {
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub payment: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub remaining_principal: Decimal,
}

/// Lazy, finite, non-restartable amortization schedule.
///
/// Yields `remaining_months` entries starting at the loan's next payment
/// date (or its start date when none is set), one calendar month apart. The
/// final entry retires the full residual balance so cumulative rounding
/// drift never leaks into the last row.
#[derive(Debug)]
pub struct Schedule {
    balance: Decimal,
    rate: Decimal,
    payment: Decimal,
    date: NaiveDate,
    remaining: u32,
    number: u32,
}

impl Schedule {
    pub fn for_loan(loan: &Loan) -> Self {
        Self {
            balance: loan.remaining_principal,
            rate: periodic_rate(loan.interest_rate),
            payment: loan.monthly_payment,
            date: loan.next_payment_date.unwrap_or(loan.start_date),
            remaining: loan.remaining_months,
            number: 0,
        }
    }
}

impl Iterator for Schedule {
    type Item = ScheduleEntry;

    fn next(&mut self) -> Option<ScheduleEntry> {
        if self.remaining == 0 {
            return None;
        }
        self.number += 1;
        let interest = round2(self.balance * self.rate);
        let (payment, principal) = if self.remaining == 1 {
            // Final entry: retire whatever balance is left.
            let principal = self.balance;
            (round2(principal + interest), principal)
        } else {
            let principal = round2(self.payment - interest).min(self.balance);
            (self.payment, principal)
        };
        self.balance = round2(self.balance - principal);
        let entry = ScheduleEntry {
            payment_number: self.number,
            payment_date: self.date,
            payment,
            principal,
            interest,
            remaining_principal: self.balance,
        };
        self.date = add_months(self.date, 1);
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.remaining as usize;
        (len, Some(len))
    }
}
