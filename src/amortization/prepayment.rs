//! What-if simulation of a principal prepayment. Pure math, no persistence.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::money::round2;

use super::{monthly_payment, periodic_rate};

/// How a prepayment reshapes the loan: keep the payment and shorten the
/// term, or keep the term and shrink the payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrepaymentStrategy {
    ReduceTerm,
    ReducePayment,
}

/// Loan position a simulation runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub remaining_principal: Decimal,
    pub remaining_months: u32,
    pub monthly_payment: Decimal,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    pub prepayment_amount: Decimal,
    pub strategy: PrepaymentStrategy,
}

/// Outcome of a prepayment simulation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrepaymentOutcome {
    pub original_term_months: u32,
    pub new_term_months: u32,
    pub original_monthly_payment: Decimal,
    pub new_monthly_payment: Decimal,
    pub total_interest_saved: Decimal,
    pub months_saved: u32,
}

/// Simulates applying `prepayment_amount` against the remaining principal.
///
/// A prepayment covering the whole balance is a full payoff: the term and
/// payment both drop to zero and every remaining month is saved.
pub fn simulate(input: &SimulationInput) -> Result<PrepaymentOutcome> {
    if input.prepayment_amount <= Decimal::ZERO {
        return Err(CoreError::Validation(
            "prepayment amount must be positive".into(),
        ));
    }
    if input.remaining_principal <= Decimal::ZERO || input.remaining_months == 0 {
        return Err(CoreError::Validation(
            "loan has no remaining principal to prepay".into(),
        ));
    }

    if input.prepayment_amount >= input.remaining_principal {
        return Ok(PrepaymentOutcome {
            original_term_months: input.remaining_months,
            new_term_months: 0,
            original_monthly_payment: input.monthly_payment,
            new_monthly_payment: Decimal::ZERO,
            total_interest_saved: Decimal::ZERO,
            months_saved: input.remaining_months,
        });
    }

    let reduced_principal = input.remaining_principal - input.prepayment_amount;
    let (new_term_months, new_monthly_payment) = match input.strategy {
        PrepaymentStrategy::ReduceTerm => {
            let term =
                solve_remaining_term(reduced_principal, input.interest_rate, input.monthly_payment)?;
            (term, input.monthly_payment)
        }
        PrepaymentStrategy::ReducePayment => {
            let payment = monthly_payment(
                reduced_principal,
                input.interest_rate,
                input.remaining_months,
            );
            (input.remaining_months, payment)
        }
    };

    let original_interest = input.monthly_payment * Decimal::from(input.remaining_months)
        - input.remaining_principal;
    let new_interest =
        new_monthly_payment * Decimal::from(new_term_months) - reduced_principal;

    Ok(PrepaymentOutcome {
        original_term_months: input.remaining_months,
        new_term_months,
        original_monthly_payment: input.monthly_payment,
        new_monthly_payment,
        total_interest_saved: round2(original_interest - new_interest),
        months_saved: input.remaining_months.saturating_sub(new_term_months),
    })
}

/// Closed-form inverse of the annuity formula: the number of months needed
/// to retire `principal` with a fixed `payment`,
/// `n = ceil( ln(M / (M - P*r)) / ln(1+r) )`.
/// A zero rate degenerates to `ceil(P / M)`.
pub fn solve_remaining_term(
    principal: Decimal,
    annual_rate_pct: Decimal,
    payment: Decimal,
) -> Result<u32> {
    if principal <= Decimal::ZERO {
        return Ok(0);
    }
    if payment <= Decimal::ZERO {
        return Err(CoreError::Validation(
            "monthly payment must be positive".into(),
        ));
    }
    let rate = periodic_rate(annual_rate_pct);
    let months = if rate.is_zero() {
        (principal / payment).ceil()
    } else {
        let period_interest = principal * rate;
        if payment <= period_interest {
            return Err(CoreError::Validation(
                "monthly payment does not cover the interest accrual".into(),
            ));
        }
        ((payment / (payment - period_interest)).ln() / (Decimal::ONE + rate).ln()).ceil()
    };
    months
        .to_u32()
        .ok_or_else(|| CoreError::Validation("remaining term out of range".into()))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn base_input(strategy: PrepaymentStrategy, prepayment: Decimal) -> SimulationInput {
        SimulationInput {
            remaining_principal: dec!(100000),
            remaining_months: 12,
            monthly_payment: dec!(8698.84),
            interest_rate: dec!(8),
            prepayment_amount: prepayment,
            strategy,
        }
    }

    #[test]
    fn full_payoff_short_circuits() {
        let outcome = simulate(&base_input(PrepaymentStrategy::ReduceTerm, dec!(100000))).unwrap();
        assert_eq!(outcome.new_term_months, 0);
        assert_eq!(outcome.new_monthly_payment, Decimal::ZERO);
        assert_eq!(outcome.months_saved, 12);
        assert_eq!(outcome.total_interest_saved, Decimal::ZERO);
    }

    #[test]
    fn reduce_term_keeps_payment_and_shortens_term() {
        let outcome = simulate(&base_input(PrepaymentStrategy::ReduceTerm, dec!(50000))).unwrap();
        assert_eq!(outcome.new_monthly_payment, dec!(8698.84));
        assert_eq!(outcome.new_term_months, 6);
        assert_eq!(outcome.months_saved, 6);
        assert!(outcome.new_term_months <= outcome.original_term_months);
        assert!(outcome.total_interest_saved > Decimal::ZERO);
    }

    #[test]
    fn reduce_payment_keeps_term_and_shrinks_payment() {
        let outcome =
            simulate(&base_input(PrepaymentStrategy::ReducePayment, dec!(50000))).unwrap();
        assert_eq!(outcome.new_term_months, 12);
        assert_eq!(outcome.months_saved, 0);
        assert!(outcome.new_monthly_payment < outcome.original_monthly_payment);
    }

    #[test]
    fn zero_rate_term_solving() {
        assert_eq!(solve_remaining_term(dec!(1000), dec!(0), dec!(100)).unwrap(), 10);
        assert_eq!(solve_remaining_term(dec!(1001), dec!(0), dec!(100)).unwrap(), 11);
        assert_eq!(solve_remaining_term(dec!(0), dec!(0), dec!(100)).unwrap(), 0);
    }

    #[test]
    fn payment_must_cover_interest() {
        // 1,000,000 at 12% accrues 10,000/month; 5,000 never amortizes.
        let err = solve_remaining_term(dec!(1000000), dec!(12), dec!(5000)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn non_positive_prepayment_is_rejected() {
        let err = simulate(&base_input(PrepaymentStrategy::ReduceTerm, dec!(0))).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
