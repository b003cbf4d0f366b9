use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consumer loan classes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanKind {
    Mortgage,
    Auto,
    Personal,
    Student,
    Business,
    Other,
}

/// Loan lifecycle. `PaidOff` is terminal and reached when either the
/// remaining principal or the remaining term hits zero; `Defaulted` and
/// `Refinanced` are administrative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    PaidOff,
    Defaulted,
    Refinanced,
}

/// An amortizing loan. Mutated only by the payment recorder and by
/// administrative term edits, which recompute the monthly payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub owner: Uuid,
    pub kind: LoanKind,
    pub name: String,
    pub original_amount: Decimal,
    /// Annual interest rate in percent (8 means 8% per year).
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub remaining_principal: Decimal,
    pub remaining_months: u32,
    pub monthly_payment: Decimal,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
    pub total_principal_paid: Decimal,
    pub total_interest_paid: Decimal,
    pub total_prepayment: Decimal,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// Append-only audit record of a single loan payment. Never mutated after
/// creation. `principal_portion` combines the scheduled principal and any
/// prepayment; `prepayment_portion` tracks the prepayment separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanPayment {
    pub id: Uuid,
    pub loan: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub principal_portion: Decimal,
    pub interest_portion: Decimal,
    pub prepayment_portion: Decimal,
    pub remaining_principal_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for originating a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
    pub kind: LoanKind,
    pub name: String,
    pub original_amount: Decimal,
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub start_date: NaiveDate,
}

/// Input for recording an actual loan payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub prepayment_amount: Decimal,
}

/// Administrative edit of loan terms. `None` leaves a field as-is; any
/// change to amount, rate, or term recomputes the monthly payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanTermsPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub term_months: Option<u32>,
}
