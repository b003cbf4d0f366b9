#![doc(test(attr(deny(warnings))))]

//! Finance Core offers the balance-consistent transaction ledger and the
//! exact-annuity loan primitives that power higher level personal-finance
//! workflows: posting, editing, and reversing categorized transactions
//! against account balances, and originating, amortizing, and prepaying
//! fixed-payment loans.

pub mod amortization;
pub mod core;
pub mod dates;
pub mod domain;
pub mod errors;
pub mod money;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Finance Core tracing initialized.");
    });
}
