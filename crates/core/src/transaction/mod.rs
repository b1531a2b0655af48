//! Loan transactions.
//!
//! This module implements the transaction side of the engine:
//! - The closed transaction type taxonomy and its persisted codes
//! - The transaction record, its factories and component accounting
//! - Charge allocations, installment mappings and relations
//! - The replay result (`ChangedTransactionDetail`)
//! - The accounting bridge payload

pub mod allocation;
pub mod bridge;
pub mod changed;
pub mod record;
pub mod types;

#[cfg(test)]
mod record_props;

pub use allocation::{
    ChargeRefundChargeType, InstallmentMapping, LoanChargePaidBy, PaymentDetail, TransactionRelation,
    TransactionRelationType,
};
pub use bridge::{AccountingBridgeData, ChargePaidBridgeData, LoanTransactionBridgeData};
pub use changed::ChangedTransactionDetail;
pub use record::{LoanRef, LoanTransaction};
pub use types::LoanTransactionType;
