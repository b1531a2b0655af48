//! Income accrual.
//!
//! This module implements:
//! - The per-installment accrual view and accrual postings
//! - Waiver reconciliation and pro-rata arithmetic
//! - The accrual service applying postings to a loan

pub mod income;
pub mod service;
pub mod types;

#[cfg(test)]
mod income_props;

pub use service::AccrualService;
pub use types::{AccrualBatchError, AccrualPosting, ApplicableCharge, LoanScheduleAccrualData, WaiverIncome};
