//! Core loan servicing logic for Loanbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and outside services are reached through the ports in
//! [`servicing::ports`].
//!
//! # Modules
//!
//! - `transaction` - Loan transaction records, types and the accounting bridge
//! - `loan` - The loan aggregate, its schedule, charges and status machine
//! - `accrual` - Periodic and upfront income accrual
//! - `servicing` - Command orchestration over the aggregate
//! - `error` - Domain and store error types

pub mod accrual;
pub mod error;
pub mod loan;
pub mod servicing;
pub mod transaction;

pub use error::{LoanError, StoreError};
