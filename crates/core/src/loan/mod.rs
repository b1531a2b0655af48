//! The loan aggregate and everything it owns.
//!
//! This module implements:
//! - The status state machine with persisted codes
//! - Product terms and schedule generation
//! - Charges and their placement on the schedule
//! - The allocation processor and history replay
//! - Holiday and working-day rules for postings

pub mod aggregate;
pub mod charge;
pub mod holiday;
pub mod processor;
pub mod product;
pub mod schedule;
pub mod status;

pub use aggregate::{
    ClientRef, ForeclosureDetail, GroupRef, Loan, LoanApplication, LoanSubStatus, LoanType, ReceivableIncome,
};
pub use charge::{ChargeTimeType, LoanCharge};
pub use holiday::{Holiday, HolidayDetail, WorkingDays};
pub use processor::Allocation;
pub use product::{AccountingRule, AmortizationMethod, InterestMethod, LoanProductTerms};
pub use schedule::{RepaymentInstallment, ScheduleGenerator};
pub use status::{LoanEvent, LoanStatus};
