//! Accrual input and output types.

use chrono::NaiveDate;
use loanbook_shared::types::{ChargeId, LoanChargeId, LoanId, LoanProductId, MonetaryCurrency, OfficeId};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::error::LoanError;

/// A charge that falls inside an installment window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicableCharge {
    /// Charge instance on the loan.
    pub loan_charge_id: LoanChargeId,
    /// Charge definition.
    pub charge_id: ChargeId,
    /// Penalty rather than fee.
    pub is_penalty: bool,
    /// Due date.
    pub due_date: NaiveDate,
    /// Income the charge can produce (charged minus unrecognized).
    pub income: Decimal,
    /// Already accrued on the charge.
    pub accrued: Decimal,
}

impl ApplicableCharge {
    /// What is left to accrue on the charge.
    #[must_use]
    pub fn amount_to_accrue(&self) -> Decimal {
        self.income - self.accrued
    }
}

/// Accrual view of one installment, built fresh per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanScheduleAccrualData {
    /// Loan.
    pub loan_id: LoanId,
    /// Office.
    pub office_id: OfficeId,
    /// Product.
    pub product_id: LoanProductId,
    /// Installment number.
    pub installment_number: u32,
    /// Period start.
    pub from_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Loan accrual watermark.
    pub accrued_till: Option<NaiveDate>,
    /// Date interest starts running, when later than disbursement.
    pub interest_calculated_from: Option<NaiveDate>,
    /// Currency.
    pub currency: MonetaryCurrency,
    /// Interest charged on the installment.
    pub interest_income: Decimal,
    /// Interest already accrued.
    pub accrued_interest_income: Decimal,
    /// Fees already accrued.
    pub accrued_fee_income: Decimal,
    /// Penalties already accrued.
    pub accrued_penalty_income: Decimal,
    /// Interest waived on the installment.
    pub waived_interest_income: Decimal,
    /// Charges in the installment window.
    pub applicable_charges: Vec<ApplicableCharge>,
    /// Interest left after reconciling waivers; set by the income pass.
    pub accruable_interest: Option<Decimal>,
}

impl LoanScheduleAccrualData {
    /// Interest available for accrual, falling back to the charged interest
    /// when waivers have not been reconciled.
    #[must_use]
    pub fn accruable_income(&self) -> Decimal {
        self.accruable_interest.unwrap_or(self.interest_income)
    }

    /// Fee and penalty income due on or before `till` (everything when `None`).
    #[must_use]
    pub fn charge_income(&self, till: Option<NaiveDate>) -> (Decimal, Decimal) {
        self.charges_due(till).fold((Decimal::ZERO, Decimal::ZERO), |(fee, penalty), charge| {
            if charge.is_penalty {
                (fee, penalty + charge.income)
            } else {
                (fee + charge.income, penalty)
            }
        })
    }

    /// Charges due on or before `till` (all when `None`).
    pub fn charges_due(&self, till: Option<NaiveDate>) -> impl Iterator<Item = &ApplicableCharge> {
        self.applicable_charges
            .iter()
            .filter(move |charge| till.is_none_or(|till| charge.due_date <= till))
    }
}

/// Recognized and unrecognized income of one interest waiver, in date order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiverIncome {
    /// Waiver date.
    pub date: NaiveDate,
    /// Interest portion after removing unrecognized income.
    pub recognized: Decimal,
    /// Waived before it was ever accrued.
    pub unrecognized: Decimal,
}

/// One accrual to post against a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualPosting {
    /// Installment the accrual belongs to.
    pub installment_number: u32,
    /// Transaction date.
    pub date: NaiveDate,
    /// Interest delta; `None` when zero.
    pub interest: Option<Decimal>,
    /// Fee delta; `None` when zero.
    pub fee: Option<Decimal>,
    /// Penalty delta; `None` when zero.
    pub penalty: Option<Decimal>,
    /// Running interest total after this accrual.
    pub interest_total: Decimal,
    /// Running fee total after this accrual.
    pub fee_total: Decimal,
    /// Running penalty total after this accrual.
    pub penalty_total: Decimal,
    /// Charges paid by this accrual, with the amount accrued on each.
    pub charges: Vec<(ApplicableCharge, Decimal)>,
    /// Watermark to store on the loan.
    pub accrued_till: NaiveDate,
}

impl AccrualPosting {
    /// Total of the three deltas.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.interest.unwrap_or_default() + self.fee.unwrap_or_default() + self.penalty.unwrap_or_default()
    }
}

/// Per-loan failures of a batch accrual run.
#[derive(Debug, Error)]
#[error("accrual failed for {} loan(s): {}", .failures.len(), summarize(.failures))]
pub struct AccrualBatchError {
    /// Failing loans in processing order.
    pub failures: Vec<(LoanId, LoanError)>,
}

fn summarize(failures: &[(LoanId, LoanError)]) -> String {
    failures
        .iter()
        .map(|(loan_id, err)| format!("{loan_id}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<AccrualBatchError> for LoanError {
    fn from(err: AccrualBatchError) -> Self {
        Self::AccrualFailed {
            message: err.to_string(),
        }
    }
}
