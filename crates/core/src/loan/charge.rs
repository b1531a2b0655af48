//! Charges applied to a loan.

use chrono::NaiveDate;
use loanbook_shared::types::{ChargeId, LoanChargeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// When a charge falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeTimeType {
    /// Collected at disbursement; never part of the repayment schedule.
    Disbursement,
    /// Due on a specific date; lands in the installment covering that date.
    SpecifiedDueDate,
}

/// A fee or penalty charged on a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCharge {
    id: LoanChargeId,
    charge_id: ChargeId,
    name: String,
    time_type: ChargeTimeType,
    penalty: bool,
    due_date: Option<NaiveDate>,
    amount: Decimal,
    amount_paid: Decimal,
    amount_waived: Decimal,
    amount_written_off: Decimal,
    amount_accrued: Decimal,
    amount_unrecognized: Decimal,
    active: bool,
}

impl LoanCharge {
    /// Fee or penalty due on `due_date`.
    #[must_use]
    pub fn specified_due_date(
        charge_id: ChargeId,
        name: impl Into<String>,
        amount: Decimal,
        due_date: NaiveDate,
        penalty: bool,
    ) -> Self {
        Self::new(charge_id, name.into(), ChargeTimeType::SpecifiedDueDate, amount, Some(due_date), penalty)
    }

    /// Fee collected at disbursement. The due date is set when the loan is disbursed.
    #[must_use]
    pub fn disbursement(charge_id: ChargeId, name: impl Into<String>, amount: Decimal) -> Self {
        Self::new(charge_id, name.into(), ChargeTimeType::Disbursement, amount, None, false)
    }

    fn new(
        charge_id: ChargeId,
        name: String,
        time_type: ChargeTimeType,
        amount: Decimal,
        due_date: Option<NaiveDate>,
        penalty: bool,
    ) -> Self {
        Self {
            id: LoanChargeId::new(),
            charge_id,
            name,
            time_type,
            penalty,
            due_date,
            amount,
            amount_paid: Decimal::ZERO,
            amount_waived: Decimal::ZERO,
            amount_written_off: Decimal::ZERO,
            amount_accrued: Decimal::ZERO,
            amount_unrecognized: Decimal::ZERO,
            active: true,
        }
    }

    /// Loan charge id.
    #[must_use]
    pub const fn id(&self) -> LoanChargeId {
        self.id
    }

    /// Charge definition id.
    #[must_use]
    pub const fn charge_id(&self) -> ChargeId {
        self.charge_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Charge time.
    #[must_use]
    pub const fn time_type(&self) -> ChargeTimeType {
        self.time_type
    }

    /// Penalty rather than fee.
    #[must_use]
    pub const fn is_penalty(&self) -> bool {
        self.penalty
    }

    /// Collected at disbursement.
    #[must_use]
    pub const fn is_disbursement_charge(&self) -> bool {
        matches!(self.time_type, ChargeTimeType::Disbursement)
    }

    /// Due date, once known.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Charged amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Paid so far.
    #[must_use]
    pub const fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    /// Waived so far.
    #[must_use]
    pub const fn amount_waived(&self) -> Decimal {
        self.amount_waived
    }

    /// Written off so far.
    #[must_use]
    pub const fn amount_written_off(&self) -> Decimal {
        self.amount_written_off
    }

    /// Recognized as income so far.
    #[must_use]
    pub const fn amount_accrued(&self) -> Decimal {
        self.amount_accrued
    }

    /// Waived before it was ever recognized.
    #[must_use]
    pub const fn amount_unrecognized(&self) -> Decimal {
        self.amount_unrecognized
    }

    /// Whether the charge still applies.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Amount still owed.
    #[must_use]
    pub fn amount_outstanding(&self) -> Decimal {
        (self.amount - self.amount_paid - self.amount_waived - self.amount_written_off).max(Decimal::ZERO)
    }

    /// Nothing left to collect.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.amount_outstanding().is_zero()
    }

    /// Due strictly after `from` and on or before `to`.
    #[must_use]
    pub fn is_due_for_collection_from_and_up_to_and_including(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| from < due && due <= to)
    }

    /// Whether the charge belongs to the installment `(from, to]`. The first
    /// installment also takes everything due on or before its start.
    #[must_use]
    pub fn is_due_in_installment(&self, from: NaiveDate, to: NaiveDate, first: bool) -> bool {
        if first {
            self.due_date.is_some_and(|due| due <= to)
        } else {
            self.is_due_for_collection_from_and_up_to_and_including(from, to)
        }
    }

    /// Pays up to the outstanding amount; returns what was applied.
    pub(crate) fn pay(&mut self, amount: Decimal) -> Decimal {
        let applied = amount.min(self.amount_outstanding()).max(Decimal::ZERO);
        self.amount_paid += applied;
        applied
    }

    /// Undoes up to the paid amount; returns what was undone.
    pub(crate) fn unpay(&mut self, amount: Decimal) -> Decimal {
        let applied = amount.min(self.amount_paid).max(Decimal::ZERO);
        self.amount_paid -= applied;
        applied
    }

    /// Forgets payments and write-offs before a replay.
    pub(crate) fn reset_derived(&mut self) {
        self.amount_paid = Decimal::ZERO;
        self.amount_written_off = Decimal::ZERO;
    }

    pub(crate) fn write_off_outstanding(&mut self) -> Decimal {
        let outstanding = self.amount_outstanding();
        self.amount_written_off += outstanding;
        outstanding
    }

    pub(crate) fn set_due_date(&mut self, due_date: NaiveDate) {
        self.due_date = Some(due_date);
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    pub(crate) fn add_accrued(&mut self, amount: Decimal) {
        self.amount_accrued += amount;
    }
}
