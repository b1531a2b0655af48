//! Repayment schedule: installments and their generation.
//!
//! Amounts on an installment are plain decimals already rounded to the loan
//! currency; rounding happens once, when the generator or the processor
//! produces a value.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanError;
use crate::loan::product::{AmortizationMethod, InterestMethod, LoanProductTerms};

/// One period of the repayment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct RepaymentInstallment {
    /// 1-based position.
    pub number: u32,
    /// Period start (exclusive, except for the first installment).
    pub from_date: NaiveDate,
    /// Due date (inclusive end of the period).
    pub due_date: NaiveDate,

    pub principal: Decimal,
    pub principal_completed: Decimal,
    pub principal_written_off: Decimal,
    /// Principal added back by chargebacks; included in `principal`.
    pub credited_principal: Decimal,

    pub interest_charged: Decimal,
    pub interest_paid: Decimal,
    pub interest_waived: Decimal,
    pub interest_written_off: Decimal,
    pub interest_accrued: Decimal,

    pub fee_charges_charged: Decimal,
    pub fee_charges_paid: Decimal,
    pub fee_charges_waived: Decimal,
    pub fee_charges_written_off: Decimal,
    pub fee_accrued: Decimal,

    pub penalty_charges_charged: Decimal,
    pub penalty_charges_paid: Decimal,
    pub penalty_charges_waived: Decimal,
    pub penalty_charges_written_off: Decimal,
    pub penalty_accrued: Decimal,

    /// Date the installment became fully paid.
    pub obligations_met_on: Option<NaiveDate>,
}

fn take(amount: &mut Decimal, outstanding: Decimal) -> Decimal {
    let applied = (*amount).min(outstanding).max(Decimal::ZERO);
    *amount -= applied;
    applied
}

impl RepaymentInstallment {
    /// Installment with principal and interest due and nothing paid.
    #[must_use]
    pub fn new(number: u32, from_date: NaiveDate, due_date: NaiveDate, principal: Decimal, interest: Decimal) -> Self {
        Self {
            number,
            from_date,
            due_date,
            principal,
            principal_completed: Decimal::ZERO,
            principal_written_off: Decimal::ZERO,
            credited_principal: Decimal::ZERO,
            interest_charged: interest,
            interest_paid: Decimal::ZERO,
            interest_waived: Decimal::ZERO,
            interest_written_off: Decimal::ZERO,
            interest_accrued: Decimal::ZERO,
            fee_charges_charged: Decimal::ZERO,
            fee_charges_paid: Decimal::ZERO,
            fee_charges_waived: Decimal::ZERO,
            fee_charges_written_off: Decimal::ZERO,
            fee_accrued: Decimal::ZERO,
            penalty_charges_charged: Decimal::ZERO,
            penalty_charges_paid: Decimal::ZERO,
            penalty_charges_waived: Decimal::ZERO,
            penalty_charges_written_off: Decimal::ZERO,
            penalty_accrued: Decimal::ZERO,
            obligations_met_on: None,
        }
    }

    /// Whether `date` falls inside this period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        let after_start = if self.number == 1 {
            self.from_date <= date
        } else {
            self.from_date < date
        };
        after_start && date <= self.due_date
    }

    /// Principal still owed.
    #[must_use]
    pub fn principal_outstanding(&self) -> Decimal {
        self.principal - self.principal_completed - self.principal_written_off
    }

    /// Interest still owed.
    #[must_use]
    pub fn interest_outstanding(&self) -> Decimal {
        self.interest_charged - self.interest_paid - self.interest_waived - self.interest_written_off
    }

    /// Fees still owed.
    #[must_use]
    pub fn fee_charges_outstanding(&self) -> Decimal {
        self.fee_charges_charged - self.fee_charges_paid - self.fee_charges_waived - self.fee_charges_written_off
    }

    /// Penalties still owed.
    #[must_use]
    pub fn penalty_charges_outstanding(&self) -> Decimal {
        self.penalty_charges_charged
            - self.penalty_charges_paid
            - self.penalty_charges_waived
            - self.penalty_charges_written_off
    }

    /// Everything still owed.
    #[must_use]
    pub fn total_outstanding(&self) -> Decimal {
        self.principal_outstanding()
            + self.interest_outstanding()
            + self.fee_charges_outstanding()
            + self.penalty_charges_outstanding()
    }

    /// Everything paid so far.
    #[must_use]
    pub fn total_paid(&self) -> Decimal {
        self.principal_completed + self.interest_paid + self.fee_charges_paid + self.penalty_charges_paid
    }

    /// Nothing left to pay.
    #[must_use]
    pub fn is_fully_paid(&self) -> bool {
        self.total_outstanding() <= Decimal::ZERO
    }

    /// Pays penalties from `amount`, returning what was applied.
    pub fn pay_penalty_charges(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.penalty_charges_outstanding());
        self.penalty_charges_paid += applied;
        applied
    }

    /// Pays fees from `amount`, returning what was applied.
    pub fn pay_fee_charges(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.fee_charges_outstanding());
        self.fee_charges_paid += applied;
        applied
    }

    /// Pays interest from `amount`, returning what was applied.
    pub fn pay_interest(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.interest_outstanding());
        self.interest_paid += applied;
        applied
    }

    /// Pays principal from `amount`, returning what was applied.
    pub fn pay_principal(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.principal_outstanding());
        self.principal_completed += applied;
        applied
    }

    /// Waives interest from `amount`, returning what was applied.
    pub fn waive_interest(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.interest_outstanding());
        self.interest_waived += applied;
        applied
    }

    /// Undoes principal payments from `amount`.
    pub fn unpay_principal(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.principal_completed);
        self.principal_completed -= applied;
        applied
    }

    /// Undoes interest payments from `amount`.
    pub fn unpay_interest(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.interest_paid);
        self.interest_paid -= applied;
        applied
    }

    /// Undoes fee payments from `amount`.
    pub fn unpay_fee_charges(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.fee_charges_paid);
        self.fee_charges_paid -= applied;
        applied
    }

    /// Undoes penalty payments from `amount`.
    pub fn unpay_penalty_charges(&mut self, amount: &mut Decimal) -> Decimal {
        let applied = take(amount, self.penalty_charges_paid);
        self.penalty_charges_paid -= applied;
        applied
    }

    /// Writes off everything outstanding; returns (principal, interest, fee, penalty).
    pub fn write_off_outstanding(&mut self) -> (Decimal, Decimal, Decimal, Decimal) {
        let written = (
            self.principal_outstanding(),
            self.interest_outstanding(),
            self.fee_charges_outstanding(),
            self.penalty_charges_outstanding(),
        );
        self.principal_written_off += written.0;
        self.interest_written_off += written.1;
        self.fee_charges_written_off += written.2;
        self.penalty_charges_written_off += written.3;
        written
    }

    /// Clears paid, waived, written-off and credited amounts before a replay.
    /// Charged and accrued amounts survive.
    pub fn reset_derived(&mut self) {
        self.principal -= self.credited_principal;
        self.credited_principal = Decimal::ZERO;
        self.principal_completed = Decimal::ZERO;
        self.principal_written_off = Decimal::ZERO;
        self.interest_paid = Decimal::ZERO;
        self.interest_waived = Decimal::ZERO;
        self.interest_written_off = Decimal::ZERO;
        self.fee_charges_paid = Decimal::ZERO;
        self.fee_charges_waived = Decimal::ZERO;
        self.fee_charges_written_off = Decimal::ZERO;
        self.penalty_charges_paid = Decimal::ZERO;
        self.penalty_charges_waived = Decimal::ZERO;
        self.penalty_charges_written_off = Decimal::ZERO;
        self.obligations_met_on = None;
    }

    /// Stamps or clears the obligations-met date.
    pub fn refresh_obligations_met(&mut self, date: NaiveDate) {
        if self.is_fully_paid() {
            self.obligations_met_on.get_or_insert(date);
        } else {
            self.obligations_met_on = None;
        }
    }
}

/// Builds repayment schedules from product terms.
pub struct ScheduleGenerator;

impl ScheduleGenerator {
    /// Generates the installments for `principal` disbursed on `disbursed_on`.
    ///
    /// Declining balance with equal installments uses the annuity formula;
    /// the last installment absorbs rounding so principal sums exactly.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-positive principal, zero
    /// installments or a due date outside the calendar.
    pub fn generate(
        terms: &LoanProductTerms,
        principal: Decimal,
        disbursed_on: NaiveDate,
    ) -> Result<Vec<RepaymentInstallment>, LoanError> {
        if principal <= Decimal::ZERO {
            return Err(LoanError::validation(
                "loan",
                "principal",
                "must.be.greater.than.zero",
                Some(principal.to_string()),
            ));
        }
        let n = terms.number_of_repayments;
        if n == 0 || terms.repayment_every_months == 0 {
            return Err(LoanError::validation(
                "loan",
                "numberOfRepayments",
                "must.be.greater.than.zero",
                Some(n.to_string()),
            ));
        }

        let currency = terms.currency;
        let rate = terms.periodic_rate();
        let count = Decimal::from(n);
        let equal_principal = currency.round(principal / count);
        let annuity = match (terms.interest_method, terms.amortization_method) {
            (InterestMethod::DecliningBalance, AmortizationMethod::EqualInstallments) if !rate.is_zero() => {
                let mut factor = Decimal::ONE;
                for _ in 0..n {
                    factor *= Decimal::ONE + rate;
                }
                Some(currency.round(principal * rate * factor / (factor - Decimal::ONE)))
            }
            _ => None,
        };
        let flat_interest = currency.round(principal * rate);

        let mut installments = Vec::with_capacity(n as usize);
        let mut balance = principal;
        let mut from_date = disbursed_on;
        for number in 1..=n {
            let due_date = disbursed_on
                .checked_add_months(Months::new(number * terms.repayment_every_months))
                .ok_or_else(|| {
                    LoanError::validation("loan", "repaymentEvery", "produces.invalid.due.date", None)
                })?;

            let interest = match terms.interest_method {
                InterestMethod::Flat => flat_interest,
                InterestMethod::DecliningBalance => currency.round(balance * rate),
            };
            let principal_due = if number == n {
                balance
            } else {
                annuity.map_or(equal_principal, |payment| payment - interest)
            };

            installments.push(RepaymentInstallment::new(number, from_date, due_date, principal_due, interest));
            balance -= principal_due;
            from_date = due_date;
        }
        Ok(installments)
    }
}
