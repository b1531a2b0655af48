//! Allocation of transaction amounts across the repayment schedule.
//!
//! Repayments walk installments oldest first and, within each installment,
//! settle penalty, then fee, then interest, then principal. Whatever is left
//! once every installment is settled is overpayment. Fee and penalty amounts
//! are further attributed to the loan charges due in the installment.

use chrono::NaiveDate;
use loanbook_shared::types::{MonetaryCurrency, Money};
use rust_decimal::Decimal;

use crate::error::LoanError;
use crate::loan::charge::LoanCharge;
use crate::loan::schedule::RepaymentInstallment;
use crate::transaction::allocation::{InstallmentMapping, LoanChargePaidBy};
use crate::transaction::record::LoanTransaction;

/// Outcome of allocating one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Principal portion.
    pub principal: Decimal,
    /// Interest portion.
    pub interest: Decimal,
    /// Fee portion.
    pub fee_charges: Decimal,
    /// Penalty portion.
    pub penalty_charges: Decimal,
    /// Amount that found nothing to settle.
    pub overpayment: Decimal,
    /// Per-installment split.
    pub mappings: Vec<InstallmentMapping>,
    /// Per-charge split, penalties before fees within an installment.
    pub charges_paid: Vec<LoanChargePaidBy>,
}

impl Allocation {
    /// Sum of the four portions.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.principal + self.interest + self.fee_charges + self.penalty_charges
    }

    fn record(&mut self, mapping: InstallmentMapping) {
        if mapping.amount().is_zero() {
            return;
        }
        self.principal += mapping.principal;
        self.interest += mapping.interest;
        self.fee_charges += mapping.fee_charges;
        self.penalty_charges += mapping.penalty_charges;
        self.mappings.push(mapping);
    }

    /// Writes the allocation onto a transaction as component deltas.
    pub fn apply_to(self, transaction: &mut LoanTransaction, currency: MonetaryCurrency) -> Result<(), LoanError> {
        transaction.update_components(
            Money::of(currency, self.principal),
            Money::of(currency, self.interest),
            Money::of(currency, self.fee_charges),
            Money::of(currency, self.penalty_charges),
        )?;
        transaction.set_over_payments(Money::of(currency, self.overpayment))?;
        for mapping in self.mappings {
            transaction.add_installment_mapping(mapping);
        }
        for paid_by in self.charges_paid {
            transaction.add_charge_paid_by(paid_by);
        }
        Ok(())
    }
}

fn charges_in<'a>(
    charges: &'a mut [LoanCharge],
    installment: &RepaymentInstallment,
    penalty: bool,
) -> impl Iterator<Item = &'a mut LoanCharge> + use<'a> {
    let (from, to, first) = (installment.from_date, installment.due_date, installment.number == 1);
    charges.iter_mut().filter(move |charge| {
        charge.is_active()
            && !charge.is_disbursement_charge()
            && charge.is_penalty() == penalty
            && charge.is_due_in_installment(from, to, first)
    })
}

fn settle_charges(
    charges: &mut [LoanCharge],
    installment: &RepaymentInstallment,
    amount: Decimal,
    penalty: bool,
    out: &mut Vec<LoanChargePaidBy>,
) {
    let mut remaining = amount;
    for charge in charges_in(charges, installment, penalty) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let applied = charge.pay(remaining);
        if applied.is_zero() {
            continue;
        }
        remaining -= applied;
        out.push(LoanChargePaidBy {
            loan_charge_id: charge.id(),
            charge_id: charge.charge_id(),
            amount: applied,
            installment_number: Some(installment.number),
            is_penalty: penalty,
        });
    }
}

fn unsettle_charges(charges: &mut [LoanCharge], installment: &RepaymentInstallment, amount: Decimal, penalty: bool) {
    let mut remaining = amount;
    let mut matching: Vec<&mut LoanCharge> = charges_in(charges, installment, penalty).collect();
    for charge in matching.iter_mut().rev() {
        if remaining <= Decimal::ZERO {
            break;
        }
        remaining -= charge.unpay(remaining);
    }
}

/// Settles `amount` against the schedule, oldest installment first.
pub fn allocate_repayment(
    installments: &mut [RepaymentInstallment],
    charges: &mut [LoanCharge],
    amount: Decimal,
    date: NaiveDate,
) -> Allocation {
    let mut allocation = Allocation::default();
    let mut remaining = amount;

    for installment in installments.iter_mut() {
        if remaining <= Decimal::ZERO {
            break;
        }
        if installment.is_fully_paid() {
            continue;
        }
        let penalty_charges = installment.pay_penalty_charges(&mut remaining);
        let fee_charges = installment.pay_fee_charges(&mut remaining);
        let interest = installment.pay_interest(&mut remaining);
        let principal = installment.pay_principal(&mut remaining);
        installment.refresh_obligations_met(date);

        settle_charges(charges, installment, penalty_charges, true, &mut allocation.charges_paid);
        settle_charges(charges, installment, fee_charges, false, &mut allocation.charges_paid);
        allocation.record(InstallmentMapping {
            principal,
            interest,
            fee_charges,
            penalty_charges,
            ..InstallmentMapping::for_installment(installment.number)
        });
    }

    allocation.overpayment = remaining;
    allocation
}

/// Pays one charge in the installment that holds its due date (the last
/// installment when the charge falls due after maturity).
pub fn allocate_charge_payment(
    installments: &mut [RepaymentInstallment],
    charge: &mut LoanCharge,
    amount: Decimal,
    date: NaiveDate,
) -> Allocation {
    let mut allocation = Allocation::default();
    let applied = charge.pay(amount);
    let penalty = charge.is_penalty();

    let position = installments
        .iter()
        .position(|i| charge.is_due_in_installment(i.from_date, i.due_date, i.number == 1))
        .or_else(|| installments.len().checked_sub(1));

    let mut mapping_target = None;
    if let Some(position) = position {
        let installment = &mut installments[position];
        let mut remaining = applied;
        if penalty {
            installment.pay_penalty_charges(&mut remaining);
        } else {
            installment.pay_fee_charges(&mut remaining);
        }
        installment.refresh_obligations_met(date);
        mapping_target = Some(installment.number);
    }

    allocation.charges_paid.push(LoanChargePaidBy {
        loan_charge_id: charge.id(),
        charge_id: charge.charge_id(),
        amount: applied,
        installment_number: mapping_target,
        is_penalty: penalty,
    });
    let mut mapping = InstallmentMapping::for_installment(mapping_target.unwrap_or(0));
    if penalty {
        mapping.penalty_charges = applied;
    } else {
        mapping.fee_charges = applied;
    }
    if mapping_target.is_some() {
        allocation.record(mapping);
    } else if penalty {
        allocation.penalty_charges = applied;
    } else {
        allocation.fee_charges = applied;
    }
    allocation.overpayment = amount - applied;
    allocation
}

/// Pays a disbursement-time charge; nothing on the schedule moves.
pub fn allocate_disbursement_charge(charge: &mut LoanCharge, amount: Decimal) -> Allocation {
    let applied = charge.pay(amount);
    let mut allocation = Allocation {
        overpayment: amount - applied,
        ..Allocation::default()
    };
    if charge.is_penalty() {
        allocation.penalty_charges = applied;
    } else {
        allocation.fee_charges = applied;
    }
    allocation.charges_paid.push(LoanChargePaidBy {
        loan_charge_id: charge.id(),
        charge_id: charge.charge_id(),
        amount: applied,
        installment_number: None,
        is_penalty: charge.is_penalty(),
    });
    allocation
}

/// Waives interest oldest installment first.
pub fn allocate_interest_waiver(
    installments: &mut [RepaymentInstallment],
    amount: Decimal,
    date: NaiveDate,
) -> Allocation {
    let mut allocation = Allocation::default();
    let mut remaining = amount;
    for installment in installments.iter_mut() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let interest = installment.waive_interest(&mut remaining);
        installment.refresh_obligations_met(date);
        allocation.record(InstallmentMapping {
            interest,
            ..InstallmentMapping::for_installment(installment.number)
        });
    }
    allocation.overpayment = remaining;
    allocation
}

/// Undoes payments latest installment first: principal, interest, fee, penalty.
pub fn allocate_refund_for_active_loan(
    installments: &mut [RepaymentInstallment],
    charges: &mut [LoanCharge],
    amount: Decimal,
    date: NaiveDate,
) -> Allocation {
    let mut allocation = Allocation::default();
    let mut remaining = amount;
    for installment in installments.iter_mut().rev() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let principal = installment.unpay_principal(&mut remaining);
        let interest = installment.unpay_interest(&mut remaining);
        let fee_charges = installment.unpay_fee_charges(&mut remaining);
        let penalty_charges = installment.unpay_penalty_charges(&mut remaining);
        installment.refresh_obligations_met(date);

        unsettle_charges(charges, installment, fee_charges, false);
        unsettle_charges(charges, installment, penalty_charges, true);
        allocation.record(InstallmentMapping {
            principal,
            interest,
            fee_charges,
            penalty_charges,
            ..InstallmentMapping::for_installment(installment.number)
        });
    }
    allocation.mappings.reverse();
    allocation.overpayment = remaining;
    allocation
}

/// Adds charged-back principal to the installment covering `date` (the last
/// installment once the schedule has matured).
pub fn allocate_chargeback(installments: &mut [RepaymentInstallment], amount: Decimal, date: NaiveDate) -> Allocation {
    let mut allocation = Allocation::default();
    let target = installments
        .iter()
        .position(|i| i.contains(date))
        .or_else(|| installments.len().checked_sub(1));
    if let Some(position) = target {
        let installment = &mut installments[position];
        installment.principal += amount;
        installment.credited_principal += amount;
        installment.refresh_obligations_met(date);
        allocation.record(InstallmentMapping {
            principal: amount,
            ..InstallmentMapping::for_installment(installment.number)
        });
    }
    allocation
}

/// Writes off everything outstanding on the schedule and the charges.
pub fn allocate_write_off(installments: &mut [RepaymentInstallment], charges: &mut [LoanCharge]) -> Allocation {
    let mut allocation = Allocation::default();
    for installment in installments.iter_mut() {
        let (principal, interest, fee_charges, penalty_charges) = installment.write_off_outstanding();
        allocation.record(InstallmentMapping {
            principal,
            interest,
            fee_charges,
            penalty_charges,
            ..InstallmentMapping::for_installment(installment.number)
        });
    }
    for charge in charges.iter_mut().filter(|c| c.is_active() && !c.is_disbursement_charge()) {
        charge.write_off_outstanding();
    }
    allocation
}
