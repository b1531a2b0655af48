//! Applying transactions to the schedule and replaying history.

use chrono::NaiveDate;
use loanbook_shared::types::{LoanChargeId, LoanTransactionId, MonetaryCurrency, Money};
use rust_decimal::Decimal;
use tracing::debug;

use super::Loan;
use crate::error::LoanError;
use crate::loan::charge::LoanCharge;
use crate::loan::processor::{self, Allocation};
use crate::loan::schedule::RepaymentInstallment;
use crate::loan::status::{LoanEvent, LoanStatus};
use crate::transaction::changed::ChangedTransactionDetail;
use crate::transaction::record::LoanTransaction;
use crate::transaction::types::LoanTransactionType;

/// Transaction types whose effect on the schedule is recomputed by a replay.
pub(super) const fn is_replayable(kind: LoanTransactionType) -> bool {
    kind.is_repayment_type()
        || kind.is_repayment_at_disbursement()
        || kind.is_charge_payment()
        || kind.is_waive_interest()
        || kind.is_refund_for_active_loan()
        || kind.is_chargeback()
        || kind.is_write_off()
}

fn allocate(
    installments: &mut [RepaymentInstallment],
    charges: &mut [LoanCharge],
    transaction: &LoanTransaction,
    target_charge: Option<LoanChargeId>,
) -> Result<Option<Allocation>, LoanError> {
    let kind = transaction.transaction_type();
    let amount = transaction.amount();
    let date = transaction.transaction_date();

    let allocation = if kind.is_repayment_type() || kind.is_repayment_at_disbursement() {
        processor::allocate_repayment(installments, charges, amount, date)
    } else if kind.is_charge_payment() {
        let charge_id = target_charge
            .ok_or_else(|| LoanError::validation("loan.transaction", "loanChargeId", "cannot.be.blank", None))?;
        let charge = charges
            .iter_mut()
            .find(|c| c.id() == charge_id)
            .ok_or(LoanError::LoanChargeNotFound(charge_id))?;
        if charge.is_disbursement_charge() {
            processor::allocate_disbursement_charge(charge, amount)
        } else {
            processor::allocate_charge_payment(installments, charge, amount, date)
        }
    } else if kind.is_waive_interest() {
        Allocation {
            overpayment: Decimal::ZERO,
            ..processor::allocate_interest_waiver(installments, amount, date)
        }
    } else if kind.is_refund_for_active_loan() {
        Allocation {
            overpayment: Decimal::ZERO,
            ..processor::allocate_refund_for_active_loan(installments, charges, amount, date)
        }
    } else if kind.is_chargeback() {
        processor::allocate_chargeback(installments, amount, date)
    } else if kind.is_write_off() {
        processor::allocate_write_off(installments, charges)
    } else {
        return Ok(None);
    };
    Ok(Some(allocation))
}

/// Applies one transaction to the schedule and rewrites its derived portions.
pub(super) fn apply_transaction(
    installments: &mut [RepaymentInstallment],
    charges: &mut [LoanCharge],
    transaction: &mut LoanTransaction,
    target_charge: Option<LoanChargeId>,
    currency: MonetaryCurrency,
) -> Result<(), LoanError> {
    let Some(allocation) = allocate(installments, charges, transaction, target_charge)? else {
        return Ok(());
    };

    let kind = transaction.transaction_type();
    transaction.reset_derived_components();
    transaction.clear_installment_mappings();
    allocation.apply_to(transaction, currency)?;
    if kind.is_waive_interest() {
        transaction.adjust_interest_component();
    }
    if kind.is_write_off() {
        let zero = Money::zero(currency);
        transaction.update_components_and_total(zero, zero, zero, zero)?;
    }
    transaction.update_outstanding_loan_balance(installments.iter().map(RepaymentInstallment::principal_outstanding).sum());
    Ok(())
}

impl Loan {
    /// Adds a monetary transaction, replaying history when it is back-dated.
    pub(super) fn post_monetary(
        &mut self,
        transaction: LoanTransaction,
        target_charge: Option<LoanChargeId>,
        business_date: NaiveDate,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        let date = transaction.transaction_date();
        let back_dated = self
            .transactions
            .iter()
            .any(|t| t.is_not_reversed() && is_replayable(t.transaction_type()) && date < t.transaction_date());

        let id = transaction.id();
        self.transactions.push(transaction);
        if back_dated {
            let changed = self.reprocess(Some((id, target_charge)), business_date)?;
            return Ok((!changed.is_empty()).then_some(changed));
        }

        let currency = self.currency();
        let index = self.transactions.len() - 1;
        apply_transaction(
            &mut self.installments,
            &mut self.charges,
            &mut self.transactions[index],
            target_charge,
            currency,
        )?;
        Ok(None)
    }

    /// Resets the schedule and replays every non-reversed monetary
    /// transaction in (date, submission, id) order.
    ///
    /// A transaction whose derived amounts change is reversed and replaced
    /// by a copy; its external id moves to the copy. `fresh` is the
    /// transaction being posted now, which is applied in place.
    pub(super) fn reprocess(
        &mut self,
        fresh: Option<(LoanTransactionId, Option<LoanChargeId>)>,
        business_date: NaiveDate,
    ) -> Result<ChangedTransactionDetail, LoanError> {
        let currency = self.currency();
        for installment in &mut self.installments {
            installment.reset_derived();
        }
        for charge in &mut self.charges {
            charge.reset_derived();
        }

        let mut order: Vec<usize> = (0..self.transactions.len())
            .filter(|&i| {
                let t = &self.transactions[i];
                t.is_not_reversed() && is_replayable(t.transaction_type())
            })
            .collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (&self.transactions[a], &self.transactions[b]);
            (a.transaction_date(), a.submitted_on(), a.id()).cmp(&(b.transaction_date(), b.submitted_on(), b.id()))
        });

        let mut changed = ChangedTransactionDetail::default();
        let mut replacements = Vec::new();
        for index in order {
            let id = self.transactions[index].id();
            if let Some((fresh_id, fresh_charge)) = fresh
                && fresh_id == id
            {
                apply_transaction(
                    &mut self.installments,
                    &mut self.charges,
                    &mut self.transactions[index],
                    fresh_charge,
                    currency,
                )?;
                continue;
            }

            let target = self.transactions[index].loan_charges_paid().first().map(|p| p.loan_charge_id);
            let mut copy = self.transactions[index].copy_for_replay();
            apply_transaction(&mut self.installments, &mut self.charges, &mut copy, target, currency)?;

            let original = &mut self.transactions[index];
            if copy.amounts_match(original) {
                original.adopt_allocations(&copy);
            } else {
                debug!(
                    loan_id = %original.loan_id(),
                    transaction_id = %id,
                    replacement_id = %copy.id(),
                    "replay changed transaction amounts"
                );
                original.reverse(business_date, None);
                original.take_external_id();
                changed.record(id, copy.clone());
                replacements.push(copy);
            }
        }
        self.transactions.extend(replacements);
        Ok(changed)
    }

    /// Moves the loan between active, overpaid and closed after a posting.
    /// Returns whether the status changed.
    pub(super) fn refresh_status(&mut self, date: NaiveDate) -> Result<bool, LoanError> {
        if !self.status.is_servicing() {
            return Ok(false);
        }
        let outstanding = self.total_outstanding();
        let overpaid = self.total_overpaid();
        let (event, target) = if outstanding <= Decimal::ZERO && overpaid > Decimal::ZERO {
            (LoanEvent::Overpayment, LoanStatus::Overpaid)
        } else if outstanding <= Decimal::ZERO {
            (LoanEvent::RepaidInFull, LoanStatus::ClosedObligationsMet)
        } else {
            (LoanEvent::RepaymentOrWaiver, LoanStatus::Active)
        };
        if self.status == target {
            return Ok(false);
        }

        self.status = self.status.transition(event)?;
        self.closed_on = self.status.is_closed().then_some(date);
        Ok(true)
    }

    /// Recomputes interest on installments starting on or after `date` from
    /// the principal still outstanding. Installments with interest already
    /// paid or waived keep their interest.
    pub fn recalculate_future_interest(&mut self, date: NaiveDate) {
        if !matches!(self.terms.interest_method, crate::loan::product::InterestMethod::DecliningBalance) {
            return;
        }
        let rate = self.terms.periodic_rate();
        let currency = self.currency();
        let count = self.installments.len();
        for k in 0..count {
            let installment = &self.installments[k];
            if installment.from_date < date
                || !installment.interest_paid.is_zero()
                || !installment.interest_waived.is_zero()
            {
                continue;
            }
            let balance: Decimal = self.installments[k..]
                .iter()
                .map(|i| i.principal - i.principal_completed)
                .sum();
            self.installments[k].interest_charged = currency.round(balance * rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{active_loan, date, money};
    use crate::loan::product::AccountingRule;
    use crate::loan::status::LoanStatus;
    use crate::transaction::record::LoanTransaction;
    use rust_decimal_macros::dec;

    #[test]
    fn test_back_dated_repayment_replaces_later_one() {
        let mut loan = active_loan(AccountingRule::None);
        let later = LoanTransaction::repayment(
            loan.loan_ref(),
            money(&loan, dec!(1055.82)),
            None,
            date(2, 1),
            loanbook_shared::types::ExternalId::parse("later"),
        )
        .unwrap();
        let later_id = later.id();
        assert!(loan.make_repayment(later, None, date(2, 1), false).unwrap().is_none());

        let earlier = LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(100)), None, date(1, 15), None)
            .unwrap();
        let changed = loan.make_repayment(earlier, None, date(2, 1), false).unwrap().unwrap();

        let replacement = changed.replacement_for(later_id).unwrap();
        assert_eq!(replacement.external_id().map(|e| e.as_str()), Some("later"));
        assert_eq!(replacement.principal_portion(), Some(dec!(965.38)));
        assert_eq!(replacement.interest_portion(), Some(dec!(90.44)));

        let original = loan.transaction(later_id).unwrap();
        assert!(original.is_reversed());
        assert_eq!(original.external_id(), None);
        assert_eq!(loan.status(), LoanStatus::Active);
    }

    #[test]
    fn test_back_dated_posting_with_same_amounts_changes_nothing() {
        let mut loan = active_loan(AccountingRule::None);
        let later =
            LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(50)), None, date(1, 20), None).unwrap();
        loan.make_repayment(later, None, date(1, 20), false).unwrap();

        // Interest of the first installment is 100, so both payments stay interest-only.
        let earlier =
            LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(50)), None, date(1, 10), None).unwrap();
        assert!(loan.make_repayment(earlier, None, date(1, 20), false).unwrap().is_none());
        assert_eq!(loan.transactions().iter().filter(|t| t.is_reversed()).count(), 0);
    }

    #[test]
    fn test_recalculate_future_interest_uses_remaining_principal() {
        let mut loan = active_loan(AccountingRule::None);
        let payment =
            LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(3000)), None, date(1, 20), None).unwrap();
        loan.make_repayment(payment, None, date(1, 20), false).unwrap();

        loan.recalculate_future_interest(date(2, 1));
        assert_eq!(loan.installments()[1].interest_charged, dec!(90.44));

        let remaining: rust_decimal::Decimal = loan.installments()[3..]
            .iter()
            .map(|i| i.principal - i.principal_completed)
            .sum();
        assert_eq!(loan.installments()[3].interest_charged, (remaining / dec!(100)).round_dp(2));
    }
}
