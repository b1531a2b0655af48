//! Early closure of a loan.

use chrono::NaiveDate;
use loanbook_shared::types::{LoanTransactionId, Money};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Loan, LoanSubStatus};
use crate::error::LoanError;
use crate::loan::schedule::RepaymentInstallment;
use crate::loan::status::LoanEvent;
use crate::transaction::allocation::{InstallmentMapping, LoanChargePaidBy};
use crate::transaction::record::LoanTransaction;

/// What the borrower must pay to close the loan on a given date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForeclosureDetail {
    /// All principal still outstanding.
    pub principal: Decimal,
    /// Interest outstanding on installments that started before the date.
    pub interest: Decimal,
    /// Fees outstanding on installments that started before the date.
    pub fee: Decimal,
    /// Penalties outstanding on installments that started before the date.
    pub penalty: Decimal,
}

impl ForeclosureDetail {
    /// Payoff amount.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.principal + self.interest + self.fee + self.penalty
    }
}

impl Loan {
    /// Payoff figures for closing the loan on `date`.
    #[must_use]
    pub fn fetch_foreclosure_detail(&self, date: NaiveDate) -> ForeclosureDetail {
        let mut detail = ForeclosureDetail {
            principal: self.principal_outstanding(),
            ..ForeclosureDetail::default()
        };
        for installment in self.installments.iter().filter(|i| i.from_date < date) {
            detail.interest += installment.interest_outstanding();
            detail.fee += installment.fee_charges_outstanding();
            detail.penalty += installment.penalty_charges_outstanding();
        }
        detail
    }

    /// Brings periodic accruals in line with a foreclosure on `date`.
    ///
    /// Accruals dated after `date` are reversed, then one accrual is posted
    /// for whatever the payoff charges beyond what is already receivable.
    /// Returns the accrual posted, if any. Does nothing unless periodic
    /// accrual is on and the watermark differs from `date`.
    pub fn foreclosure_accrual(
        &mut self,
        date: NaiveDate,
        business_date: NaiveDate,
    ) -> Result<Option<LoanTransactionId>, LoanError> {
        if !self.is_periodic_accrual() || self.accrued_till == Some(date) {
            return Ok(None);
        }
        let window_start = self.accrued_till.or(self.disbursed_on);
        self.reverse_accruals_after(date, business_date);

        let detail = self.fetch_foreclosure_detail(date);
        let receivable = self.receivable_income(date);
        let interest = (detail.interest - receivable.interest).max(Decimal::ZERO);
        let fee = (detail.fee - receivable.fee).max(Decimal::ZERO);
        let penalty = (detail.penalty - receivable.penalty).max(Decimal::ZERO);
        let total = interest + fee + penalty;
        if total <= Decimal::ZERO {
            return Ok(None);
        }

        let currency = self.currency();
        let mut transaction = LoanTransaction::accrual(
            self.loan_ref(),
            date,
            Money::of(currency, total),
            Some(interest),
            Some(fee),
            Some(penalty),
            None,
        )?;

        let installment_number = self
            .installments
            .iter()
            .rev()
            .find(|i| i.from_date < date)
            .map(|i| i.number);
        for charge in self.charges.iter_mut().filter(|c| {
            c.is_active()
                && !c.is_paid()
                && window_start.is_some_and(|start| c.is_due_for_collection_from_and_up_to_and_including(start, date))
        }) {
            let amount = charge.amount() - charge.amount_unrecognized() - charge.amount_accrued();
            if amount <= Decimal::ZERO {
                continue;
            }
            charge.add_accrued(amount);
            transaction.add_charge_paid_by(LoanChargePaidBy {
                loan_charge_id: charge.id(),
                charge_id: charge.charge_id(),
                amount,
                installment_number,
                is_penalty: charge.is_penalty(),
            });
        }
        if let Some(number) = installment_number {
            transaction.add_installment_mapping(InstallmentMapping {
                installment_number: number,
                principal: Decimal::ZERO,
                interest,
                fee_charges: fee,
                penalty_charges: penalty,
            });
            if let Some(installment) = self.installments.iter_mut().find(|i| i.number == number) {
                installment.interest_accrued += interest;
                installment.fee_accrued += fee;
                installment.penalty_accrued += penalty;
            }
        }

        let id = transaction.id();
        self.transactions.push(transaction);
        self.accrued_till = Some(date);
        Ok(Some(id))
    }

    /// Closes the loan early on `date`.
    ///
    /// Interest, fees and penalties of installments starting on or after
    /// `date` are dropped, the payoff (if any) is applied and the loan is
    /// closed with sub-status foreclosed.
    ///
    /// # Errors
    ///
    /// Fails when the status does not allow foreclosure, the date is invalid
    /// or the payoff cannot be applied.
    pub fn handle_foreclosure(
        &mut self,
        date: NaiveDate,
        payoff: Option<LoanTransaction>,
        business_date: NaiveDate,
    ) -> Result<Option<LoanTransactionId>, LoanError> {
        let next = self.status.transition(LoanEvent::ForeClosure)?;
        self.validate_transaction_date(date, business_date)?;

        for installment in self.installments.iter_mut().filter(|i| i.from_date >= date) {
            drop_future_income(installment);
        }
        let future_installments: Vec<(NaiveDate, NaiveDate, bool)> = self
            .installments
            .iter()
            .filter(|i| i.from_date >= date)
            .map(|i| (i.from_date, i.due_date, i.number == 1))
            .collect();
        for charge in &mut self.charges {
            if !charge.is_disbursement_charge()
                && !charge.is_paid()
                && future_installments
                    .iter()
                    .any(|&(from, to, first)| charge.is_due_in_installment(from, to, first))
            {
                charge.deactivate();
            }
        }

        let payoff_id = match payoff {
            Some(transaction) if transaction.is_greater_than_zero() => {
                let id = transaction.id();
                self.post_monetary(transaction, None, business_date)?;
                Some(id)
            }
            _ => None,
        };

        self.status = next;
        self.sub_status = Some(LoanSubStatus::ForeClosed);
        self.closed_on = Some(date);
        Ok(payoff_id)
    }
}

fn drop_future_income(installment: &mut RepaymentInstallment) {
    installment.interest_charged =
        installment.interest_paid + installment.interest_waived + installment.interest_written_off;
    installment.fee_charges_charged =
        installment.fee_charges_paid + installment.fee_charges_waived + installment.fee_charges_written_off;
    installment.penalty_charges_charged = installment.penalty_charges_paid
        + installment.penalty_charges_waived
        + installment.penalty_charges_written_off;
}

#[cfg(test)]
mod tests {
    use super::super::tests::{active_loan, date, money};
    use super::*;
    use crate::loan::charge::LoanCharge;
    use crate::loan::product::AccountingRule;
    use crate::loan::status::LoanStatus;
    use loanbook_shared::types::ChargeId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_detail_counts_only_started_installments() {
        let loan = active_loan(AccountingRule::None);
        let detail = loan.fetch_foreclosure_detail(date(1, 15));
        assert_eq!(detail.principal, dec!(10000));
        assert_eq!(detail.interest, dec!(100));
        assert_eq!(detail.total(), dec!(10100));

        let on_disbursement = loan.fetch_foreclosure_detail(date(1, 1));
        assert_eq!(on_disbursement.interest, dec!(0));
    }

    #[test]
    fn test_handle_foreclosure_closes_loan() {
        let mut loan = active_loan(AccountingRule::None);
        let fee = LoanCharge::specified_due_date(ChargeId::new(), "fee", dec!(20), date(3, 10), false);
        let fee_id = loan.add_charge(fee).unwrap();

        let detail = loan.fetch_foreclosure_detail(date(1, 15));
        let payoff =
            LoanTransaction::repayment(loan.loan_ref(), money(&loan, detail.total()), None, date(1, 15), None).unwrap();
        let payoff_id = loan.handle_foreclosure(date(1, 15), Some(payoff), date(1, 15)).unwrap();

        assert!(payoff_id.is_some());
        assert_eq!(loan.status(), LoanStatus::ClosedObligationsMet);
        assert_eq!(loan.sub_status(), Some(LoanSubStatus::ForeClosed));
        assert_eq!(loan.closed_on(), Some(date(1, 15)));
        assert_eq!(loan.total_outstanding(), dec!(0));
        assert!(loan.installments()[1..].iter().all(|i| i.interest_charged.is_zero()));
        assert!(!loan.charge(fee_id).unwrap().is_active());
    }

    #[test]
    fn test_foreclosure_without_payoff() {
        let mut loan = active_loan(AccountingRule::None);
        let payoff_id = loan.handle_foreclosure(date(1, 10), None, date(1, 10)).unwrap();
        assert_eq!(payoff_id, None);
        assert_eq!(loan.status(), LoanStatus::ClosedObligationsMet);
    }

    #[test]
    fn test_foreclosure_rejected_when_not_active() {
        let mut loan = active_loan(AccountingRule::None);
        loan.write_off(date(1, 5), None, date(1, 5)).unwrap();
        assert!(matches!(
            loan.handle_foreclosure(date(1, 10), None, date(1, 10)),
            Err(LoanError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_foreclosure_accrual_posts_receivable_delta() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        let penalty = LoanCharge::specified_due_date(ChargeId::new(), "late", dec!(10), date(1, 10), true);
        let penalty_id = loan.add_charge(penalty).unwrap();

        let accrual_id = loan.foreclosure_accrual(date(1, 15), date(1, 15)).unwrap().unwrap();
        let accrual = loan.transaction(accrual_id).unwrap();
        assert_eq!(accrual.interest_portion(), Some(dec!(100)));
        assert_eq!(accrual.penalty_charges_portion(), Some(dec!(10)));
        assert_eq!(accrual.loan_charges_paid().len(), 1);
        assert_eq!(loan.charge(penalty_id).unwrap().amount_accrued(), dec!(10));
        assert_eq!(loan.accrued_till(), Some(date(1, 15)));

        assert_eq!(loan.foreclosure_accrual(date(1, 15), date(1, 15)).unwrap(), None);
    }

    #[test]
    fn test_foreclosure_accrual_skipped_without_periodic_accrual() {
        let mut loan = active_loan(AccountingRule::Cash);
        assert_eq!(loan.foreclosure_accrual(date(1, 15), date(1, 15)).unwrap(), None);
    }
}
