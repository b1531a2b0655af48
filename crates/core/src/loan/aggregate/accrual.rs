//! Accrual inputs and effects on the loan.

use chrono::NaiveDate;
use loanbook_shared::types::{LoanTransactionId, Money};
use rust_decimal::Decimal;

use super::Loan;
use crate::accrual::types::{AccrualPosting, ApplicableCharge, LoanScheduleAccrualData, WaiverIncome};
use crate::error::LoanError;
use crate::loan::schedule::RepaymentInstallment;
use crate::transaction::allocation::{InstallmentMapping, LoanChargePaidBy};
use crate::transaction::record::LoanTransaction;

impl Loan {
    fn accrual_data_for(&self, installment: &RepaymentInstallment) -> LoanScheduleAccrualData {
        let first = installment.number == 1;
        let applicable_charges = self
            .charges
            .iter()
            .filter(|c| {
                c.is_active()
                    && !c.is_disbursement_charge()
                    && c.is_due_in_installment(installment.from_date, installment.due_date, first)
            })
            .filter_map(|c| {
                c.due_date().map(|due_date| ApplicableCharge {
                    loan_charge_id: c.id(),
                    charge_id: c.charge_id(),
                    is_penalty: c.is_penalty(),
                    due_date,
                    income: c.amount() - c.amount_unrecognized(),
                    accrued: c.amount_accrued(),
                })
            })
            .collect();

        LoanScheduleAccrualData {
            loan_id: self.id,
            office_id: self.office_id,
            product_id: self.terms.product_id,
            installment_number: installment.number,
            from_date: installment.from_date,
            due_date: installment.due_date,
            accrued_till: self.accrued_till,
            interest_calculated_from: self.interest_calculated_from,
            currency: self.terms.currency,
            interest_income: installment.interest_charged,
            accrued_interest_income: installment.interest_accrued,
            accrued_fee_income: installment.fee_accrued,
            accrued_penalty_income: installment.penalty_accrued,
            waived_interest_income: installment.interest_waived,
            applicable_charges,
            accruable_interest: None,
        }
    }

    /// Accrual view of every installment.
    #[must_use]
    pub fn accrual_data(&self) -> Vec<LoanScheduleAccrualData> {
        self.installments.iter().map(|i| self.accrual_data_for(i)).collect()
    }

    /// Accrual view of the installments that started before `till`.
    #[must_use]
    pub fn accrual_data_till(&self, till: NaiveDate) -> Vec<LoanScheduleAccrualData> {
        self.installments
            .iter()
            .filter(|i| i.from_date < till)
            .map(|i| self.accrual_data_for(i))
            .collect()
    }

    /// Interest waivers in date order with their recognized split.
    #[must_use]
    pub fn waiver_incomes(&self) -> Vec<WaiverIncome> {
        let mut waivers: Vec<&LoanTransaction> = self
            .transactions
            .iter()
            .filter(|t| t.is_not_reversed() && t.transaction_type().is_waive_interest())
            .collect();
        waivers.sort_by(|a, b| (a.transaction_date(), a.submitted_on()).cmp(&(b.transaction_date(), b.submitted_on())));
        waivers
            .into_iter()
            .map(|t| WaiverIncome {
                date: t.transaction_date(),
                recognized: t.interest_portion().unwrap_or_default(),
                unrecognized: t.unrecognized_income_portion().unwrap_or_default(),
            })
            .collect()
    }

    /// Posts one accrual: the ACCRUAL record, its charge allocations, the
    /// installment running totals and the watermark.
    ///
    /// # Errors
    ///
    /// Fails when the installment does not exist or the amounts cannot be
    /// expressed in the loan currency.
    pub fn apply_accrual(&mut self, posting: AccrualPosting) -> Result<LoanTransactionId, LoanError> {
        let currency = self.currency();
        let index = self
            .installments
            .iter()
            .position(|i| i.number == posting.installment_number)
            .ok_or_else(|| {
                LoanError::validation(
                    "loan.accrual",
                    "installmentNumber",
                    "is.invalid",
                    Some(posting.installment_number.to_string()),
                )
            })?;

        let mut transaction = LoanTransaction::accrual(
            self.loan_ref(),
            posting.date,
            Money::of(currency, posting.amount()),
            posting.interest,
            posting.fee,
            posting.penalty,
            None,
        )?;
        transaction.add_installment_mapping(InstallmentMapping {
            installment_number: posting.installment_number,
            principal: Decimal::ZERO,
            interest: posting.interest.unwrap_or_default(),
            fee_charges: posting.fee.unwrap_or_default(),
            penalty_charges: posting.penalty.unwrap_or_default(),
        });

        for (applicable, amount) in &posting.charges {
            if let Some(charge) = self.charges.iter_mut().find(|c| c.id() == applicable.loan_charge_id) {
                charge.add_accrued(*amount);
            }
            transaction.add_charge_paid_by(LoanChargePaidBy {
                loan_charge_id: applicable.loan_charge_id,
                charge_id: applicable.charge_id,
                amount: *amount,
                installment_number: Some(posting.installment_number),
                is_penalty: applicable.is_penalty,
            });
        }

        let installment = &mut self.installments[index];
        installment.interest_accrued = posting.interest_total;
        installment.fee_accrued = posting.fee_total;
        installment.penalty_accrued = posting.penalty_total;

        if self.accrued_till.is_none_or(|till| till < posting.accrued_till) {
            self.accrued_till = Some(posting.accrued_till);
        }
        let id = transaction.id();
        self.transactions.push(transaction);
        Ok(id)
    }

    /// Reverses every accrual dated after `date` and rolls the installment
    /// and charge accrual figures back. Returns the reversed ids.
    pub fn reverse_accruals_after(&mut self, date: NaiveDate, reversed_on: NaiveDate) -> Vec<LoanTransactionId> {
        let mut reversed = Vec::new();
        for transaction in self
            .transactions
            .iter_mut()
            .filter(|t| t.is_active_accrual() && t.transaction_date() > date)
        {
            for mapping in transaction.installment_mappings() {
                if let Some(installment) = self
                    .installments
                    .iter_mut()
                    .find(|i| i.number == mapping.installment_number)
                {
                    installment.interest_accrued -= mapping.interest;
                    installment.fee_accrued -= mapping.fee_charges;
                    installment.penalty_accrued -= mapping.penalty_charges;
                }
            }
            for paid_by in transaction.loan_charges_paid() {
                if let Some(charge) = self.charges.iter_mut().find(|c| c.id() == paid_by.loan_charge_id) {
                    charge.add_accrued(-paid_by.amount);
                }
            }
            transaction.reverse(reversed_on, None);
            reversed.push(transaction.id());
        }
        if self.accrued_till.is_some_and(|till| till > date) {
            self.accrued_till = Some(date);
        }
        reversed
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{active_loan, date};
    use super::*;
    use crate::loan::charge::LoanCharge;
    use crate::loan::product::AccountingRule;
    use loanbook_shared::types::ChargeId;
    use rust_decimal_macros::dec;

    fn posting(loan: &Loan, number: u32, day: NaiveDate, interest: Decimal) -> AccrualPosting {
        let charges = loan
            .accrual_data()
            .into_iter()
            .find(|d| d.installment_number == number)
            .map(|d| d.applicable_charges)
            .unwrap_or_default();
        let fee: Decimal = charges.iter().map(ApplicableCharge::amount_to_accrue).sum();
        AccrualPosting {
            installment_number: number,
            date: day,
            interest: Some(interest),
            fee: (!fee.is_zero()).then_some(fee),
            penalty: None,
            interest_total: interest,
            fee_total: fee,
            penalty_total: Decimal::ZERO,
            charges: charges.into_iter().map(|c| {
                let amount = c.amount_to_accrue();
                (c, amount)
            }).collect(),
            accrued_till: day,
        }
    }

    #[test]
    fn test_accrual_data_carries_window_charges() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        loan.add_charge(LoanCharge::specified_due_date(ChargeId::new(), "fee", dec!(15), date(2, 10), false))
            .unwrap();

        let data = loan.accrual_data_till(date(2, 15));
        assert_eq!(data.len(), 2);
        assert!(data[0].applicable_charges.is_empty());
        assert_eq!(data[1].applicable_charges.len(), 1);
        assert_eq!(data[1].interest_income, loan.installments()[1].interest_charged);
        assert_eq!(data[1].applicable_charges[0].amount_to_accrue(), dec!(15));
    }

    #[test]
    fn test_apply_then_reverse_accrual() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        let fee_id = loan
            .add_charge(LoanCharge::specified_due_date(ChargeId::new(), "fee", dec!(15), date(1, 20), false))
            .unwrap();

        let id = loan.apply_accrual(posting(&loan, 1, date(1, 25), dec!(80))).unwrap();
        let accrual = loan.transaction(id).unwrap();
        assert_eq!(accrual.amount(), dec!(95));
        assert_eq!(accrual.loan_charges_paid().len(), 1);
        assert_eq!(loan.installments()[0].interest_accrued, dec!(80));
        assert_eq!(loan.installments()[0].fee_accrued, dec!(15));
        assert_eq!(loan.charge(fee_id).unwrap().amount_accrued(), dec!(15));
        assert_eq!(loan.accrued_till(), Some(date(1, 25)));
        assert_eq!(loan.receivable_interest(date(1, 31)), dec!(80));

        let reversed = loan.reverse_accruals_after(date(1, 20), date(1, 26));
        assert_eq!(reversed, vec![id]);
        assert!(loan.transaction(id).unwrap().is_reversed());
        assert_eq!(loan.installments()[0].interest_accrued, dec!(0));
        assert_eq!(loan.charge(fee_id).unwrap().amount_accrued(), dec!(0));
        assert_eq!(loan.accrued_till(), Some(date(1, 20)));
    }

    #[test]
    fn test_apply_accrual_rejects_unknown_installment() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        let err = loan.apply_accrual(posting(&loan, 42, date(1, 25), dec!(1))).unwrap_err();
        assert_eq!(err.parameter(), Some("installmentNumber"));
    }

    #[test]
    fn test_waiver_incomes_in_date_order() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        for (day, unrecognized) in [(date(1, 20), dec!(5)), (date(1, 10), dec!(0))] {
            let waiver = LoanTransaction::waiver(
                loan.loan_ref(),
                Money::of(loan.currency(), dec!(10)),
                day,
                Money::of(loan.currency(), unrecognized),
                None,
            )
            .unwrap();
            loan.waive_interest(waiver, date(1, 20)).unwrap();
        }
        let incomes = loan.waiver_incomes();
        assert_eq!(incomes.len(), 2);
        assert_eq!(incomes[0].date, date(1, 10));
        assert_eq!(incomes[0].recognized, dec!(10));
        assert_eq!(incomes[1].recognized, dec!(5));
        assert_eq!(incomes[1].unrecognized, dec!(5));
    }
}
