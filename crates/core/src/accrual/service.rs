//! Accrual service.
//!
//! Turns a loan's accrual view into ACCRUAL transactions on the loan. The
//! service owns no state; persistence and journal posting happen in the
//! orchestration layer around it.

use chrono::NaiveDate;
use loanbook_shared::types::{LoanId, LoanTransactionId};
use tracing::{debug, error};

use super::income::{full_schedule_posting, periodic_posting, update_interest_income};
use super::types::{AccrualBatchError, AccrualPosting, LoanScheduleAccrualData};
use crate::error::LoanError;
use crate::loan::aggregate::Loan;
use crate::loan::product::AccountingRule;
use crate::transaction::bridge::{AccountingBridgeData, LoanTransactionBridgeData};

/// Accrual computation service.
pub struct AccrualService;

impl AccrualService {
    /// Accrues the whole schedule, one ACCRUAL per installment dated on its
    /// due date. Returns the posted transaction ids.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` if a posting cannot be applied to the loan.
    pub fn add_accrual_accounting(loan: &mut Loan) -> Result<Vec<LoanTransactionId>, LoanError> {
        let mut data = loan.accrual_data();
        update_interest_income(&mut data, &loan.waiver_incomes());
        let postings: Vec<AccrualPosting> = data.iter().filter_map(full_schedule_posting).collect();
        Self::apply(loan, postings)
    }

    /// Accrues income earned up to `till`.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` if a posting cannot be applied to the loan.
    pub fn add_periodic_accruals(till: NaiveDate, loan: &mut Loan) -> Result<Vec<LoanTransactionId>, LoanError> {
        let data = Self::periodic_data(till, loan);
        let postings: Vec<AccrualPosting> = data.iter().filter_map(|item| periodic_posting(item, till)).collect();
        if postings.is_empty() {
            debug!(loan_id = %loan.id(), %till, "nothing to accrue");
        }
        Self::apply(loan, postings)
    }

    /// Runs [`Self::add_periodic_accruals`] over several loans. A failing
    /// loan does not stop the others; all failures come back together.
    ///
    /// # Errors
    ///
    /// Returns `AccrualBatchError` listing every loan that failed.
    pub fn add_periodic_accruals_for_loans(
        till: NaiveDate,
        loans: &mut [Loan],
    ) -> Result<Vec<(LoanId, Vec<LoanTransactionId>)>, AccrualBatchError> {
        let mut posted = Vec::with_capacity(loans.len());
        let mut failures = Vec::new();
        for loan in loans.iter_mut() {
            match Self::add_periodic_accruals(till, loan) {
                Ok(ids) => posted.push((loan.id(), ids)),
                Err(err) => {
                    error!(loan_id = %loan.id(), %till, error = %err, "periodic accrual failed");
                    failures.push((loan.id(), err));
                }
            }
        }
        if failures.is_empty() {
            Ok(posted)
        } else {
            Err(AccrualBatchError { failures })
        }
    }

    /// Journal payload for accruals just posted, tagged periodic-accrual.
    #[must_use]
    pub fn accrual_bridge(loan: &Loan, posted: &[LoanTransactionId]) -> AccountingBridgeData {
        let transactions = loan
            .transactions()
            .iter()
            .filter(|t| posted.contains(&t.id()))
            .map(LoanTransactionBridgeData::from)
            .collect();
        loan.bridge_with(AccountingRule::AccrualPeriodic, false, transactions)
    }

    fn periodic_data(till: NaiveDate, loan: &Loan) -> Vec<LoanScheduleAccrualData> {
        let mut data = loan.accrual_data_till(till);
        update_interest_income(&mut data, &loan.waiver_incomes());
        data
    }

    fn apply(loan: &mut Loan, postings: Vec<AccrualPosting>) -> Result<Vec<LoanTransactionId>, LoanError> {
        let mut ids = Vec::with_capacity(postings.len());
        for posting in postings {
            debug!(
                loan_id = %loan.id(),
                installment = posting.installment_number,
                date = %posting.date,
                amount = %posting.amount(),
                "posting accrual"
            );
            ids.push(loan.apply_accrual(posting)?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::aggregate::tests::{active_loan, date, money};
    use crate::loan::charge::LoanCharge;
    use crate::transaction::record::LoanTransaction;
    use loanbook_shared::types::ChargeId;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_periodic_accrual_is_idempotent() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        loan.add_charge(LoanCharge::specified_due_date(ChargeId::new(), "fee", dec!(12), date(2, 5), false))
            .unwrap();

        let first = AccrualService::add_periodic_accruals(date(2, 16), &mut loan).unwrap();
        assert_eq!(first.len(), 2);
        let full = loan.transaction(first[0]).unwrap();
        assert_eq!(full.transaction_date(), date(2, 1));
        assert_eq!(full.interest_portion(), Some(dec!(100)));
        let partial = loan.transaction(first[1]).unwrap();
        assert_eq!(partial.transaction_date(), date(2, 16));
        assert_eq!(partial.fee_charges_portion(), Some(dec!(12)));
        assert_eq!(loan.accrued_till(), Some(date(2, 16)));

        let second = AccrualService::add_periodic_accruals(date(2, 16), &mut loan).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_later_run_tops_up_partial_period() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        AccrualService::add_periodic_accruals(date(2, 16), &mut loan).unwrap();
        let before = loan.installments()[1].interest_accrued;

        let ids = AccrualService::add_periodic_accruals(date(3, 1), &mut loan).unwrap();
        assert_eq!(ids.len(), 1);
        let top_up = loan.transaction(ids[0]).unwrap();
        assert_eq!(top_up.transaction_date(), date(3, 1));
        assert_eq!(
            before + top_up.interest_portion().unwrap_or_default(),
            loan.installments()[1].interest_charged
        );
    }

    #[test]
    fn test_full_schedule_accrual() {
        let mut loan = active_loan(AccountingRule::AccrualUpfront);
        let ids = AccrualService::add_accrual_accounting(&mut loan).unwrap();
        assert_eq!(ids.len(), 10);
        let total: Decimal = loan
            .transactions()
            .iter()
            .filter(|t| t.is_active_accrual())
            .map(LoanTransaction::amount)
            .sum();
        let charged: Decimal = loan.installments().iter().map(|i| i.interest_charged).sum();
        assert_eq!(total, charged);
        assert!(AccrualService::add_accrual_accounting(&mut loan).unwrap().is_empty());
    }

    #[test]
    fn test_unrecognized_waiver_is_not_accrued() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        let waiver =
            LoanTransaction::waiver(loan.loan_ref(), money(&loan, dec!(40)), date(1, 10), money(&loan, dec!(40)), None)
                .unwrap();
        loan.waive_interest(waiver, date(1, 10)).unwrap();

        let ids = AccrualService::add_periodic_accruals(date(2, 1), &mut loan).unwrap();
        let accrual = loan.transaction(ids[0]).unwrap();
        assert_eq!(accrual.interest_portion(), Some(dec!(60)));
    }

    #[test]
    fn test_batch_collects_failures() {
        let mut loans = vec![active_loan(AccountingRule::AccrualPeriodic), active_loan(AccountingRule::AccrualPeriodic)];
        let posted = AccrualService::add_periodic_accruals_for_loans(date(1, 20), &mut loans).unwrap();
        assert_eq!(posted.len(), 2);
        assert!(posted.iter().all(|(_, ids)| ids.len() == 1));

        let err = AccrualBatchError {
            failures: vec![(loans[0].id(), LoanError::LoanNotFound(loans[0].id()))],
        };
        let converted: LoanError = err.into();
        assert_eq!(converted.error_code(), "error.msg.accrual.exception");
        assert!(converted.to_string().starts_with("accrual failed for 1 loan(s)"));
    }

    #[test]
    fn test_bridge_is_tagged_periodic() {
        let mut loan = active_loan(AccountingRule::AccrualPeriodic);
        let ids = AccrualService::add_periodic_accruals(date(1, 20), &mut loan).unwrap();
        let bridge = AccrualService::accrual_bridge(&loan, &ids);
        assert!(bridge.periodic_accrual_based_accounting_enabled);
        assert_eq!(bridge.new_loan_transactions.len(), 1);
    }
}
