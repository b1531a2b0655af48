//! Monetary postings against a loan.

use chrono::NaiveDate;
use loanbook_shared::types::{ExternalId, LoanChargeId, LoanTransactionId, Money};
use rust_decimal::Decimal;

use super::Loan;
use super::replay::is_replayable;
use crate::error::{LoanError, TransactionAction};
use crate::loan::holiday::HolidayDetail;
use crate::loan::processor;
use crate::loan::status::{LoanEvent, LoanStatus};
use crate::transaction::changed::ChangedTransactionDetail;
use crate::transaction::record::LoanTransaction;

/// Accrued but unsettled income per component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceivableIncome {
    /// Interest.
    pub interest: Decimal,
    /// Fees.
    pub fee: Decimal,
    /// Penalties.
    pub penalty: Decimal,
}

impl Loan {
    // ========== Validation ==========

    fn require_status(&self, allowed: bool, transaction: &LoanTransaction) -> Result<(), LoanError> {
        if allowed {
            Ok(())
        } else {
            Err(LoanError::TransactionNotAllowed {
                status: self.status,
                transaction_type: transaction.transaction_type(),
            })
        }
    }

    /// Checks amount, dates and (when given) holidays for a new posting.
    pub(super) fn validate_posting(
        &self,
        transaction: &LoanTransaction,
        business_date: NaiveDate,
        holiday: Option<&HolidayDetail>,
    ) -> Result<(), LoanError> {
        if !transaction.is_greater_than_zero() {
            return Err(LoanError::validation(
                "loan.transaction",
                "transactionAmount",
                "must.be.greater.than.zero",
                Some(transaction.amount().to_string()),
            ));
        }
        self.validate_transaction_date(transaction.transaction_date(), business_date)?;
        if let Some(holiday) = holiday {
            holiday.validate(transaction.transaction_date())?;
        }
        Ok(())
    }

    /// Transaction date must not be after the business date nor before disbursement.
    pub fn validate_transaction_date(&self, date: NaiveDate, business_date: NaiveDate) -> Result<(), LoanError> {
        if date > business_date {
            return Err(LoanError::TransactionDateInFuture { date, business_date });
        }
        if let Some(disbursed_on) = self.disbursed_on
            && date < disbursed_on
        {
            return Err(LoanError::TransactionBeforeDisbursement { date, disbursed_on });
        }
        Ok(())
    }

    /// A repayment-type transaction (other than a charge refund) may not be
    /// created or reversed when a charge refund exists on a later date.
    pub fn validate_against_later_charge_refund(
        &self,
        transaction: &LoanTransaction,
        action: TransactionAction,
    ) -> Result<(), LoanError> {
        let kind = transaction.transaction_type();
        if !kind.is_repayment_type() || kind.is_charge_refund() {
            return Ok(());
        }
        let later_refund = self.transactions.iter().any(|t| {
            t.id() != transaction.id()
                && t.is_not_reversed()
                && t.transaction_type().is_charge_refund()
                && transaction.transaction_date() < t.transaction_date()
        });
        if later_refund {
            return Err(LoanError::LaterChargeRefundExists {
                transaction_id: transaction.id(),
                action,
            });
        }
        Ok(())
    }

    // ========== Repayments ==========

    /// Posts a repayment-type transaction (or a recovery repayment on a
    /// written-off loan).
    ///
    /// Back-dated postings replay history and return the transactions that
    /// were replaced. With `recalculate_interest`, interest of installments
    /// starting on or after the transaction date is recomputed afterwards.
    ///
    /// # Errors
    ///
    /// Fails on a status that does not accept repayments, invalid amount or
    /// dates, a holiday (when `holiday` is given) or a later charge refund.
    pub fn make_repayment(
        &mut self,
        transaction: LoanTransaction,
        holiday: Option<&HolidayDetail>,
        business_date: NaiveDate,
        recalculate_interest: bool,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        if transaction.transaction_type().is_recovery_repayment() {
            self.make_recovery_repayment(transaction, business_date)?;
            return Ok(None);
        }
        if !transaction.transaction_type().is_repayment_type() {
            return Err(LoanError::validation(
                "loan.transaction",
                "transactionType",
                "is.not.a.repayment.type",
                Some(transaction.transaction_type().display_code().to_string()),
            ));
        }
        self.require_status(self.status.is_servicing(), &transaction)?;
        self.validate_posting(&transaction, business_date, holiday)?;
        self.validate_against_later_charge_refund(&transaction, TransactionAction::Created)?;

        let date = transaction.transaction_date();
        let changed = self.post_monetary(transaction, None, business_date)?;
        if recalculate_interest {
            self.recalculate_future_interest(date);
        }
        self.refresh_status(date)?;
        Ok(changed)
    }

    /// Records money recovered after a write-off. Nothing is allocated.
    pub fn make_recovery_repayment(
        &mut self,
        transaction: LoanTransaction,
        business_date: NaiveDate,
    ) -> Result<(), LoanError> {
        self.require_status(self.status == LoanStatus::ClosedWrittenOff, &transaction)?;
        self.validate_posting(&transaction, business_date, None)?;
        self.transactions.push(transaction);
        Ok(())
    }

    // ========== Charges ==========

    /// Pays a specified-due-date charge.
    pub fn make_charge_payment(
        &mut self,
        loan_charge_id: LoanChargeId,
        transaction: LoanTransaction,
        holiday: Option<&HolidayDetail>,
        business_date: NaiveDate,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        self.require_status(self.status.is_servicing(), &transaction)?;
        self.validate_charge_payment(loan_charge_id, &transaction)?;
        self.validate_posting(&transaction, business_date, holiday)?;

        let date = transaction.transaction_date();
        let changed = self.post_monetary(transaction, Some(loan_charge_id), business_date)?;
        self.refresh_status(date)?;
        Ok(changed)
    }

    /// Pays a disbursement-time charge. No holiday rules apply and the
    /// schedule is untouched.
    pub fn pay_disbursement_charge(
        &mut self,
        loan_charge_id: LoanChargeId,
        mut transaction: LoanTransaction,
        business_date: NaiveDate,
    ) -> Result<(), LoanError> {
        self.require_status(self.status.is_servicing(), &transaction)?;
        self.validate_charge_payment(loan_charge_id, &transaction)?;
        self.validate_posting(&transaction, business_date, None)?;

        let currency = self.currency();
        let charge = self
            .charges
            .iter_mut()
            .find(|c| c.id() == loan_charge_id)
            .ok_or(LoanError::LoanChargeNotFound(loan_charge_id))?;
        if !charge.is_disbursement_charge() {
            return Err(LoanError::validation(
                "loan.charge",
                "chargeTimeType",
                "is.not.disbursement",
                Some(loan_charge_id.to_string()),
            ));
        }
        processor::allocate_disbursement_charge(charge, transaction.amount()).apply_to(&mut transaction, currency)?;
        self.transactions.push(transaction);
        Ok(())
    }

    fn validate_charge_payment(&self, loan_charge_id: LoanChargeId, transaction: &LoanTransaction) -> Result<(), LoanError> {
        let charge = self.charge(loan_charge_id)?;
        if !charge.is_active() || charge.is_paid() {
            return Err(LoanError::ChargeAlreadySettled(loan_charge_id));
        }
        if transaction.amount() > charge.amount_outstanding() {
            return Err(LoanError::ChargePaymentExceedsOutstanding {
                amount: transaction.amount(),
                outstanding: charge.amount_outstanding(),
            });
        }
        Ok(())
    }

    // ========== Refunds ==========

    /// Refunds part of the overpaid balance.
    pub fn make_refund(&mut self, transaction: LoanTransaction, business_date: NaiveDate) -> Result<(), LoanError> {
        self.refund_overpaid(transaction, business_date)
    }

    /// Pays the credit balance back to the borrower.
    pub fn credit_balance_refund(
        &mut self,
        transaction: LoanTransaction,
        business_date: NaiveDate,
    ) -> Result<(), LoanError> {
        self.refund_overpaid(transaction, business_date)
    }

    fn refund_overpaid(&mut self, transaction: LoanTransaction, business_date: NaiveDate) -> Result<(), LoanError> {
        self.require_status(self.status.is_overpaid(), &transaction)?;
        self.validate_posting(&transaction, business_date, None)?;
        let overpaid = self.total_overpaid();
        if transaction.amount() > overpaid {
            return Err(LoanError::RefundExceedsOverpaid {
                amount: transaction.amount(),
                overpaid,
            });
        }
        let date = transaction.transaction_date();
        self.transactions.push(transaction);
        self.refresh_status(date)?;
        Ok(())
    }

    /// Hands back payments made on an active loan, latest installment first.
    pub fn make_refund_for_active_loan(
        &mut self,
        transaction: LoanTransaction,
        holiday: Option<&HolidayDetail>,
        business_date: NaiveDate,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        self.require_status(self.status.is_active(), &transaction)?;
        self.validate_posting(&transaction, business_date, holiday)?;
        let paid = self.total_paid();
        if transaction.amount() > paid {
            return Err(LoanError::RefundExceedsPaid {
                amount: transaction.amount(),
                paid,
            });
        }
        let date = transaction.transaction_date();
        let changed = self.post_monetary(transaction, None, business_date)?;
        self.refresh_status(date)?;
        Ok(changed)
    }

    /// Disburses more money on a running loan. The part covered by the
    /// credit balance is booked as overpayment; the rest becomes principal
    /// due with the last installment.
    pub fn add_disbursement_transaction(
        &mut self,
        mut transaction: LoanTransaction,
        business_date: NaiveDate,
    ) -> Result<(), LoanError> {
        self.require_status(
            self.status.is_active() || self.status.is_overpaid(),
            &transaction,
        )?;
        if !transaction.transaction_type().is_disbursement() {
            return Err(LoanError::validation(
                "loan.transaction",
                "transactionType",
                "is.not.disbursement",
                Some(transaction.transaction_type().display_code().to_string()),
            ));
        }
        self.validate_posting(&transaction, business_date, None)?;

        let currency = self.currency();
        let from_credit = transaction.amount().min(self.total_overpaid());
        let new_principal = transaction.amount() - from_credit;
        transaction.set_over_payments(Money::of(currency, from_credit))?;
        if let Some(last) = self.installments.last_mut()
            && new_principal > Decimal::ZERO
        {
            last.principal += new_principal;
            last.obligations_met_on = None;
        }
        let date = transaction.transaction_date();
        self.transactions.push(transaction);
        let balance = self.principal_outstanding();
        if let Some(last) = self.transactions.last_mut() {
            last.update_outstanding_loan_balance(balance);
        }
        self.refresh_status(date)?;
        Ok(())
    }

    // ========== Waivers and write-off ==========

    /// Interest the borrower owes that has been accrued but not yet settled,
    /// as of `till`. Not floored: a negative figure means interest was paid
    /// ahead of its accrual.
    #[must_use]
    pub fn receivable_interest(&self, till: NaiveDate) -> Decimal {
        self.receivable_income(till).interest
    }

    /// Accrued income not yet settled, per component, as of `till`.
    #[must_use]
    pub fn receivable_income(&self, till: NaiveDate) -> ReceivableIncome {
        let mut receivable = ReceivableIncome::default();
        for t in self.transactions.iter().filter(|t| {
            t.is_not_reversed()
                && !t.transaction_type().is_disbursement()
                && !t.transaction_type().is_repayment_at_disbursement()
                && t.transaction_date() <= till
        }) {
            let kind = t.transaction_type();
            let interest = t.interest_portion().unwrap_or_default();
            let fee = t.fee_charges_portion().unwrap_or_default();
            let penalty = t.penalty_charges_portion().unwrap_or_default();
            if kind.is_accrual() {
                receivable.interest += interest;
                receivable.fee += fee;
                receivable.penalty += penalty;
            } else if kind.is_repayment_type() || kind.is_waive_interest() || kind.is_charge_payment() {
                receivable.interest -= interest;
                receivable.fee -= fee;
                receivable.penalty -= penalty;
            }
        }
        receivable
    }

    /// Part of an interest waiver that was never recognized as income.
    /// Always zero unless periodic accrual is on.
    #[must_use]
    pub fn unrecognized_waiver_income(&self, waived: Decimal, date: NaiveDate) -> Decimal {
        if !self.is_periodic_accrual() {
            return Decimal::ZERO;
        }
        (waived - self.receivable_interest(date)).max(Decimal::ZERO)
    }

    /// Waives outstanding interest.
    pub fn waive_interest(
        &mut self,
        transaction: LoanTransaction,
        business_date: NaiveDate,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        self.require_status(self.status.is_active(), &transaction)?;
        if !transaction.transaction_type().is_waive_interest() {
            return Err(LoanError::validation(
                "loan.transaction",
                "transactionType",
                "is.not.waive.interest",
                Some(transaction.transaction_type().display_code().to_string()),
            ));
        }
        self.validate_posting(&transaction, business_date, None)?;
        let outstanding = self.interest_outstanding();
        if transaction.amount() > outstanding {
            return Err(LoanError::WaiverExceedsOutstandingInterest {
                amount: transaction.amount(),
                outstanding,
            });
        }
        let date = transaction.transaction_date();
        let changed = self.post_monetary(transaction, None, business_date)?;
        self.refresh_status(date)?;
        Ok(changed)
    }

    /// Writes off everything outstanding and closes the loan.
    pub fn write_off(
        &mut self,
        date: NaiveDate,
        external_id: Option<ExternalId>,
        business_date: NaiveDate,
    ) -> Result<LoanTransactionId, LoanError> {
        let next = self.status.transition(LoanEvent::WrittenOff)?;
        self.validate_transaction_date(date, business_date)?;

        let currency = self.currency();
        let mut transaction = LoanTransaction::write_off(self.loan_ref(), date, external_id);
        let allocation = processor::allocate_write_off(&mut self.installments, &mut self.charges);
        allocation.apply_to(&mut transaction, currency)?;
        let zero = Money::zero(currency);
        transaction.update_components_and_total(zero, zero, zero, zero)?;
        transaction.update_outstanding_loan_balance(Decimal::ZERO);

        let id = transaction.id();
        self.transactions.push(transaction);
        self.status = next;
        self.written_off_on = Some(date);
        self.closed_on = Some(date);
        Ok(id)
    }

    // ========== Reversal ==========

    /// Reverses a transaction and replays history when it affected the schedule.
    ///
    /// # Errors
    ///
    /// Fails when the transaction does not exist or a later charge refund
    /// forbids reversing it.
    pub fn reverse_transaction(
        &mut self,
        transaction_id: LoanTransactionId,
        reversed_on: NaiveDate,
        reversal_external_id: Option<ExternalId>,
    ) -> Result<Option<ChangedTransactionDetail>, LoanError> {
        let transaction = self.transaction(transaction_id)?;
        if transaction.is_reversed() {
            return Ok(None);
        }
        self.validate_against_later_charge_refund(transaction, TransactionAction::Reversed)?;
        let replay = is_replayable(transaction.transaction_type());

        let index = self
            .transactions
            .iter()
            .position(|t| t.id() == transaction_id)
            .ok_or(LoanError::TransactionNotFound(transaction_id))?;
        let target = &mut self.transactions[index];
        target.reverse(reversed_on, reversal_external_id);
        target.mark_manually_adjusted();

        let changed = if replay {
            let changed = self.reprocess(None, reversed_on)?;
            (!changed.is_empty()).then_some(changed)
        } else {
            None
        };
        self.refresh_status(reversed_on)?;
        Ok(changed)
    }
}
