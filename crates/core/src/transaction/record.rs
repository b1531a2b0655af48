//! Loan transaction record.
//!
//! Records are created only through the named factories below and change
//! only through the component operations. Component deltas accumulate; an
//! explicit [`LoanTransaction::reset_derived_components`] is the only way to
//! clear them. A component whose value is exactly zero is stored as `None`.

use chrono::{DateTime, NaiveDate, Utc};
use loanbook_shared::types::{
    ExternalId, LoanId, LoanTransactionId, MonetaryCurrency, Money, MoneyError, OfficeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanError;
use crate::transaction::allocation::{
    ChargeRefundChargeType, InstallmentMapping, LoanChargePaidBy, PaymentDetail,
    TransactionRelation, TransactionRelationType,
};
use crate::transaction::types::LoanTransactionType;

/// The owning loan as seen by a transaction factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanRef {
    /// Loan identifier.
    pub loan_id: LoanId,
    /// Office the loan belongs to.
    pub office_id: OfficeId,
    /// Loan currency.
    pub currency: MonetaryCurrency,
}

/// A single financial (or marker) event posted against a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTransaction {
    id: LoanTransactionId,
    loan_id: LoanId,
    office_id: OfficeId,
    transaction_type: LoanTransactionType,
    transaction_date: NaiveDate,
    submitted_on: DateTime<Utc>,
    currency: MonetaryCurrency,
    amount: Decimal,
    principal_portion: Option<Decimal>,
    interest_portion: Option<Decimal>,
    fee_charges_portion: Option<Decimal>,
    penalty_charges_portion: Option<Decimal>,
    overpayment_portion: Option<Decimal>,
    unrecognized_income_portion: Option<Decimal>,
    outstanding_loan_balance: Option<Decimal>,
    reversed: bool,
    reversed_on: Option<NaiveDate>,
    reversal_external_id: Option<ExternalId>,
    external_id: Option<ExternalId>,
    manually_adjusted_or_reversed: bool,
    payment_detail: Option<PaymentDetail>,
    charge_refund_charge_type: Option<ChargeRefundChargeType>,
    loan_charges_paid: Vec<LoanChargePaidBy>,
    installment_mappings: Vec<InstallmentMapping>,
    relations: Vec<TransactionRelation>,
}

fn none_if_zero(value: Decimal) -> Option<Decimal> {
    if value.is_zero() { None } else { Some(value) }
}

impl LoanTransaction {
    fn new(
        loan: LoanRef,
        transaction_type: LoanTransactionType,
        amount: Decimal,
        transaction_date: NaiveDate,
        payment_detail: Option<PaymentDetail>,
        external_id: Option<ExternalId>,
    ) -> Self {
        Self {
            id: LoanTransactionId::new(),
            loan_id: loan.loan_id,
            office_id: loan.office_id,
            transaction_type,
            transaction_date,
            submitted_on: Utc::now(),
            currency: loan.currency,
            amount: loan.currency.round(amount),
            principal_portion: None,
            interest_portion: None,
            fee_charges_portion: None,
            penalty_charges_portion: None,
            overpayment_portion: None,
            unrecognized_income_portion: None,
            outstanding_loan_balance: None,
            reversed: false,
            reversed_on: None,
            reversal_external_id: None,
            external_id,
            manually_adjusted_or_reversed: false,
            payment_detail,
            charge_refund_charge_type: None,
            loan_charges_paid: Vec::new(),
            installment_mappings: Vec::new(),
            relations: Vec::new(),
        }
    }

    fn checked(loan: LoanRef, amount: Money) -> Result<Decimal, LoanError> {
        if amount.currency().code != loan.currency.code {
            return Err(MoneyError::CurrencyMismatch {
                expected: loan.currency.code,
                actual: amount.currency().code,
            }
            .into());
        }
        Ok(amount.amount())
    }

    // ========== Factories ==========

    /// Disbursement of `amount`.
    pub fn disbursement(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(
            loan,
            LoanTransactionType::Disbursement,
            amount,
            date,
            payment_detail,
            external_id,
        ))
    }

    /// Plain repayment.
    pub fn repayment(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        Self::repayment_type(
            LoanTransactionType::Repayment,
            loan,
            amount,
            payment_detail,
            date,
            external_id,
            None,
        )
    }

    /// Any repayment-type transaction. Charge refunds carry the bucket they credit.
    pub fn repayment_type(
        transaction_type: LoanTransactionType,
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
        charge_refund_charge_type: Option<ChargeRefundChargeType>,
    ) -> Result<Self, LoanError> {
        if !transaction_type.is_repayment_type() {
            return Err(LoanError::validation(
                "loan.transaction",
                "transactionType",
                "is.not.a.repayment.type",
                Some(transaction_type.display_code().to_string()),
            ));
        }
        let amount = Self::checked(loan, amount)?;
        let mut transaction = Self::new(loan, transaction_type, amount, date, payment_detail, external_id);
        transaction.charge_refund_charge_type = charge_refund_charge_type;
        Ok(transaction)
    }

    /// Repayment received on a written-off loan.
    pub fn recovery_repayment(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(
            loan,
            LoanTransactionType::RecoveryRepayment,
            amount,
            date,
            payment_detail,
            external_id,
        ))
    }

    /// Repayment collected at disbursement.
    pub fn repayment_at_disbursement(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(
            loan,
            LoanTransactionType::RepaymentAtDisbursement,
            amount,
            date,
            payment_detail,
            external_id,
        ))
    }

    /// Payment of a specific charge.
    pub fn charge_payment(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(
            loan,
            LoanTransactionType::ChargePayment,
            amount,
            date,
            payment_detail,
            external_id,
        ))
    }

    /// Interest waiver. `unrecognized` is the part of the waiver that was
    /// never accrued as income.
    pub fn waiver(
        loan: LoanRef,
        waived: Money,
        date: NaiveDate,
        unrecognized: Money,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, waived)?;
        let unrecognized = Self::checked(loan, unrecognized)?;
        let mut transaction = Self::new(
            loan,
            LoanTransactionType::WaiveInterest,
            amount,
            date,
            None,
            external_id,
        );
        transaction.interest_portion = none_if_zero(amount);
        transaction.unrecognized_income_portion = none_if_zero(unrecognized);
        Ok(transaction)
    }

    /// Charge waiver with its fee/penalty split.
    pub fn waive_charges(
        loan: LoanRef,
        waived: Money,
        date: NaiveDate,
        fee_waived: Money,
        penalty_waived: Money,
        unrecognized: Money,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, waived)?;
        let mut transaction = Self::new(
            loan,
            LoanTransactionType::WaiveCharges,
            amount,
            date,
            None,
            None,
        );
        transaction.update_components(
            Money::zero(loan.currency),
            Money::zero(loan.currency),
            fee_waived,
            penalty_waived,
        )?;
        transaction.unrecognized_income_portion = none_if_zero(Self::checked(loan, unrecognized)?);
        Ok(transaction)
    }

    /// Income accrual. Portions may be negative when an earlier pass over-accrued.
    pub fn accrual(
        loan: LoanRef,
        date: NaiveDate,
        amount: Money,
        interest: Option<Decimal>,
        fee: Option<Decimal>,
        penalty: Option<Decimal>,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        let mut transaction = Self::new(loan, LoanTransactionType::Accrual, amount, date, None, external_id);
        transaction.interest_portion = interest.and_then(none_if_zero);
        transaction.fee_charges_portion = fee.and_then(none_if_zero);
        transaction.penalty_charges_portion = penalty.and_then(none_if_zero);
        Ok(transaction)
    }

    /// Write-off; the loan fills in components with what it writes off.
    #[must_use]
    pub fn write_off(loan: LoanRef, date: NaiveDate, external_id: Option<ExternalId>) -> Self {
        Self::new(loan, LoanTransactionType::WriteOff, Decimal::ZERO, date, None, external_id)
    }

    /// Refund of an overpaid balance.
    pub fn refund(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(loan, LoanTransactionType::Refund, amount, date, payment_detail, external_id))
    }

    /// Refund of payments made on an active loan.
    pub fn refund_for_active_loan(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(
            loan,
            LoanTransactionType::RefundForActiveLoan,
            amount,
            date,
            payment_detail,
            external_id,
        ))
    }

    /// Credit balance paid back to the borrower; the whole amount is overpayment.
    pub fn credit_balance_refund(
        loan: LoanRef,
        amount: Money,
        date: NaiveDate,
        external_id: Option<ExternalId>,
        payment_detail: Option<PaymentDetail>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        let mut transaction = Self::new(
            loan,
            LoanTransactionType::CreditBalanceRefund,
            amount,
            date,
            payment_detail,
            external_id,
        );
        transaction.overpayment_portion = none_if_zero(amount);
        Ok(transaction)
    }

    /// Chargeback of an earlier credit.
    pub fn chargeback(
        loan: LoanRef,
        amount: Money,
        payment_detail: Option<PaymentDetail>,
        date: NaiveDate,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, amount)?;
        Ok(Self::new(loan, LoanTransactionType::Chargeback, amount, date, payment_detail, external_id))
    }

    /// Interest income posting.
    pub fn income_posting(
        loan: LoanRef,
        date: NaiveDate,
        interest: Money,
        external_id: Option<ExternalId>,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, interest)?;
        let mut transaction = Self::new(loan, LoanTransactionType::IncomePosting, amount, date, None, external_id);
        transaction.interest_portion = none_if_zero(amount);
        Ok(transaction)
    }

    fn transfer_marker(
        loan: LoanRef,
        transaction_type: LoanTransactionType,
        principal_outstanding: Money,
        date: NaiveDate,
    ) -> Result<Self, LoanError> {
        let amount = Self::checked(loan, principal_outstanding)?;
        let mut transaction = Self::new(loan, transaction_type, amount, date, None, None);
        transaction.principal_portion = none_if_zero(amount);
        Ok(transaction)
    }

    /// Loan transfer initiated.
    pub fn initiate_transfer(loan: LoanRef, principal_outstanding: Money, date: NaiveDate) -> Result<Self, LoanError> {
        Self::transfer_marker(loan, LoanTransactionType::InitiateTransfer, principal_outstanding, date)
    }

    /// Loan transfer approved.
    pub fn approve_transfer(loan: LoanRef, principal_outstanding: Money, date: NaiveDate) -> Result<Self, LoanError> {
        Self::transfer_marker(loan, LoanTransactionType::ApproveTransfer, principal_outstanding, date)
    }

    /// Loan transfer withdrawn.
    pub fn withdraw_transfer(loan: LoanRef, principal_outstanding: Money, date: NaiveDate) -> Result<Self, LoanError> {
        Self::transfer_marker(loan, LoanTransactionType::WithdrawTransfer, principal_outstanding, date)
    }

    /// Loan transfer rejected.
    pub fn reject_transfer(loan: LoanRef, principal_outstanding: Money, date: NaiveDate) -> Result<Self, LoanError> {
        Self::transfer_marker(loan, LoanTransactionType::RejectTransfer, principal_outstanding, date)
    }

    /// Copy used when replaying history: same type, date, amount, payment
    /// detail, external id and relations under a fresh id, with no derived
    /// components. The copy records which transaction it replaces.
    #[must_use]
    pub fn copy_for_replay(&self) -> Self {
        let mut copy = Self {
            id: LoanTransactionId::new(),
            principal_portion: None,
            interest_portion: None,
            fee_charges_portion: None,
            penalty_charges_portion: None,
            overpayment_portion: None,
            outstanding_loan_balance: None,
            reversed: false,
            reversed_on: None,
            reversal_external_id: None,
            manually_adjusted_or_reversed: false,
            loan_charges_paid: Vec::new(),
            installment_mappings: Vec::new(),
            ..self.clone()
        };
        copy.relations.push(TransactionRelation {
            to_transaction_id: self.id,
            relation_type: TransactionRelationType::Replayed,
        });
        copy
    }

    // ========== Component Operations ==========

    fn accumulate(&self, current: Option<Decimal>, delta: Money) -> Result<Option<Decimal>, LoanError> {
        let delta = Money::zero(self.currency).plus(delta)?;
        Ok(none_if_zero(current.unwrap_or_default() + delta.amount()))
    }

    /// Adds the given deltas to the principal, interest, fee and penalty portions.
    pub fn update_components(
        &mut self,
        principal: Money,
        interest: Money,
        fee_charges: Money,
        penalty_charges: Money,
    ) -> Result<(), LoanError> {
        let principal = self.accumulate(self.principal_portion, principal)?;
        let interest = self.accumulate(self.interest_portion, interest)?;
        let fee_charges = self.accumulate(self.fee_charges_portion, fee_charges)?;
        let penalty_charges = self.accumulate(self.penalty_charges_portion, penalty_charges)?;
        self.principal_portion = principal;
        self.interest_portion = interest;
        self.fee_charges_portion = fee_charges;
        self.penalty_charges_portion = penalty_charges;
        Ok(())
    }

    /// Same as [`Self::update_components`], then sets the amount to the sum
    /// of the four portions.
    pub fn update_components_and_total(
        &mut self,
        principal: Money,
        interest: Money,
        fee_charges: Money,
        penalty_charges: Money,
    ) -> Result<(), LoanError> {
        self.update_components(principal, interest, fee_charges, penalty_charges)?;
        self.amount = self.principal_portion.unwrap_or_default()
            + self.interest_portion.unwrap_or_default()
            + self.fee_charges_portion.unwrap_or_default()
            + self.penalty_charges_portion.unwrap_or_default();
        Ok(())
    }

    /// Adds to the overpayment portion.
    pub fn update_over_payments(&mut self, overpayment: Money) -> Result<(), LoanError> {
        self.overpayment_portion = self.accumulate(self.overpayment_portion, overpayment)?;
        Ok(())
    }

    /// Replaces the overpayment portion.
    pub fn set_over_payments(&mut self, overpayment: Money) -> Result<(), LoanError> {
        self.overpayment_portion = self.accumulate(None, overpayment)?;
        Ok(())
    }

    /// Removes the unrecognized income from the interest portion.
    pub fn adjust_interest_component(&mut self) {
        let adjusted = self.interest_portion.unwrap_or_default()
            - self.unrecognized_income_portion.unwrap_or_default();
        self.interest_portion = none_if_zero(adjusted);
    }

    /// Clears every derived portion and the outstanding balance snapshot.
    /// Unrecognized income is input data and survives.
    pub fn reset_derived_components(&mut self) {
        self.principal_portion = None;
        self.interest_portion = None;
        self.fee_charges_portion = None;
        self.penalty_charges_portion = None;
        self.overpayment_portion = None;
        self.outstanding_loan_balance = None;
    }

    /// Records the loan balance after this transaction.
    pub fn update_outstanding_loan_balance(&mut self, balance: Decimal) {
        self.outstanding_loan_balance = Some(balance);
    }

    /// Attributes part of this transaction to a loan charge.
    pub fn add_charge_paid_by(&mut self, paid_by: LoanChargePaidBy) {
        self.loan_charges_paid.push(paid_by);
    }

    /// Records an installment allocation, merging into an existing mapping
    /// for the same installment.
    pub fn add_installment_mapping(&mut self, mapping: InstallmentMapping) {
        if let Some(existing) = self
            .installment_mappings
            .iter_mut()
            .find(|m| m.installment_number == mapping.installment_number)
        {
            existing.principal += mapping.principal;
            existing.interest += mapping.interest;
            existing.fee_charges += mapping.fee_charges;
            existing.penalty_charges += mapping.penalty_charges;
        } else {
            self.installment_mappings.push(mapping);
        }
    }

    /// Drops all installment allocations.
    pub fn clear_installment_mappings(&mut self) {
        self.installment_mappings.clear();
    }

    /// Links this transaction to another.
    pub fn add_relation(&mut self, relation: TransactionRelation) {
        self.relations.push(relation);
    }

    /// Flags the record as changed by a manual adjustment or reversal.
    pub fn mark_manually_adjusted(&mut self) {
        self.manually_adjusted_or_reversed = true;
    }

    /// Marks the record reversed. Only the owning loan may call this, after
    /// validating ordering against charge refunds. Reversing twice is a no-op.
    pub(crate) fn reverse(&mut self, reversed_on: NaiveDate, reversal_external_id: Option<ExternalId>) {
        if self.reversed {
            return;
        }
        self.reversed = true;
        self.reversed_on = Some(reversed_on);
        self.reversal_external_id = reversal_external_id;
        self.installment_mappings.clear();
    }

    /// Hands the external id over to a replacement record.
    pub(crate) fn take_external_id(&mut self) -> Option<ExternalId> {
        self.external_id.take()
    }

    /// Takes over the allocations of a replayed copy whose amounts matched.
    pub(crate) fn adopt_allocations(&mut self, replayed: &Self) {
        self.installment_mappings.clone_from(&replayed.installment_mappings);
        self.loan_charges_paid.clone_from(&replayed.loan_charges_paid);
        self.outstanding_loan_balance = replayed.outstanding_loan_balance;
    }

    // ========== Queries ==========

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> LoanTransactionId {
        self.id
    }

    /// Owning loan.
    #[must_use]
    pub const fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    /// Office.
    #[must_use]
    pub const fn office_id(&self) -> OfficeId {
        self.office_id
    }

    /// Type tag.
    #[must_use]
    pub const fn transaction_type(&self) -> LoanTransactionType {
        self.transaction_type
    }

    /// Business date of the transaction.
    #[must_use]
    pub const fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }

    /// When the record was created.
    #[must_use]
    pub const fn submitted_on(&self) -> DateTime<Utc> {
        self.submitted_on
    }

    /// Currency.
    #[must_use]
    pub const fn currency(&self) -> MonetaryCurrency {
        self.currency
    }

    /// Total amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Total amount as money.
    #[must_use]
    pub fn amount_money(&self) -> Money {
        Money::of(self.currency, self.amount)
    }

    /// Principal portion.
    #[must_use]
    pub const fn principal_portion(&self) -> Option<Decimal> {
        self.principal_portion
    }

    /// Interest portion.
    #[must_use]
    pub const fn interest_portion(&self) -> Option<Decimal> {
        self.interest_portion
    }

    /// Fee portion.
    #[must_use]
    pub const fn fee_charges_portion(&self) -> Option<Decimal> {
        self.fee_charges_portion
    }

    /// Penalty portion.
    #[must_use]
    pub const fn penalty_charges_portion(&self) -> Option<Decimal> {
        self.penalty_charges_portion
    }

    /// Overpayment portion.
    #[must_use]
    pub const fn overpayment_portion(&self) -> Option<Decimal> {
        self.overpayment_portion
    }

    /// Income that was waived before it was ever recognized.
    #[must_use]
    pub const fn unrecognized_income_portion(&self) -> Option<Decimal> {
        self.unrecognized_income_portion
    }

    /// Loan balance after this transaction.
    #[must_use]
    pub const fn outstanding_loan_balance(&self) -> Option<Decimal> {
        self.outstanding_loan_balance
    }

    /// Whether the record is void.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Whether the record still counts.
    #[must_use]
    pub const fn is_not_reversed(&self) -> bool {
        !self.reversed
    }

    /// Reversal date.
    #[must_use]
    pub const fn reversed_on(&self) -> Option<NaiveDate> {
        self.reversed_on
    }

    /// External id of the reversal.
    #[must_use]
    pub const fn reversal_external_id(&self) -> Option<&ExternalId> {
        self.reversal_external_id.as_ref()
    }

    /// External id.
    #[must_use]
    pub const fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }

    /// Whether a manual adjustment or reversal touched this record.
    #[must_use]
    pub const fn is_manually_adjusted_or_reversed(&self) -> bool {
        self.manually_adjusted_or_reversed
    }

    /// Payment detail.
    #[must_use]
    pub const fn payment_detail(&self) -> Option<&PaymentDetail> {
        self.payment_detail.as_ref()
    }

    /// Bucket credited by a charge refund.
    #[must_use]
    pub const fn charge_refund_charge_type(&self) -> Option<ChargeRefundChargeType> {
        self.charge_refund_charge_type
    }

    /// Charge allocations in insertion order.
    #[must_use]
    pub fn loan_charges_paid(&self) -> &[LoanChargePaidBy] {
        &self.loan_charges_paid
    }

    /// Installment allocations.
    #[must_use]
    pub fn installment_mappings(&self) -> &[InstallmentMapping] {
        &self.installment_mappings
    }

    /// Links to other transactions.
    #[must_use]
    pub fn relations(&self) -> &[TransactionRelation] {
        &self.relations
    }

    /// Amount is strictly positive.
    #[must_use]
    pub fn is_greater_than_zero(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Whether the transaction pays a penalty, judged by its first charge
    /// allocation only.
    #[must_use]
    pub fn is_penalty_payment(&self) -> bool {
        self.loan_charges_paid.first().is_some_and(|paid_by| paid_by.is_penalty)
    }

    /// Orders by transaction date, then submission time, then id.
    #[must_use]
    pub fn happened_before(&self, other: &Self) -> bool {
        (self.transaction_date, self.submitted_on, self.id)
            < (other.transaction_date, other.submitted_on, other.id)
    }

    /// Whether two records carry the same amount and derived portions.
    #[must_use]
    pub fn amounts_match(&self, other: &Self) -> bool {
        self.amount == other.amount
            && self.principal_portion.unwrap_or_default() == other.principal_portion.unwrap_or_default()
            && self.interest_portion.unwrap_or_default() == other.interest_portion.unwrap_or_default()
            && self.fee_charges_portion.unwrap_or_default() == other.fee_charges_portion.unwrap_or_default()
            && self.penalty_charges_portion.unwrap_or_default()
                == other.penalty_charges_portion.unwrap_or_default()
            && self.overpayment_portion.unwrap_or_default() == other.overpayment_portion.unwrap_or_default()
    }

    /// Repayment-type and not reversed.
    #[must_use]
    pub fn is_repayment_like(&self) -> bool {
        self.is_not_reversed() && self.transaction_type.is_repayment_type()
    }

    /// Accrual and not reversed.
    #[must_use]
    pub fn is_active_accrual(&self) -> bool {
        self.is_not_reversed() && self.transaction_type.is_accrual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanbook_shared::types::{ChargeId, CurrencyCode, LoanChargeId};
    use rust_decimal_macros::dec;

    fn usd() -> MonetaryCurrency {
        MonetaryCurrency::new(CurrencyCode::new("USD").unwrap(), 2)
    }

    fn loan() -> LoanRef {
        LoanRef {
            loan_id: LoanId::new(),
            office_id: OfficeId::new(),
            currency: usd(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn money(amount: Decimal) -> Money {
        Money::of(usd(), amount)
    }

    #[test]
    fn test_update_components_and_total_sums_portions() {
        let mut txn = LoanTransaction::write_off(loan(), date(10), None);
        txn.update_components_and_total(money(dec!(900)), money(dec!(100)), money(dec!(0)), money(dec!(5)))
            .unwrap();

        assert_eq!(txn.amount(), dec!(1005));
        assert_eq!(txn.principal_portion(), Some(dec!(900)));
        assert_eq!(txn.fee_charges_portion(), None);
        assert_eq!(txn.penalty_charges_portion(), Some(dec!(5)));
    }

    #[test]
    fn test_update_components_accumulates() {
        let mut txn = LoanTransaction::repayment(loan(), money(dec!(300)), None, date(5), None).unwrap();
        txn.update_components(money(dec!(100)), money(dec!(0)), money(dec!(0)), money(dec!(0)))
            .unwrap();
        txn.update_components(money(dec!(150)), money(dec!(50)), money(dec!(0)), money(dec!(0)))
            .unwrap();
        assert_eq!(txn.principal_portion(), Some(dec!(250)));
        assert_eq!(txn.interest_portion(), Some(dec!(50)));
        assert_eq!(txn.amount(), dec!(300));
    }

    #[test]
    fn test_components_back_to_zero_become_none() {
        let mut txn = LoanTransaction::repayment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        txn.update_components(money(dec!(10)), money(dec!(0)), money(dec!(0)), money(dec!(0)))
            .unwrap();
        txn.update_components(money(dec!(-10)), money(dec!(0)), money(dec!(0)), money(dec!(0)))
            .unwrap();
        assert_eq!(txn.principal_portion(), None);
    }

    #[test]
    fn test_currency_mismatch_is_rejected() {
        let eur = MonetaryCurrency::new(CurrencyCode::new("EUR").unwrap(), 2);
        let mut txn = LoanTransaction::repayment(loan(), money(dec!(10)), None, date(5), None).unwrap();

        let err = txn
            .update_components(Money::of(eur, dec!(1)), money(dec!(0)), money(dec!(0)), money(dec!(0)))
            .unwrap_err();
        assert!(matches!(err, LoanError::Money(MoneyError::CurrencyMismatch { .. })));
        assert_eq!(txn.principal_portion(), None);

        assert!(LoanTransaction::repayment(loan(), Money::of(eur, dec!(1)), None, date(5), None).is_err());
    }

    #[test]
    fn test_over_payments_accumulate_or_set() {
        let mut txn = LoanTransaction::repayment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        txn.update_over_payments(money(dec!(3))).unwrap();
        txn.update_over_payments(money(dec!(2))).unwrap();
        assert_eq!(txn.overpayment_portion(), Some(dec!(5)));
        txn.set_over_payments(money(dec!(1))).unwrap();
        assert_eq!(txn.overpayment_portion(), Some(dec!(1)));
        txn.set_over_payments(money(dec!(0))).unwrap();
        assert_eq!(txn.overpayment_portion(), None);
    }

    #[test]
    fn test_waiver_adjust_interest_component() {
        let mut txn =
            LoanTransaction::waiver(loan(), money(dec!(50)), date(5), money(dec!(20)), None).unwrap();
        assert_eq!(txn.interest_portion(), Some(dec!(50)));
        txn.adjust_interest_component();
        assert_eq!(txn.interest_portion(), Some(dec!(30)));
        assert_eq!(txn.unrecognized_income_portion(), Some(dec!(20)));
    }

    #[test]
    fn test_adjust_interest_to_zero_is_none() {
        let mut txn =
            LoanTransaction::waiver(loan(), money(dec!(20)), date(5), money(dec!(20)), None).unwrap();
        txn.adjust_interest_component();
        assert_eq!(txn.interest_portion(), None);
    }

    #[test]
    fn test_reverse_is_one_way_and_idempotent() {
        let mut txn = LoanTransaction::repayment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        txn.add_installment_mapping(InstallmentMapping {
            principal: dec!(10),
            ..InstallmentMapping::for_installment(1)
        });

        txn.reverse(date(6), ExternalId::parse("rev-1"));
        assert!(txn.is_reversed());
        assert_eq!(txn.reversed_on(), Some(date(6)));
        assert!(txn.installment_mappings().is_empty());

        txn.reverse(date(9), None);
        assert_eq!(txn.reversed_on(), Some(date(6)));
        assert_eq!(txn.reversal_external_id().map(ExternalId::as_str), Some("rev-1"));
    }

    #[test]
    fn test_repayment_type_factory_rejects_other_types() {
        let err = LoanTransaction::repayment_type(
            LoanTransactionType::Accrual,
            loan(),
            money(dec!(10)),
            None,
            date(5),
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err.parameter(), Some("transactionType"));

        let refund = LoanTransaction::repayment_type(
            LoanTransactionType::ChargeRefund,
            loan(),
            money(dec!(10)),
            None,
            date(5),
            None,
            Some(ChargeRefundChargeType::Penalty),
        )
        .unwrap();
        assert_eq!(refund.charge_refund_charge_type(), Some(ChargeRefundChargeType::Penalty));
    }

    #[test]
    fn test_is_penalty_payment_looks_at_first_allocation_only() {
        let paid_by = |is_penalty| LoanChargePaidBy {
            loan_charge_id: LoanChargeId::new(),
            charge_id: ChargeId::new(),
            amount: dec!(5),
            installment_number: Some(1),
            is_penalty,
        };

        let mut fee_first = LoanTransaction::charge_payment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        fee_first.add_charge_paid_by(paid_by(false));
        fee_first.add_charge_paid_by(paid_by(true));
        assert!(!fee_first.is_penalty_payment());

        let mut penalty_first =
            LoanTransaction::charge_payment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        penalty_first.add_charge_paid_by(paid_by(true));
        penalty_first.add_charge_paid_by(paid_by(false));
        assert!(penalty_first.is_penalty_payment());

        let none = LoanTransaction::charge_payment(loan(), money(dec!(10)), None, date(5), None).unwrap();
        assert!(!none.is_penalty_payment());
    }

    #[test]
    fn test_copy_for_replay_keeps_inputs_and_drops_derived() {
        let mut original = LoanTransaction::repayment(
            loan(),
            money(dec!(100)),
            None,
            date(5),
            ExternalId::parse("ext-9"),
        )
        .unwrap();
        original
            .update_components(money(dec!(100)), money(dec!(0)), money(dec!(0)), money(dec!(0)))
            .unwrap();

        let copy = original.copy_for_replay();
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.amount(), dec!(100));
        assert_eq!(copy.transaction_date(), date(5));
        assert_eq!(copy.principal_portion(), None);
        assert_eq!(copy.external_id(), original.external_id());
        assert_eq!(copy.relations().last().map(|r| r.to_transaction_id), Some(original.id()));
    }

    #[test]
    fn test_credit_balance_refund_is_overpayment() {
        let txn = LoanTransaction::credit_balance_refund(loan(), money(dec!(40)), date(5), None, None).unwrap();
        assert_eq!(txn.overpayment_portion(), Some(dec!(40)));
        assert_eq!(txn.transaction_type(), LoanTransactionType::CreditBalanceRefund);
    }

    #[test]
    fn test_transfer_markers_carry_outstanding_principal() {
        let txn = LoanTransaction::initiate_transfer(loan(), money(dec!(9100)), date(5)).unwrap();
        assert!(txn.transaction_type().is_non_monetary());
        assert_eq!(txn.principal_portion(), Some(dec!(9100)));
    }

    #[test]
    fn test_happened_before_orders_by_date_first() {
        let early = LoanTransaction::repayment(loan(), money(dec!(1)), None, date(5), None).unwrap();
        let late = LoanTransaction::repayment(loan(), money(dec!(1)), None, date(4), None).unwrap();
        assert!(late.happened_before(&early));
        assert!(!early.happened_before(&late));
    }
}
