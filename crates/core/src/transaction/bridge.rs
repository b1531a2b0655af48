//! Accounting bridge payload.
//!
//! The bridge is the hand-off from the loan engine to journal-entry
//! generation: loan identity, which accounting basis applies, transfer flags
//! and a flattened view of every transaction that is new or newly reversed.

use chrono::NaiveDate;
use loanbook_shared::types::{
    ChargeId, CurrencyCode, LoanChargeId, LoanId, LoanProductId, LoanTransactionId, OfficeId,
    PaymentTypeId,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::loan::product::AccountingRule;
use crate::transaction::allocation::{ChargeRefundChargeType, LoanChargePaidBy};
use crate::transaction::record::LoanTransaction;

/// Charge allocation as seen by the journal-entry generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePaidBridgeData {
    /// Charge definition.
    pub charge_id: ChargeId,
    /// Charge instance on the loan.
    pub loan_charge_id: LoanChargeId,
    /// Penalty or fee.
    pub is_penalty: bool,
    /// Allocated amount.
    pub amount: Decimal,
    /// Installment number, when known.
    pub installment_number: Option<u32>,
}

impl From<&LoanChargePaidBy> for ChargePaidBridgeData {
    fn from(paid_by: &LoanChargePaidBy) -> Self {
        Self {
            charge_id: paid_by.charge_id,
            loan_charge_id: paid_by.loan_charge_id,
            is_penalty: paid_by.is_penalty,
            amount: paid_by.amount,
            installment_number: paid_by.installment_number,
        }
    }
}

/// Flattened transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTransactionBridgeData {
    /// Transaction id.
    pub id: LoanTransactionId,
    /// Office.
    pub office_id: OfficeId,
    /// Persisted type code.
    #[serde(rename = "type")]
    pub transaction_type: i32,
    /// Reversal flag.
    pub reversed: bool,
    /// Transaction date.
    pub date: NaiveDate,
    /// Currency.
    pub currency_code: CurrencyCode,
    /// Total amount.
    pub amount: Decimal,
    /// Principal portion.
    pub principal_portion: Option<Decimal>,
    /// Interest portion.
    pub interest_portion: Option<Decimal>,
    /// Fee portion.
    pub fee_charges_portion: Option<Decimal>,
    /// Penalty portion.
    pub penalty_charges_portion: Option<Decimal>,
    /// Overpayment portion.
    pub overpayment_portion: Option<Decimal>,
    /// Charge refund bucket.
    pub charge_refund_charge_type: Option<ChargeRefundChargeType>,
    /// Charge allocations.
    pub loan_charges_paid: Vec<ChargePaidBridgeData>,
    /// Payment channel.
    pub payment_type_id: Option<PaymentTypeId>,
}

impl From<&LoanTransaction> for LoanTransactionBridgeData {
    fn from(transaction: &LoanTransaction) -> Self {
        Self {
            id: transaction.id(),
            office_id: transaction.office_id(),
            transaction_type: transaction.transaction_type().code(),
            reversed: transaction.is_reversed(),
            date: transaction.transaction_date(),
            currency_code: transaction.currency().code,
            amount: transaction.amount(),
            principal_portion: transaction.principal_portion(),
            interest_portion: transaction.interest_portion(),
            fee_charges_portion: transaction.fee_charges_portion(),
            penalty_charges_portion: transaction.penalty_charges_portion(),
            overpayment_portion: transaction.overpayment_portion(),
            charge_refund_charge_type: transaction.charge_refund_charge_type(),
            loan_charges_paid: transaction
                .loan_charges_paid()
                .iter()
                .map(ChargePaidBridgeData::from)
                .collect(),
            payment_type_id: transaction.payment_detail().and_then(|detail| detail.payment_type_id),
        }
    }
}

/// Payload handed to the journal-entry poster.
///
/// The three accounting flags come from a single [`AccountingRule`], so at
/// most one of them is ever set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingBridgeData {
    /// Loan.
    pub loan_id: LoanId,
    /// Product.
    #[serde(rename = "loanProductId")]
    pub product_id: LoanProductId,
    /// Office.
    pub office_id: OfficeId,
    /// Currency.
    pub currency_code: CurrencyCode,
    /// Cash basis.
    pub cash_based_accounting_enabled: bool,
    /// Upfront accrual basis.
    pub upfront_accrual_based_accounting_enabled: bool,
    /// Periodic accrual basis.
    pub periodic_accrual_based_accounting_enabled: bool,
    /// Posted as part of an account transfer.
    pub is_account_transfer: bool,
    /// Posted as part of a loan-to-loan transfer.
    pub is_loan_to_loan_transfer: bool,
    /// New or newly reversed transactions.
    pub new_loan_transactions: Vec<LoanTransactionBridgeData>,
}

impl AccountingBridgeData {
    /// Builds the payload from the loan identity and accounting rule.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        loan_id: LoanId,
        product_id: LoanProductId,
        office_id: OfficeId,
        currency_code: CurrencyCode,
        accounting_rule: AccountingRule,
        is_account_transfer: bool,
        is_loan_to_loan_transfer: bool,
        new_loan_transactions: Vec<LoanTransactionBridgeData>,
    ) -> Self {
        Self {
            loan_id,
            product_id,
            office_id,
            currency_code,
            cash_based_accounting_enabled: accounting_rule == AccountingRule::Cash,
            upfront_accrual_based_accounting_enabled: accounting_rule == AccountingRule::AccrualUpfront,
            periodic_accrual_based_accounting_enabled: accounting_rule == AccountingRule::AccrualPeriodic,
            is_account_transfer,
            is_loan_to_loan_transfer,
            new_loan_transactions,
        }
    }

    /// Whether there is anything to journal.
    #[must_use]
    pub fn has_transactions(&self) -> bool {
        !self.new_loan_transactions.is_empty()
    }
}
