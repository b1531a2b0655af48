//! Inputs to the servicing operations.

use chrono::NaiveDate;
use loanbook_shared::types::{ExternalId, LoanChargeId, LoanId, LoanTransactionId};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::transaction::allocation::{ChargeRefundChargeType, PaymentDetail};
use crate::transaction::types::LoanTransactionType;

/// A repayment-type posting or a recovery repayment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Repayment type; recovery repayments are accepted too.
    pub transaction_type: LoanTransactionType,
    /// Amount paid.
    pub transaction_amount: Decimal,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// How the money arrived.
    #[serde(default)]
    pub payment_detail: Option<PaymentDetail>,
    /// Bucket credited by a charge refund.
    #[serde(default)]
    pub charge_refund_charge_type: Option<ChargeRefundChargeType>,
    /// Note stored with the transaction.
    #[serde(default)]
    pub note: Option<String>,
    /// Money came in through an account transfer.
    #[serde(default)]
    pub is_account_transfer: bool,
    /// The transfer came from another loan.
    #[serde(default)]
    pub is_loan_to_loan_transfer: bool,
    /// Skip holiday and working-day rules.
    #[serde(default)]
    pub is_holiday_validation_done: bool,
}

/// Money posted against a loan that is not a repayment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Amount.
    pub transaction_amount: Decimal,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Payment channel details.
    #[serde(default)]
    pub payment_detail: Option<PaymentDetail>,
    /// Note stored with the transaction.
    #[serde(default)]
    pub note: Option<String>,
    /// Money moved through an account transfer.
    #[serde(default)]
    pub is_account_transfer: bool,
}

/// Payment of one loan charge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePaymentCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Charge being paid.
    pub loan_charge_id: LoanChargeId,
    /// Amount.
    pub transaction_amount: Decimal,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Payment channel details.
    #[serde(default)]
    pub payment_detail: Option<PaymentDetail>,
    /// Note stored with the transaction.
    #[serde(default)]
    pub note: Option<String>,
    /// Money moved through an account transfer.
    #[serde(default)]
    pub is_account_transfer: bool,
}

/// Foreclosure of a loan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeclosureCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Foreclosure date.
    pub transaction_date: NaiveDate,
    /// Caller's reference for the payoff.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Note stored with the payoff.
    #[serde(default)]
    pub note: Option<String>,
}

/// Interest waiver.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiveInterestCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Interest waived.
    pub transaction_amount: Decimal,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Note stored with the waiver.
    #[serde(default)]
    pub note: Option<String>,
}

/// Write-off of everything outstanding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOffCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Write-off date.
    pub transaction_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Note stored with the write-off.
    #[serde(default)]
    pub note: Option<String>,
}

/// Reversal of one transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseTransactionCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Transaction to reverse.
    pub transaction_id: LoanTransactionId,
    /// Reversal date.
    pub transaction_date: NaiveDate,
    /// Caller's reference for the reversal.
    #[serde(default)]
    pub reversal_external_id: Option<ExternalId>,
    /// Note stored with the reversal.
    #[serde(default)]
    pub note: Option<String>,
}

/// Application decision.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanActionCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Decision date.
    pub action_date: NaiveDate,
    /// Note stored with the decision.
    #[serde(default)]
    pub note: Option<String>,
}

/// First disbursement of an approved loan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisburseLoanCommand {
    /// Loan.
    pub loan_id: LoanId,
    /// Disbursement date.
    pub actual_disbursement_date: NaiveDate,
    /// Caller's unique reference.
    #[serde(default)]
    pub external_id: Option<ExternalId>,
    /// Payment channel details.
    #[serde(default)]
    pub payment_detail: Option<PaymentDetail>,
    /// Note stored with the disbursement.
    #[serde(default)]
    pub note: Option<String>,
}
