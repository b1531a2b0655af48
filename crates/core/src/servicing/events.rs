//! Business events raised around servicing operations.

use loanbook_shared::types::{LoanId, LoanTransactionId};
use serde::Serialize;

use crate::transaction::types::LoanTransactionType;

/// What happened to the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanEventKind {
    /// Plain repayment.
    Repayment,
    /// Merchant-issued refund.
    MerchantIssuedRefund,
    /// Payout refund.
    PayoutRefund,
    /// Goodwill credit.
    GoodwillCredit,
    /// Charge refund.
    ChargeRefund,
    /// Recovery after write-off.
    RecoveryRepayment,
    /// Initial disbursal or additional disbursement.
    Disbursal,
    /// Charge payment.
    ChargePayment,
    /// Refund of an overpayment.
    Refund,
    /// Refund on an active loan.
    RefundForActiveLoan,
    /// Credit balance refund.
    CreditBalanceRefund,
    /// Foreclosure.
    ForeClosure,
    /// Interest waiver.
    WaiveInterest,
    /// Write-off.
    WriteOff,
    /// Transaction reversal.
    TransactionReversal,
    /// Application approved.
    Approved,
    /// Application rejected.
    Rejected,
    /// Application withdrawn.
    Withdrawn,
    /// Accrual posted.
    Accrual,
    /// Any change of the loan balances.
    BalanceChanged,
}

impl LoanEventKind {
    /// Event for a repayment-type or recovery posting, in priority order:
    /// repayment, merchant-issued refund, payout refund, goodwill credit,
    /// charge refund, recovery repayment.
    #[must_use]
    pub const fn for_repayment(transaction_type: LoanTransactionType) -> Option<Self> {
        if transaction_type.is_repayment() {
            Some(Self::Repayment)
        } else if transaction_type.is_merchant_issued_refund() {
            Some(Self::MerchantIssuedRefund)
        } else if transaction_type.is_payout_refund() {
            Some(Self::PayoutRefund)
        } else if transaction_type.is_goodwill_credit() {
            Some(Self::GoodwillCredit)
        } else if transaction_type.is_charge_refund() {
            Some(Self::ChargeRefund)
        } else if transaction_type.is_recovery_repayment() {
            Some(Self::RecoveryRepayment)
        } else {
            None
        }
    }

    /// Charge refunds raise no post event.
    #[must_use]
    pub const fn has_post_event(self) -> bool {
        !matches!(self, Self::ChargeRefund)
    }
}

/// Event payload handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBusinessEvent {
    /// What happened.
    pub kind: LoanEventKind,
    /// Loan.
    pub loan_id: LoanId,
    /// Transaction, once it exists.
    pub transaction_id: Option<LoanTransactionId>,
}

impl LoanBusinessEvent {
    /// Event about the loan only.
    #[must_use]
    pub const fn loan(kind: LoanEventKind, loan_id: LoanId) -> Self {
        Self {
            kind,
            loan_id,
            transaction_id: None,
        }
    }

    /// Event about one transaction.
    #[must_use]
    pub const fn transaction(kind: LoanEventKind, loan_id: LoanId, transaction_id: LoanTransactionId) -> Self {
        Self {
            kind,
            loan_id,
            transaction_id: Some(transaction_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LoanTransactionType::Repayment, Some(LoanEventKind::Repayment))]
    #[case(LoanTransactionType::MerchantIssuedRefund, Some(LoanEventKind::MerchantIssuedRefund))]
    #[case(LoanTransactionType::PayoutRefund, Some(LoanEventKind::PayoutRefund))]
    #[case(LoanTransactionType::GoodwillCredit, Some(LoanEventKind::GoodwillCredit))]
    #[case(LoanTransactionType::ChargeRefund, Some(LoanEventKind::ChargeRefund))]
    #[case(LoanTransactionType::RecoveryRepayment, Some(LoanEventKind::RecoveryRepayment))]
    #[case(LoanTransactionType::Disbursement, None)]
    fn test_repayment_event_selection(#[case] kind: LoanTransactionType, #[case] expected: Option<LoanEventKind>) {
        assert_eq!(LoanEventKind::for_repayment(kind), expected);
    }

    #[test]
    fn test_only_charge_refund_skips_post_event() {
        assert!(!LoanEventKind::ChargeRefund.has_post_event());
        assert!(LoanEventKind::Repayment.has_post_event());
        assert!(LoanEventKind::RecoveryRepayment.has_post_event());
    }
}
