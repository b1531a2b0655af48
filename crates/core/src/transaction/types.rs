//! Loan transaction type taxonomy.
//!
//! Integer codes are persisted and must never be renumbered. Code 11 is
//! unassigned.

use serde::{Deserialize, Serialize};

/// Every kind of loan transaction the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanTransactionType {
    /// Unknown or unmapped code.
    Invalid,
    /// Funds released to the borrower.
    Disbursement,
    /// Regular repayment.
    Repayment,
    /// Contra entry (non-monetary).
    Contra,
    /// Interest waived.
    WaiveInterest,
    /// Repayment collected at disbursement.
    RepaymentAtDisbursement,
    /// Outstanding balance written off.
    WriteOff,
    /// Loan marked for rescheduling (non-monetary).
    MarkedForRescheduling,
    /// Repayment received after write-off.
    RecoveryRepayment,
    /// Charges waived.
    WaiveCharges,
    /// Income accrual.
    Accrual,
    /// Loan transfer initiated.
    InitiateTransfer,
    /// Loan transfer approved.
    ApproveTransfer,
    /// Loan transfer withdrawn.
    WithdrawTransfer,
    /// Loan transfer rejected.
    RejectTransfer,
    /// Refund of an overpaid balance.
    Refund,
    /// Payment of a specific charge.
    ChargePayment,
    /// Refund of payments on an active loan.
    RefundForActiveLoan,
    /// Interest income posting.
    IncomePosting,
    /// Credit balance paid back to the borrower.
    CreditBalanceRefund,
    /// Refund issued by a merchant, applied as repayment.
    MerchantIssuedRefund,
    /// Payout refund, applied as repayment.
    PayoutRefund,
    /// Goodwill credit, applied as repayment.
    GoodwillCredit,
    /// Refund of a charge, applied as repayment.
    ChargeRefund,
    /// Chargeback of a previous credit.
    Chargeback,
}

impl LoanTransactionType {
    /// All variants in code order.
    pub const ALL: [Self; 25] = [
        Self::Invalid,
        Self::Disbursement,
        Self::Repayment,
        Self::Contra,
        Self::WaiveInterest,
        Self::RepaymentAtDisbursement,
        Self::WriteOff,
        Self::MarkedForRescheduling,
        Self::RecoveryRepayment,
        Self::WaiveCharges,
        Self::Accrual,
        Self::InitiateTransfer,
        Self::ApproveTransfer,
        Self::WithdrawTransfer,
        Self::RejectTransfer,
        Self::Refund,
        Self::ChargePayment,
        Self::RefundForActiveLoan,
        Self::IncomePosting,
        Self::CreditBalanceRefund,
        Self::MerchantIssuedRefund,
        Self::PayoutRefund,
        Self::GoodwillCredit,
        Self::ChargeRefund,
        Self::Chargeback,
    ];

    /// Persisted integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Invalid => 0,
            Self::Disbursement => 1,
            Self::Repayment => 2,
            Self::Contra => 3,
            Self::WaiveInterest => 4,
            Self::RepaymentAtDisbursement => 5,
            Self::WriteOff => 6,
            Self::MarkedForRescheduling => 7,
            Self::RecoveryRepayment => 8,
            Self::WaiveCharges => 9,
            Self::Accrual => 10,
            Self::InitiateTransfer => 12,
            Self::ApproveTransfer => 13,
            Self::WithdrawTransfer => 14,
            Self::RejectTransfer => 15,
            Self::Refund => 16,
            Self::ChargePayment => 17,
            Self::RefundForActiveLoan => 18,
            Self::IncomePosting => 19,
            Self::CreditBalanceRefund => 20,
            Self::MerchantIssuedRefund => 21,
            Self::PayoutRefund => 22,
            Self::GoodwillCredit => 23,
            Self::ChargeRefund => 24,
            Self::Chargeback => 25,
        }
    }

    /// Resolves a persisted code; unknown codes map to `Invalid`.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.code() == code)
            .unwrap_or(Self::Invalid)
    }

    /// Display code used by presentation layers.
    #[must_use]
    pub const fn display_code(self) -> &'static str {
        match self {
            Self::Invalid => "loanTransactionType.invalid",
            Self::Disbursement => "loanTransactionType.disbursement",
            Self::Repayment => "loanTransactionType.repayment",
            Self::Contra => "loanTransactionType.contra",
            Self::WaiveInterest => "loanTransactionType.waiver",
            Self::RepaymentAtDisbursement => "loanTransactionType.repaymentAtDisbursement",
            Self::WriteOff => "loanTransactionType.writeOff",
            Self::MarkedForRescheduling => "loanTransactionType.marked.for.rescheduling",
            Self::RecoveryRepayment => "loanTransactionType.recoveryRepayment",
            Self::WaiveCharges => "loanTransactionType.waiveCharges",
            Self::Accrual => "loanTransactionType.accrual",
            Self::InitiateTransfer => "loanTransactionType.initiateTransfer",
            Self::ApproveTransfer => "loanTransactionType.approveTransfer",
            Self::WithdrawTransfer => "loanTransactionType.withdrawTransfer",
            Self::RejectTransfer => "loanTransactionType.rejectTransfer",
            Self::Refund | Self::RefundForActiveLoan => "loanTransactionType.refund",
            Self::ChargePayment => "loanTransactionType.chargePayment",
            Self::IncomePosting => "loanTransactionType.incomePosting",
            Self::CreditBalanceRefund => "loanTransactionType.creditBalanceRefund",
            Self::MerchantIssuedRefund => "loanTransactionType.merchantIssuedRefund",
            Self::PayoutRefund => "loanTransactionType.payoutRefund",
            Self::GoodwillCredit => "loanTransactionType.goodwillCredit",
            Self::ChargeRefund => "loanTransactionType.chargeRefund",
            Self::Chargeback => "loanTransactionType.chargeback",
        }
    }

    /// Repayment, merchant-issued refund, payout refund, goodwill credit or
    /// charge refund. These all allocate against the schedule like a repayment.
    #[must_use]
    pub const fn is_repayment_type(self) -> bool {
        matches!(
            self,
            Self::Repayment
                | Self::MerchantIssuedRefund
                | Self::PayoutRefund
                | Self::GoodwillCredit
                | Self::ChargeRefund
        )
    }

    /// Transactions that only mark a state and never move money.
    #[must_use]
    pub const fn is_non_monetary(self) -> bool {
        matches!(
            self,
            Self::Contra
                | Self::MarkedForRescheduling
                | Self::InitiateTransfer
                | Self::ApproveTransfer
                | Self::WithdrawTransfer
                | Self::RejectTransfer
        )
    }

    /// True for `Disbursement`.
    #[must_use]
    pub const fn is_disbursement(self) -> bool {
        matches!(self, Self::Disbursement)
    }

    /// True for `Repayment`.
    #[must_use]
    pub const fn is_repayment(self) -> bool {
        matches!(self, Self::Repayment)
    }

    /// True for `MerchantIssuedRefund`.
    #[must_use]
    pub const fn is_merchant_issued_refund(self) -> bool {
        matches!(self, Self::MerchantIssuedRefund)
    }

    /// True for `PayoutRefund`.
    #[must_use]
    pub const fn is_payout_refund(self) -> bool {
        matches!(self, Self::PayoutRefund)
    }

    /// True for `GoodwillCredit`.
    #[must_use]
    pub const fn is_goodwill_credit(self) -> bool {
        matches!(self, Self::GoodwillCredit)
    }

    /// True for `ChargeRefund`.
    #[must_use]
    pub const fn is_charge_refund(self) -> bool {
        matches!(self, Self::ChargeRefund)
    }

    /// True for `RecoveryRepayment`.
    #[must_use]
    pub const fn is_recovery_repayment(self) -> bool {
        matches!(self, Self::RecoveryRepayment)
    }

    /// True for `RepaymentAtDisbursement`.
    #[must_use]
    pub const fn is_repayment_at_disbursement(self) -> bool {
        matches!(self, Self::RepaymentAtDisbursement)
    }

    /// True for `WaiveInterest`.
    #[must_use]
    pub const fn is_waive_interest(self) -> bool {
        matches!(self, Self::WaiveInterest)
    }

    /// True for `WaiveCharges`.
    #[must_use]
    pub const fn is_waive_charges(self) -> bool {
        matches!(self, Self::WaiveCharges)
    }

    /// True for `Accrual`.
    #[must_use]
    pub const fn is_accrual(self) -> bool {
        matches!(self, Self::Accrual)
    }

    /// True for `WriteOff`.
    #[must_use]
    pub const fn is_write_off(self) -> bool {
        matches!(self, Self::WriteOff)
    }

    /// True for `ChargePayment`.
    #[must_use]
    pub const fn is_charge_payment(self) -> bool {
        matches!(self, Self::ChargePayment)
    }

    /// True for `Refund`.
    #[must_use]
    pub const fn is_refund(self) -> bool {
        matches!(self, Self::Refund)
    }

    /// True for `RefundForActiveLoan`.
    #[must_use]
    pub const fn is_refund_for_active_loan(self) -> bool {
        matches!(self, Self::RefundForActiveLoan)
    }

    /// True for `CreditBalanceRefund`.
    #[must_use]
    pub const fn is_credit_balance_refund(self) -> bool {
        matches!(self, Self::CreditBalanceRefund)
    }

    /// True for `Chargeback`.
    #[must_use]
    pub const fn is_chargeback(self) -> bool {
        matches!(self, Self::Chargeback)
    }

    /// True for `IncomePosting`.
    #[must_use]
    pub const fn is_income_posting(self) -> bool {
        matches!(self, Self::IncomePosting)
    }
}

impl std::fmt::Display for LoanTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, LoanTransactionType::Invalid)]
    #[case(1, LoanTransactionType::Disbursement)]
    #[case(2, LoanTransactionType::Repayment)]
    #[case(4, LoanTransactionType::WaiveInterest)]
    #[case(8, LoanTransactionType::RecoveryRepayment)]
    #[case(10, LoanTransactionType::Accrual)]
    #[case(12, LoanTransactionType::InitiateTransfer)]
    #[case(18, LoanTransactionType::RefundForActiveLoan)]
    #[case(20, LoanTransactionType::CreditBalanceRefund)]
    #[case(24, LoanTransactionType::ChargeRefund)]
    #[case(25, LoanTransactionType::Chargeback)]
    fn test_code_table(#[case] code: i32, #[case] expected: LoanTransactionType) {
        assert_eq!(expected.code(), code);
        assert_eq!(LoanTransactionType::from_code(code), expected);
    }

    #[rstest]
    #[case(11)]
    #[case(-1)]
    #[case(26)]
    #[case(999)]
    fn test_unknown_codes_are_invalid(#[case] code: i32) {
        assert_eq!(LoanTransactionType::from_code(code), LoanTransactionType::Invalid);
    }

    #[test]
    fn test_codes_are_unique_and_stable() {
        let mut codes: Vec<i32> = LoanTransactionType::ALL.iter().map(|t| t.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), LoanTransactionType::ALL.len());
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_repayment_type_membership() {
        let repayment_like: Vec<_> = LoanTransactionType::ALL
            .into_iter()
            .filter(|t| t.is_repayment_type())
            .collect();
        assert_eq!(
            repayment_like,
            vec![
                LoanTransactionType::Repayment,
                LoanTransactionType::MerchantIssuedRefund,
                LoanTransactionType::PayoutRefund,
                LoanTransactionType::GoodwillCredit,
                LoanTransactionType::ChargeRefund,
            ]
        );
        assert!(!LoanTransactionType::RecoveryRepayment.is_repayment_type());
    }

    #[test]
    fn test_display_codes() {
        assert_eq!(
            LoanTransactionType::WaiveInterest.display_code(),
            "loanTransactionType.waiver"
        );
        assert_eq!(
            LoanTransactionType::Repayment.to_string(),
            "loanTransactionType.repayment"
        );
    }

    #[test]
    fn test_non_monetary_markers() {
        assert!(LoanTransactionType::ApproveTransfer.is_non_monetary());
        assert!(!LoanTransactionType::Accrual.is_non_monetary());
    }
}
