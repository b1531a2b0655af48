//! Records hanging off a transaction: charge allocations, installment
//! mappings, cross-transaction relations and payment details.

use loanbook_shared::types::{ChargeId, LoanChargeId, LoanTransactionId, PaymentDetailId, PaymentTypeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portion of a transaction attributed to one loan charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanChargePaidBy {
    /// Charge instance on the loan.
    pub loan_charge_id: LoanChargeId,
    /// Charge definition.
    pub charge_id: ChargeId,
    /// Allocated amount.
    pub amount: Decimal,
    /// Installment the allocation belongs to, when known.
    pub installment_number: Option<u32>,
    /// Whether the charge is a penalty.
    pub is_penalty: bool,
}

/// Portion of a transaction applied to one installment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentMapping {
    /// Installment number, starting at 1.
    pub installment_number: u32,
    /// Principal applied.
    pub principal: Decimal,
    /// Interest applied.
    pub interest: Decimal,
    /// Fees applied.
    pub fee_charges: Decimal,
    /// Penalties applied.
    pub penalty_charges: Decimal,
}

impl InstallmentMapping {
    /// Creates an empty mapping for an installment.
    #[must_use]
    pub fn for_installment(installment_number: u32) -> Self {
        Self {
            installment_number,
            ..Self::default()
        }
    }

    /// Sum of all portions.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.principal + self.interest + self.fee_charges + self.penalty_charges
    }
}

/// Kind of link between two transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionRelationType {
    /// Chargeback of the target.
    Chargeback,
    /// Adjustment of a charge paid by the target.
    ChargeAdjustment,
    /// Replacement created when the target was replayed.
    Replayed,
}

impl TransactionRelationType {
    /// Persisted integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Chargeback => 1,
            Self::ChargeAdjustment => 2,
            Self::Replayed => 3,
        }
    }
}

/// Link from one transaction to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRelation {
    /// Linked transaction.
    pub to_transaction_id: LoanTransactionId,
    /// Kind of link.
    pub relation_type: TransactionRelationType,
}

/// Which bucket a charge refund credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeRefundChargeType {
    /// Fee bucket.
    #[serde(rename = "F")]
    Fee,
    /// Penalty bucket.
    #[serde(rename = "P")]
    Penalty,
}

/// How and where a payment was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetail {
    /// Identifier.
    pub id: PaymentDetailId,
    /// Payment channel.
    pub payment_type_id: Option<PaymentTypeId>,
    /// Payer account number.
    pub account_number: Option<String>,
    /// Check number.
    pub check_number: Option<String>,
    /// Receipt number.
    pub receipt_number: Option<String>,
}

impl PaymentDetail {
    /// Payment detail for a payment channel with no extra references.
    #[must_use]
    pub fn for_payment_type(payment_type_id: PaymentTypeId) -> Self {
        Self {
            id: PaymentDetailId::new(),
            payment_type_id: Some(payment_type_id),
            account_number: None,
            check_number: None,
            receipt_number: None,
        }
    }
}
