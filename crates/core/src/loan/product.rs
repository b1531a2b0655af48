//! Loan product terms copied onto a loan at submission.

use loanbook_shared::types::{LoanProductId, MonetaryCurrency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How interest is computed per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestMethod {
    /// On the principal still outstanding at the start of each period.
    DecliningBalance,
    /// On the original principal every period.
    Flat,
}

/// How principal is spread across installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// Equal total installment amounts.
    EqualInstallments,
    /// Equal principal portions.
    EqualPrincipal,
}

/// Accounting basis applied to a loan's journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountingRule {
    /// No journal entries.
    None,
    /// Cash basis.
    Cash,
    /// Income accrued periodically.
    AccrualPeriodic,
    /// Income accrued for the whole schedule at disbursement.
    AccrualUpfront,
}

impl AccountingRule {
    /// Persisted integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::None => 1,
            Self::Cash => 2,
            Self::AccrualPeriodic => 3,
            Self::AccrualUpfront => 4,
        }
    }

    /// Whether journal entries are produced at all.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Periodic accrual basis.
    #[must_use]
    pub const fn is_periodic_accrual(self) -> bool {
        matches!(self, Self::AccrualPeriodic)
    }

    /// Upfront accrual basis.
    #[must_use]
    pub const fn is_upfront_accrual(self) -> bool {
        matches!(self, Self::AccrualUpfront)
    }
}

/// Terms a loan runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanProductTerms {
    /// Source product.
    pub product_id: LoanProductId,
    /// Loan currency.
    pub currency: MonetaryCurrency,
    /// Approved principal.
    pub principal: Decimal,
    /// Number of installments.
    pub number_of_repayments: u32,
    /// Months between installments.
    pub repayment_every_months: u32,
    /// Nominal interest rate per period, in percent.
    pub interest_rate_per_period: Decimal,
    /// Interest method.
    pub interest_method: InterestMethod,
    /// Amortization method.
    pub amortization_method: AmortizationMethod,
    /// Accounting basis.
    pub accounting_rule: AccountingRule,
    /// Recalculate future interest after each repayment.
    pub interest_recalculation_enabled: bool,
}

impl LoanProductTerms {
    /// Periodic rate as a fraction.
    #[must_use]
    pub fn periodic_rate(&self) -> Decimal {
        self.interest_rate_per_period / Decimal::ONE_HUNDRED
    }
}
