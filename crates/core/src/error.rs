//! Loan engine error types.
//!
//! `LoanError` is the single domain error surfaced by the engine. Each
//! variant maps to a stable machine-readable code, a human readable message
//! and, where applicable, the offending parameter name and value so that an
//! outer layer can render field-level feedback. `StoreError` is what the
//! persistence ports return; it is translated into `LoanError` at each save
//! seam (see [`crate::servicing::integrity`]).

use chrono::NaiveDate;
use loanbook_shared::AppError;
use loanbook_shared::types::{ClientId, GroupId, LoanChargeId, LoanId, LoanTransactionId, MoneyError};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::loan::status::{LoanEvent, LoanStatus};
use crate::transaction::types::LoanTransactionType;

/// Action being validated against later charge refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    /// The transaction is being posted.
    Created,
    /// The transaction is being reversed.
    Reversed,
}

impl std::fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Reversed => write!(f, "reversed"),
        }
    }
}

/// Errors that can occur while servicing a loan.
#[derive(Debug, Error)]
pub enum LoanError {
    // ========== Precondition Errors ==========
    /// Owning client is not active.
    #[error("Client with identifier {0} is not active")]
    ClientNotActive(ClientId),

    /// Owning group is not active.
    #[error("Group with identifier {0} is not active")]
    GroupNotActive(GroupId),

    /// Loan does not exist.
    #[error("Loan with identifier {0} does not exist")]
    LoanNotFound(LoanId),

    /// Loan charge does not exist on the loan.
    #[error("Loan charge with identifier {0} does not exist")]
    LoanChargeNotFound(LoanChargeId),

    /// Transaction does not exist on the loan.
    #[error("Loan transaction with identifier {0} does not exist")]
    TransactionNotFound(LoanTransactionId),

    // ========== Validation Errors ==========
    /// Field-level validation failure.
    #[error("{message}")]
    ValidationFailed {
        /// Full code, `validation.msg.{resource}.{parameter}.{reason}`.
        code: String,
        /// Human readable message.
        message: String,
        /// Offending parameter.
        parameter: String,
        /// Offending value, if known.
        value: Option<String>,
    },

    // ========== Domain Rule Errors ==========
    /// Loan status does not allow the lifecycle event.
    #[error("Loan in status {from} does not allow {event}")]
    InvalidStatusTransition {
        /// Status before the event.
        from: LoanStatus,
        /// Rejected event.
        event: LoanEvent,
    },

    /// Transaction type cannot be posted while the loan is in this status.
    #[error("Transaction {transaction_type} is not allowed while loan is {status}")]
    TransactionNotAllowed {
        /// Current loan status.
        status: LoanStatus,
        /// Rejected transaction type.
        transaction_type: LoanTransactionType,
    },

    /// Transaction date falls on a holiday.
    #[error("Transaction date {0} is on a holiday")]
    TransactionOnHoliday(NaiveDate),

    /// Transaction date falls on a non-working day.
    #[error("Transaction date {0} is on a non-working day")]
    TransactionOnNonWorkingDay(NaiveDate),

    /// Transaction date is after the business date.
    #[error("Transaction date {date} cannot be after business date {business_date}")]
    TransactionDateInFuture {
        /// Requested transaction date.
        date: NaiveDate,
        /// Current business date.
        business_date: NaiveDate,
    },

    /// Transaction date is before the disbursement.
    #[error("Transaction date {date} cannot be before disbursement date {disbursed_on}")]
    TransactionBeforeDisbursement {
        /// Requested transaction date.
        date: NaiveDate,
        /// Actual disbursement date.
        disbursed_on: NaiveDate,
    },

    /// A repayment-type transaction precedes an existing charge refund.
    #[error("Loan transaction {transaction_id} can't be {action} because a later charge refund exists")]
    LaterChargeRefundExists {
        /// Transaction being validated.
        transaction_id: LoanTransactionId,
        /// What was attempted.
        action: TransactionAction,
    },

    /// Refund larger than the overpaid balance.
    #[error("Refund amount {amount} exceeds overpaid amount {overpaid}")]
    RefundExceedsOverpaid {
        /// Requested amount.
        amount: Decimal,
        /// Current overpaid balance.
        overpaid: Decimal,
    },

    /// Refund larger than what has been paid on an active loan.
    #[error("Refund amount {amount} exceeds total paid {paid}")]
    RefundExceedsPaid {
        /// Requested amount.
        amount: Decimal,
        /// Total paid so far.
        paid: Decimal,
    },

    /// Charge is fully settled or inactive.
    #[error("Loan charge {0} is already settled")]
    ChargeAlreadySettled(LoanChargeId),

    /// Charge payment larger than the outstanding charge.
    #[error("Charge payment {amount} exceeds outstanding {outstanding}")]
    ChargePaymentExceedsOutstanding {
        /// Requested amount.
        amount: Decimal,
        /// Outstanding on the charge.
        outstanding: Decimal,
    },

    /// Interest waiver larger than the outstanding interest.
    #[error("Waiver amount {amount} exceeds outstanding interest {outstanding}")]
    WaiverExceedsOutstandingInterest {
        /// Requested amount.
        amount: Decimal,
        /// Outstanding interest.
        outstanding: Decimal,
    },

    /// Money arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Aggregated accrual batch failure.
    #[error("{message}")]
    AccrualFailed {
        /// Message of the underlying batch error.
        message: String,
    },

    // ========== Persistence Errors ==========
    /// Integrity violation that could not be attributed to a known constraint.
    #[error("Unknown data integrity issue with resource.")]
    UnknownDataIntegrityIssue {
        /// Raw detail from the store.
        detail: String,
    },

    /// Optimistic lock conflict.
    #[error("Concurrent modification of {entity} {id}, please retry")]
    ConcurrentModification {
        /// Entity kind.
        entity: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Journal entry poster rejected the bridge payload.
    #[error("Journal entry posting failed: {0}")]
    JournalPosting(String),

    /// Store failure unrelated to integrity.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl LoanError {
    /// Builds a field-level validation error for `resource` and `parameter`.
    pub fn validation(
        resource: &str,
        parameter: &str,
        reason: &str,
        value: Option<String>,
    ) -> Self {
        Self::ValidationFailed {
            code: format!("validation.msg.{resource}.{parameter}.{reason}"),
            message: format!("The parameter `{parameter}` {}.", reason.replace('.', " ")),
            parameter: parameter.to_string(),
            value,
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::ClientNotActive(_) => "error.msg.client.not.active",
            Self::GroupNotActive(_) => "error.msg.group.not.active",
            Self::LoanNotFound(_) => "error.msg.loan.id.invalid",
            Self::LoanChargeNotFound(_) => "error.msg.loan.charge.id.invalid",
            Self::TransactionNotFound(_) => "error.msg.loan.transaction.id.invalid",
            Self::ValidationFailed { code, .. } => code,
            Self::InvalidStatusTransition { .. } => "error.msg.loan.status.transition.not.allowed",
            Self::TransactionNotAllowed { .. } => "error.msg.loan.transaction.not.allowed.in.status",
            Self::TransactionOnHoliday(_) => "error.msg.loan.transaction.date.is.on.holiday",
            Self::TransactionOnNonWorkingDay(_) => {
                "error.msg.loan.transaction.date.is.on.non.working.day"
            }
            Self::TransactionDateInFuture { .. } => "error.msg.loan.transaction.cannot.be.a.future.date",
            Self::TransactionBeforeDisbursement { .. } => {
                "error.msg.loan.transaction.cannot.be.before.disbursement.date"
            }
            Self::LaterChargeRefundExists { action, .. } => match action {
                TransactionAction::Created => {
                    "error.msg.loan.transaction.cant.be.created.because.later.charge.refund.exists"
                }
                TransactionAction::Reversed => {
                    "error.msg.loan.transaction.cant.be.reversed.because.later.charge.refund.exists"
                }
            },
            Self::RefundExceedsOverpaid { .. } => "error.msg.loan.refund.amount.exceeds.overpaid.amount",
            Self::RefundExceedsPaid { .. } => "error.msg.loan.refund.amount.exceeds.total.paid",
            Self::ChargeAlreadySettled(_) => "error.msg.loan.charge.already.settled",
            Self::ChargePaymentExceedsOutstanding { .. } => {
                "error.msg.loan.charge.payment.exceeds.outstanding"
            }
            Self::WaiverExceedsOutstandingInterest { .. } => {
                "error.msg.loan.waive.interest.exceeds.outstanding"
            }
            Self::Money(MoneyError::CurrencyMismatch { .. }) => "error.msg.currency.mismatch",
            Self::Money(MoneyError::InvalidCurrencyCode(_)) => "error.msg.currency.code.invalid",
            Self::Money(MoneyError::DivisionByZero) => "error.msg.division.by.zero",
            Self::AccrualFailed { .. } => "error.msg.accrual.exception",
            Self::UnknownDataIntegrityIssue { .. } => "error.msg.unknown.data.integrity.issue",
            Self::ConcurrentModification { .. } => "error.msg.concurrent.modification",
            Self::JournalPosting(_) => "error.msg.journal.entry.posting.failed",
            Self::Persistence(_) => "error.msg.persistence.failure",
        }
    }

    /// Returns the offending parameter name, if any.
    #[must_use]
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { parameter, .. } => Some(parameter),
            Self::TransactionOnHoliday(_)
            | Self::TransactionOnNonWorkingDay(_)
            | Self::TransactionDateInFuture { .. }
            | Self::TransactionBeforeDisbursement { .. } => Some("transactionDate"),
            Self::RefundExceedsOverpaid { .. }
            | Self::RefundExceedsPaid { .. }
            | Self::ChargePaymentExceedsOutstanding { .. }
            | Self::WaiverExceedsOutstandingInterest { .. } => Some("transactionAmount"),
            _ => None,
        }
    }

    /// Returns the offending value, if any.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        match self {
            Self::ValidationFailed { value, .. } => value.clone(),
            Self::TransactionOnHoliday(date)
            | Self::TransactionOnNonWorkingDay(date)
            | Self::TransactionDateInFuture { date, .. }
            | Self::TransactionBeforeDisbursement { date, .. } => Some(date.to_string()),
            Self::RefundExceedsOverpaid { amount, .. }
            | Self::RefundExceedsPaid { amount, .. }
            | Self::ChargePaymentExceedsOutstanding { amount, .. }
            | Self::WaiverExceedsOutstandingInterest { amount, .. } => Some(amount.to_string()),
            _ => None,
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<LoanError> for AppError {
    fn from(err: LoanError) -> Self {
        match err {
            LoanError::ValidationFailed {
                code,
                message,
                parameter,
                ..
            } => Self::Validation {
                code,
                message,
                parameter: Some(parameter),
            },
            LoanError::LoanNotFound(_)
            | LoanError::LoanChargeNotFound(_)
            | LoanError::TransactionNotFound(_) => Self::NotFound(err.to_string()),
            LoanError::ConcurrentModification { .. } => Self::Conflict(err.to_string()),
            LoanError::Persistence(_) => Self::Database(err.to_string()),
            LoanError::JournalPosting(_) => Self::Internal(err.to_string()),
            _ => Self::BusinessRule {
                code: err.error_code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Errors returned by persistence ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A named unique constraint rejected the write.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint name as reported by the store.
        constraint: String,
    },

    /// Integrity violation reported only as a message.
    #[error("data integrity violation: {0}")]
    IntegrityViolation(String),

    /// The row changed since it was read.
    #[error("{entity} {id} was modified concurrently")]
    OptimisticLock {
        /// Entity kind.
        entity: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Any other store failure.
    #[error("store failure: {0}")]
    Backend(String),
}
