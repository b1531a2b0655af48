//! Loan status state machine.
//!
//! Status codes are persisted. Every change of status goes through
//! [`LoanStatus::transition`]; pairs missing from the table are rejected.

use serde::{Deserialize, Serialize};

use crate::error::LoanError;

/// Lifecycle status of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Unknown code.
    Invalid,
    /// Application submitted, waiting for approval.
    SubmittedAndPendingApproval,
    /// Approved, not yet disbursed.
    Approved,
    /// Disbursed and running.
    Active,
    /// Transfer to another office in progress.
    TransferInProgress,
    /// Transfer on hold.
    TransferOnHold,
    /// Withdrawn by the applicant.
    WithdrawnByClient,
    /// Application rejected.
    Rejected,
    /// Closed, everything repaid.
    ClosedObligationsMet,
    /// Closed by write-off.
    ClosedWrittenOff,
    /// Closed by refinancing into another loan.
    ClosedRefinanced,
    /// Borrower paid more than owed.
    Overpaid,
}

/// Lifecycle events that move a loan between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanEvent {
    /// Application approved.
    Approved,
    /// Approval undone.
    ApprovalUndone,
    /// Application rejected.
    Rejected,
    /// Application withdrawn.
    Withdrawn,
    /// Funds disbursed.
    Disbursed,
    /// Repayment or waiver reopened an outstanding balance.
    RepaymentOrWaiver,
    /// Everything repaid.
    RepaidInFull,
    /// Outstanding balance written off.
    WrittenOff,
    /// More paid than owed.
    Overpayment,
    /// Loan refinanced.
    Refinanced,
    /// Loan foreclosed.
    ForeClosure,
}

impl std::fmt::Display for LoanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl LoanStatus {
    /// Persisted integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Invalid => 0,
            Self::SubmittedAndPendingApproval => 100,
            Self::Approved => 200,
            Self::Active => 300,
            Self::TransferInProgress => 303,
            Self::TransferOnHold => 304,
            Self::WithdrawnByClient => 400,
            Self::Rejected => 500,
            Self::ClosedObligationsMet => 600,
            Self::ClosedWrittenOff => 601,
            Self::ClosedRefinanced => 602,
            Self::Overpaid => 700,
        }
    }

    /// Resolves a persisted code; unknown codes map to `Invalid`.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            100 => Self::SubmittedAndPendingApproval,
            200 => Self::Approved,
            300 => Self::Active,
            303 => Self::TransferInProgress,
            304 => Self::TransferOnHold,
            400 => Self::WithdrawnByClient,
            500 => Self::Rejected,
            600 => Self::ClosedObligationsMet,
            601 => Self::ClosedWrittenOff,
            602 => Self::ClosedRefinanced,
            700 => Self::Overpaid,
            _ => Self::Invalid,
        }
    }

    /// Any of the closed statuses.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            Self::ClosedObligationsMet | Self::ClosedWrittenOff | Self::ClosedRefinanced
        )
    }

    /// Running loan.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Overpaid loan.
    #[must_use]
    pub const fn is_overpaid(self) -> bool {
        matches!(self, Self::Overpaid)
    }

    /// Statuses in which money can still move on the schedule.
    #[must_use]
    pub const fn is_servicing(self) -> bool {
        matches!(self, Self::Active | Self::Overpaid | Self::ClosedObligationsMet)
    }

    /// Applies a lifecycle event.
    pub fn transition(self, event: LoanEvent) -> Result<Self, LoanError> {
        use LoanEvent as E;
        let next = match (self, event) {
            (Self::SubmittedAndPendingApproval, E::Approved) => Self::Approved,
            (Self::SubmittedAndPendingApproval | Self::Approved, E::Rejected) => Self::Rejected,
            (Self::SubmittedAndPendingApproval | Self::Approved, E::Withdrawn) => Self::WithdrawnByClient,
            (Self::Approved, E::ApprovalUndone) => Self::SubmittedAndPendingApproval,
            (Self::Approved, E::Disbursed) => Self::Active,
            (Self::Active | Self::Overpaid | Self::ClosedObligationsMet, E::RepaymentOrWaiver) => Self::Active,
            (Self::Active | Self::Overpaid | Self::ClosedObligationsMet, E::RepaidInFull)
            | (Self::Active, E::ForeClosure) => Self::ClosedObligationsMet,
            (Self::Active, E::WrittenOff) => Self::ClosedWrittenOff,
            (Self::Active | Self::Overpaid | Self::ClosedObligationsMet, E::Overpayment) => Self::Overpaid,
            (Self::Active, E::Refinanced) => Self::ClosedRefinanced,
            (from, event) => return Err(LoanError::InvalidStatusTransition { from, event }),
        };
        Ok(next)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Invalid => "invalid",
            Self::SubmittedAndPendingApproval => "submitted.and.pending.approval",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::TransferInProgress => "transfer.in.progress",
            Self::TransferOnHold => "transfer.on.hold",
            Self::WithdrawnByClient => "withdrawn.by.client",
            Self::Rejected => "rejected",
            Self::ClosedObligationsMet => "closed.obligations.met",
            Self::ClosedWrittenOff => "closed.written.off",
            Self::ClosedRefinanced => "closed.refinanced",
            Self::Overpaid => "overpaid",
        };
        write!(f, "loanStatusType.{label}")
    }
}
