//! Interfaces to everything the servicing layer does not own.
//!
//! Store traits return [`StoreError`]; the service translates those at each
//! save. Collaborator traits (journal, events, delinquency, calendar,
//! business date) are implemented outside this crate.

use chrono::NaiveDate;
use loanbook_shared::types::{
    AccountTransferId, LoanId, LoanTransactionId, NoteId, OfficeId, PostDatedCheckId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::events::LoanBusinessEvent;
use crate::error::{LoanError, StoreError};
use crate::loan::aggregate::Loan;
use crate::loan::holiday::Holiday;
use crate::transaction::bridge::AccountingBridgeData;
use crate::transaction::record::LoanTransaction;

// ========== Records ==========

/// Free-text note on a loan or one of its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identifier.
    pub id: NoteId,
    /// Loan.
    pub loan_id: LoanId,
    /// Transaction the note is about, if any.
    pub transaction_id: Option<LoanTransactionId>,
    /// Text.
    pub text: String,
}

/// Money moved between accounts where one leg is a loan transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTransfer {
    /// Identifier.
    pub id: AccountTransferId,
    /// Loan transaction the money came from.
    pub from_loan_transaction: Option<LoanTransactionId>,
    /// Loan transaction the money went to.
    pub to_loan_transaction: Option<LoanTransactionId>,
    /// Amount moved.
    pub amount: Decimal,
}

/// Recurring transfer into a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingInstruction {
    /// Identifier.
    pub id: AccountTransferId,
    /// Loan receiving the transfers.
    pub loan_id: LoanId,
    /// Still executing.
    pub active: bool,
}

/// State of a post-dated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostDatedCheckStatus {
    /// Not yet cleared against its installment.
    Pending,
    /// The installment it covers is paid.
    Paid,
}

/// Check handed in to cover one installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDatedCheck {
    /// Identifier.
    pub id: PostDatedCheckId,
    /// Loan.
    pub loan_id: LoanId,
    /// Installment covered.
    pub installment_number: u32,
    /// Check amount.
    pub amount: Decimal,
    /// Status.
    pub status: PostDatedCheckStatus,
}

// ========== Store ==========

/// Loan persistence with optimistic locking.
#[cfg_attr(test, mockall::automock)]
pub trait LoanRepository {
    /// Loads a loan.
    fn find_loan(&self, loan_id: LoanId) -> Result<Option<Loan>, StoreError>;

    /// Saves a loan whose version matches the stored one; returns the new version.
    fn save_loan(&self, loan: &Loan) -> Result<u64, StoreError>;

    /// Ids of every loan on periodic accrual accounting.
    fn find_periodic_accrual_loans(&self) -> Result<Vec<LoanId>, StoreError>;
}

/// Transaction rows, where external ids are enforced unique.
#[cfg_attr(test, mockall::automock)]
pub trait LoanTransactionRepository {
    /// Inserts or updates one transaction.
    fn save_transaction(&self, transaction: &LoanTransaction) -> Result<(), StoreError>;
}

/// Account transfers and standing instructions.
#[cfg_attr(test, mockall::automock)]
pub trait AccountTransferRepository {
    /// Points every transfer leg at `from` to `to` instead. Returns how many changed.
    fn relink_transfers(&self, from: LoanTransactionId, to: LoanTransactionId) -> Result<usize, StoreError>;

    /// Stops every standing instruction paying into the loan. Returns how many changed.
    fn disable_standing_instructions(&self, loan_id: LoanId) -> Result<usize, StoreError>;
}

/// Post-dated checks.
#[cfg_attr(test, mockall::automock)]
pub trait PostDatedCheckRepository {
    /// Check covering the installment, if any.
    fn find_check(&self, loan_id: LoanId, installment_number: u32) -> Result<Option<PostDatedCheck>, StoreError>;

    /// Updates a check's status.
    fn update_check_status(&self, id: PostDatedCheckId, status: PostDatedCheckStatus) -> Result<(), StoreError>;
}

/// Notes.
#[cfg_attr(test, mockall::automock)]
pub trait NoteRepository {
    /// Stores a note.
    fn save_note(&self, note: &Note) -> Result<(), StoreError>;
}

/// Everything the servicing layer persists.
pub trait LoanStore:
    LoanRepository + LoanTransactionRepository + AccountTransferRepository + PostDatedCheckRepository + NoteRepository
{
    /// Runs `work` like a database savepoint: when it fails, only the writes
    /// made by `work` are undone. Usable inside an enclosing unit of work.
    ///
    /// # Errors
    ///
    /// Returns the error of `work` once its writes are undone.
    fn savepoint<T>(&self, work: impl FnOnce() -> Result<T, LoanError>) -> Result<T, LoanError>;
}

// ========== Collaborators ==========

/// Turns the accounting bridge into journal entries.
#[cfg_attr(test, mockall::automock)]
pub trait JournalEntryPoster {
    /// Posts entries for the bridged transactions.
    fn create_journal_entries(&self, data: &AccountingBridgeData) -> Result<(), LoanError>;
}

/// Receives business events around every servicing operation.
#[cfg_attr(test, mockall::automock)]
pub trait BusinessEventNotifier {
    /// Before the loan changes.
    fn notify_pre_business_event(&self, event: &LoanBusinessEvent);

    /// After the change is persisted.
    fn notify_post_business_event(&self, event: &LoanBusinessEvent);
}

/// Keeps the delinquency classification of a loan current.
#[cfg_attr(test, mockall::automock)]
pub trait DelinquencyTagger {
    /// Tags the loan as `age_days` overdue.
    fn apply_delinquency_tag(&self, loan_id: LoanId, age_days: i64) -> Result<(), LoanError>;

    /// Clears any delinquency tag.
    fn remove_delinquency_tag(&self, loan_id: LoanId) -> Result<(), LoanError>;
}

/// Office holidays.
#[cfg_attr(test, mockall::automock)]
pub trait HolidayCalendar {
    /// Holidays of the office ending on or after `from`.
    fn holidays_from(&self, office_id: OfficeId, from: NaiveDate) -> Vec<Holiday>;
}

/// The bank's current business date.
#[cfg_attr(test, mockall::automock)]
pub trait BusinessDateProvider {
    /// Today, in business terms.
    fn business_date(&self) -> NaiveDate;
}
