//! Collaborators that log instead of calling out.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use loanbook_core::LoanError;
use loanbook_core::loan::Holiday;
use loanbook_core::servicing::{
    BusinessDateProvider, BusinessEventNotifier, DelinquencyTagger, HolidayCalendar, JournalEntryPoster,
    LoanBusinessEvent,
};
use loanbook_core::transaction::AccountingBridgeData;
use loanbook_shared::types::{LoanId, OfficeId};
use tracing::{debug, info};

/// Counts journal batches and logs each bridged transaction.
#[derive(Debug, Default)]
pub struct LoggingJournal {
    batches: AtomicUsize,
}

impl LoggingJournal {
    /// Batches received so far.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }
}

impl JournalEntryPoster for LoggingJournal {
    fn create_journal_entries(&self, data: &AccountingBridgeData) -> Result<(), LoanError> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        for transaction in &data.new_loan_transactions {
            info!(
                loan_id = %data.loan_id,
                transaction_id = %transaction.id,
                transaction_type = %transaction.transaction_type,
                amount = %transaction.amount,
                reversed = transaction.reversed,
                "journal entry"
            );
        }
        Ok(())
    }
}

/// Logs business events.
#[derive(Debug, Default)]
pub struct LoggingEvents;

impl BusinessEventNotifier for LoggingEvents {
    fn notify_pre_business_event(&self, event: &LoanBusinessEvent) {
        debug!(kind = ?event.kind, loan_id = %event.loan_id, "pre event");
    }

    fn notify_post_business_event(&self, event: &LoanBusinessEvent) {
        debug!(kind = ?event.kind, loan_id = %event.loan_id, transaction_id = ?event.transaction_id, "post event");
    }
}

/// Logs delinquency classification changes.
#[derive(Debug, Default)]
pub struct LoggingDelinquency;

impl DelinquencyTagger for LoggingDelinquency {
    fn apply_delinquency_tag(&self, loan_id: LoanId, age_days: i64) -> Result<(), LoanError> {
        info!(%loan_id, age_days, "loan delinquent");
        Ok(())
    }

    fn remove_delinquency_tag(&self, loan_id: LoanId) -> Result<(), LoanError> {
        debug!(%loan_id, "loan current");
        Ok(())
    }
}

/// A fixed holiday list shared by every office.
#[derive(Debug, Default)]
pub struct StaticCalendar {
    holidays: Vec<Holiday>,
}

impl StaticCalendar {
    /// Calendar with the given holidays.
    pub const fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }
}

impl HolidayCalendar for StaticCalendar {
    fn holidays_from(&self, _office_id: OfficeId, from: NaiveDate) -> Vec<Holiday> {
        self.holidays.iter().filter(|h| h.to_date >= from).cloned().collect()
    }
}

/// Business date pinned by the script.
#[derive(Debug)]
pub struct ScriptedDate(pub NaiveDate);

impl BusinessDateProvider for ScriptedDate {
    fn business_date(&self) -> NaiveDate {
        self.0
    }
}
