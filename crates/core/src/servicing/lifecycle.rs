//! Application lifecycle and accrual runs.
//!
//! Submission through first disbursement, plus the accrual catch-up that
//! every posting triggers and the batch run over all periodic-accrual loans.

use std::slice;

use chrono::NaiveDate;
use loanbook_shared::types::{LoanId, LoanTransactionId};
use tracing::{info, warn};

use super::commands::{DisburseLoanCommand, LoanActionCommand};
use super::events::{LoanBusinessEvent, LoanEventKind};
use super::integrity::translate;
use super::ports::{BusinessEventNotifier, LoanStore};
use super::result::CommandProcessingResult;
use super::service::{LoanAccountDomainService, Snapshot};
use crate::accrual::service::AccrualService;
use crate::error::LoanError;
use crate::loan::aggregate::{Loan, LoanApplication};
use crate::loan::product::AccountingRule;

impl<S: LoanStore> LoanAccountDomainService<S> {
    // ========== Application ==========

    /// Submits a loan application.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the application is invalid, the client or
    /// group is inactive or the account number is taken.
    pub fn submit_application(&self, application: LoanApplication) -> Result<CommandProcessingResult, LoanError> {
        // 1. Validate
        let mut loan = Loan::submit(application)?;
        Self::check_client_and_group_active(&loan)?;

        // 2. Persist
        self.save_loan(&mut loan)?;

        info!(loan_id = %loan.id(), account_no = %loan.account_no(), "loan application submitted");
        Ok(CommandProcessingResult::builder(&loan)
            .with_change("accountNo", loan.account_no())
            .with_change("submittedOnDate", loan.submitted_on().to_string())
            .build())
    }

    /// Approves a pending application.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the loan is not pending approval or the
    /// date precedes submission.
    pub fn approve_application(
        &self,
        command: LoanActionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        self.decide(command, LoanEventKind::Approved, "approvedOnDate", events, Loan::approve)
    }

    /// Rejects a pending application.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the loan is not pending approval or the
    /// date precedes submission.
    pub fn reject_application(
        &self,
        command: LoanActionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        self.decide(command, LoanEventKind::Rejected, "rejectedOnDate", events, Loan::reject)
    }

    /// Withdraws a pending application on the applicant's behalf.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the loan is not pending approval or the
    /// date precedes submission.
    pub fn withdraw_application(
        &self,
        command: LoanActionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        self.decide(command, LoanEventKind::Withdrawn, "withdrawnOnDate", events, Loan::withdraw)
    }

    fn decide(
        &self,
        command: LoanActionCommand,
        kind: LoanEventKind,
        parameter: &str,
        events: &dyn BusinessEventNotifier,
        apply: fn(&mut Loan, NaiveDate) -> Result<(), LoanError>,
    ) -> Result<CommandProcessingResult, LoanError> {
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(kind, loan.id()));

        apply(&mut loan, command.action_date)?;
        self.save_loan(&mut loan)?;
        self.save_note(&loan, None, command.note)?;
        events.notify_post_business_event(&LoanBusinessEvent::loan(kind, loan.id()));

        info!(loan_id = %loan.id(), status = %loan.status(), date = %command.action_date, "loan application decided");
        Ok(CommandProcessingResult::builder(&loan)
            .with_change("status", loan.status().to_string())
            .with_change(parameter, command.action_date.to_string())
            .build())
    }

    // ========== Disbursement ==========

    /// Disburses an approved loan and generates its schedule. Upfront-accrual
    /// loans accrue the whole schedule at once.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan is not
    /// approved, the date is invalid or persisting fails.
    pub fn disburse_loan(
        &self,
        command: DisburseLoanCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;

        // 1. Preconditions
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::Disbursal, loan.id()));
        let snapshot = Snapshot::of(&loan);

        // 2. Disburse, then accrue upfront where configured
        let disbursement_id = loan.disburse(
            command.actual_disbursement_date,
            command.payment_detail,
            command.external_id,
            business_date,
        )?;
        let accruals = if loan.accounting_rule() == AccountingRule::AccrualUpfront {
            AccrualService::add_accrual_accounting(&mut loan)?
        } else {
            Vec::new()
        };

        // 3. Persist
        self.save_touched(&loan, &snapshot)?;
        self.save_loan(&mut loan)?;
        self.save_note(&loan, Some(disbursement_id), command.note)?;

        // 4. Journal, delinquency, events
        self.post_journal(&loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, false))?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::Disbursal,
            loan.id(),
            disbursement_id,
        ));
        Self::notify_balance_changed(&loan, events);

        info!(
            loan_id = %loan.id(),
            transaction_id = %disbursement_id,
            date = %command.actual_disbursement_date,
            installments = loan.installments().len(),
            accruals = accruals.len(),
            "loan disbursed"
        );
        let disbursement = loan.transaction(disbursement_id)?;
        Ok(CommandProcessingResult::builder(&loan)
            .with_transaction(disbursement_id, disbursement.external_id())
            .with_transaction_ids(accruals)
            .with_change("actualDisbursementDate", command.actual_disbursement_date.to_string())
            .with_change("principal", disbursement.amount().to_string())
            .build())
    }

    // ========== Accruals ==========

    /// Brings periodic accruals up to the loan's accrual watermark again
    /// after a posting changed what was earned. Persists and journals any
    /// accrual posted. Loans without periodic accrual, or never accrued,
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::AccrualFailed` when the accrual cannot be
    /// applied, or a persistence error.
    pub fn recalculate_accruals(&self, loan: &mut Loan) -> Result<Vec<LoanTransactionId>, LoanError> {
        let Some(till) = loan.accrued_till() else {
            return Ok(Vec::new());
        };
        if !loan.is_periodic_accrual() {
            return Ok(Vec::new());
        }
        let snapshot = Snapshot::of(loan);
        let posted: Vec<LoanTransactionId> = AccrualService::add_periodic_accruals_for_loans(till, slice::from_mut(loan))?
            .into_iter()
            .flat_map(|(_, ids)| ids)
            .collect();
        if posted.is_empty() {
            return Ok(posted);
        }
        self.save_touched(loan, &snapshot)?;
        self.save_loan(loan)?;
        self.post_journal(&AccrualService::accrual_bridge(loan, &posted))?;
        Ok(posted)
    }

    /// Accrues income up to `till` on every periodic-accrual loan.
    ///
    /// Each loan's accruals, watermark and journal entries are written under
    /// their own savepoint: a failing loan leaves nothing behind and is
    /// logged and skipped so the rest still accrue. Returns the accruals
    /// posted per loan.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::AccrualFailed` naming every loan that failed. The
    /// other loans' accruals stay written unless the caller runs the batch in
    /// a unit of work that rolls back on error. A store failure while listing
    /// loans is returned as is.
    pub fn run_periodic_accruals(
        &self,
        till: NaiveDate,
        events: &dyn BusinessEventNotifier,
    ) -> Result<Vec<(LoanId, Vec<LoanTransactionId>)>, LoanError> {
        let loan_ids = self.store.find_periodic_accrual_loans().map_err(translate)?;
        let mut posted = Vec::with_capacity(loan_ids.len());
        let mut failures = Vec::new();

        for loan_id in loan_ids {
            match self.accrue_one(loan_id, till, events) {
                Ok(ids) => posted.push((loan_id, ids)),
                Err(err) => {
                    warn!(%loan_id, %till, error = %err, "periodic accrual skipped");
                    failures.push(format!("{loan_id}: {err}"));
                }
            }
        }

        info!(%till, loans = posted.len(), failed = failures.len(), "periodic accrual run finished");
        if failures.is_empty() {
            Ok(posted)
        } else {
            Err(LoanError::AccrualFailed {
                message: failures.join("; "),
            })
        }
    }

    fn accrue_one(
        &self,
        loan_id: LoanId,
        till: NaiveDate,
        events: &dyn BusinessEventNotifier,
    ) -> Result<Vec<LoanTransactionId>, LoanError> {
        let mut loan = self.load(loan_id)?;
        let snapshot = Snapshot::of(&loan);
        let ids = AccrualService::add_periodic_accruals(till, &mut loan)?;
        if ids.is_empty() {
            return Ok(ids);
        }
        self.store.savepoint(|| {
            self.save_touched(&loan, &snapshot)?;
            self.save_loan(&mut loan)?;
            self.post_journal(&AccrualService::accrual_bridge(&loan, &ids))
        })?;
        for id in &ids {
            events.notify_post_business_event(&LoanBusinessEvent::transaction(LoanEventKind::Accrual, loan_id, *id));
        }
        Ok(ids)
    }
}
