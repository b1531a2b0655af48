//! Loan account domain service.
//!
//! Every posting follows the same skeleton: precondition, pre-event, build
//! the transaction, mutate the loan, persist, note, journal, accruals,
//! delinquency, post-event. The service never opens a unit of work itself;
//! callers wrap each call in one (see [`InMemoryLoanStore::in_transaction`])
//! so a failure at any step discards everything.
//!
//! [`InMemoryLoanStore::in_transaction`]: super::memory::InMemoryLoanStore::in_transaction

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use loanbook_shared::ServicingConfig;
use loanbook_shared::types::{LoanId, LoanTransactionId, Money, NoteId};
use rust_decimal::Decimal;
use tracing::info;

use super::commands::{
    ChargePaymentCommand, ForeclosureCommand, RepaymentCommand, ReverseTransactionCommand, TransactionCommand,
    WaiveInterestCommand, WriteOffCommand,
};
use super::events::{LoanBusinessEvent, LoanEventKind};
use super::integrity::translate;
use super::ports::{
    BusinessDateProvider, BusinessEventNotifier, DelinquencyTagger, HolidayCalendar, JournalEntryPoster, LoanStore,
    Note, PostDatedCheckStatus,
};
use super::result::CommandProcessingResult;
use crate::error::LoanError;
use crate::loan::aggregate::Loan;
use crate::loan::holiday::{HolidayDetail, WorkingDays};
use crate::loan::status::LoanEvent;
use crate::transaction::bridge::AccountingBridgeData;
use crate::transaction::changed::ChangedTransactionDetail;
use crate::transaction::record::LoanTransaction;

/// Ids present on a loan before an operation, used to find what it added or reversed.
pub(super) struct Snapshot {
    pub(super) existing: HashSet<LoanTransactionId>,
    pub(super) reversed: HashSet<LoanTransactionId>,
}

impl Snapshot {
    pub(super) fn of(loan: &Loan) -> Self {
        Self {
            existing: loan.existing_transaction_ids(),
            reversed: loan.existing_reversed_transaction_ids(),
        }
    }
}

/// Foreclosure event amount: the principal settled, negated. Never negative zero.
fn settled_principal(principal: Decimal) -> Decimal {
    if principal.is_zero() { Decimal::ZERO } else { -principal }
}

/// Services the service calls out to.
#[derive(Clone)]
pub struct Collaborators {
    /// Journal entry poster.
    pub journal: Arc<dyn JournalEntryPoster + Send + Sync>,
    /// Delinquency tagger.
    pub delinquency: Arc<dyn DelinquencyTagger + Send + Sync>,
    /// Office holiday calendar.
    pub calendar: Arc<dyn HolidayCalendar + Send + Sync>,
    /// Business date source.
    pub business_dates: Arc<dyn BusinessDateProvider + Send + Sync>,
}

/// Orchestrates loan postings against a [`LoanStore`].
pub struct LoanAccountDomainService<S: LoanStore> {
    pub(super) store: S,
    pub(super) collaborators: Collaborators,
    pub(super) config: ServicingConfig,
}

impl<S: LoanStore> LoanAccountDomainService<S> {
    /// Creates a service.
    pub fn new(store: S, collaborators: Collaborators, config: ServicingConfig) -> Self {
        Self {
            store,
            collaborators,
            config,
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ========== Repayments ==========

    /// Posts a repayment-type transaction or a recovery repayment.
    ///
    /// Steps, in this order:
    /// 1. Client and group must be active
    /// 2. Pre-event chosen by transaction type
    /// 3. Build the transaction (recovery has its own factory)
    /// 4. Apply it to the loan, with interest recalculation when the loan has it on
    /// 5. Persist the transaction, the loan, then each replaced transaction
    /// 6. Note
    /// 7. Journal entries
    /// 8. Accruals, then delinquency
    /// 9. Post-events
    /// 10. Standing instructions stop when the loan closed
    /// 11. Post-dated checks follow the installments paid
    ///
    /// # Errors
    ///
    /// Returns `LoanError` from any step; nothing after the failing step runs.
    pub fn make_repayment(
        &self,
        command: RepaymentCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;

        // 1. Client and group must be active before anything changes
        Self::check_client_and_group_active(&loan)?;

        // 2. Pre-event
        let kind = LoanEventKind::for_repayment(command.transaction_type).ok_or_else(|| {
            LoanError::validation(
                "loan.transaction",
                "transactionType",
                "is.not.a.repayment.type",
                Some(command.transaction_type.display_code().to_string()),
            )
        })?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(kind, loan.id()));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        // 3. Build
        let amount = Money::of(loan.currency(), command.transaction_amount);
        let transaction = if command.transaction_type.is_recovery_repayment() {
            LoanTransaction::recovery_repayment(
                loan.loan_ref(),
                amount,
                command.payment_detail,
                command.transaction_date,
                command.external_id,
            )?
        } else {
            LoanTransaction::repayment_type(
                command.transaction_type,
                loan.loan_ref(),
                amount,
                command.payment_detail,
                command.transaction_date,
                command.external_id,
                command.charge_refund_charge_type,
            )?
        };
        let transaction_id = transaction.id();

        // 4. Apply
        let holiday = if command.is_holiday_validation_done {
            None
        } else {
            Some(self.holiday_detail(&loan, command.transaction_date)?)
        };
        let recalculate_interest = loan.is_interest_recalculation_enabled();
        let changed = loan.make_repayment(transaction, holiday.as_ref(), business_date, recalculate_interest)?;

        // 5. Persist
        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_changed(&loan, changed.as_ref())?;

        // 6. Note
        self.save_note(&loan, Some(transaction_id), command.note)?;

        // 7. Journal
        let mut bridge =
            loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, command.is_account_transfer);
        bridge.is_loan_to_loan_transfer = command.is_loan_to_loan_transfer;
        self.post_journal(&bridge)?;

        // 8. Accruals, then delinquency
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;

        // 9. Post-events
        if kind.has_post_event() {
            events.notify_post_business_event(&LoanBusinessEvent::transaction(kind, loan.id(), transaction_id));
        }
        Self::notify_balance_changed(&loan, events);

        // 10. Standing instructions
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        // 11. Post-dated checks
        if loan.is_individual() {
            self.update_post_dated_checks(&loan, transaction_id)?;
        }

        let transaction = loan.transaction(transaction_id)?;
        info!(
            loan_id = %loan.id(),
            transaction_id = %transaction_id,
            transaction_type = %transaction.transaction_type(),
            amount = %transaction.amount(),
            replaced = changed.as_ref().map_or(0, |c| c.new_transaction_mappings().len()),
            "repayment posted"
        );
        Ok(CommandProcessingResult::builder(&loan)
            .with_transaction(transaction_id, transaction.external_id())
            .with_change("transactionAmount", transaction.amount().to_string())
            .with_change("transactionDate", transaction.transaction_date().to_string())
            .build())
    }

    // ========== Disbursement ==========

    /// Disburses more money on a running loan.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan does not
    /// accept disbursements or persisting fails.
    pub fn make_disburse_transaction(
        &self,
        command: TransactionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::Disbursal, loan.id()));
        let snapshot = Snapshot::of(&loan);

        let transaction = LoanTransaction::disbursement(
            loan.loan_ref(),
            Money::of(loan.currency(), command.transaction_amount),
            command.payment_detail,
            command.transaction_date,
            command.external_id,
        )?;
        let transaction_id = transaction.id();
        loan.add_disbursement_transaction(transaction, business_date)?;

        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_note(&loan, Some(transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(
            &snapshot.existing,
            &snapshot.reversed,
            command.is_account_transfer,
        ))?;
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::Disbursal,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, amount = %command.transaction_amount, "additional disbursement posted");
        self.transaction_result(&loan, transaction_id)
    }

    // ========== Charges ==========

    /// Pays one loan charge. Disbursement charges skip holiday rules and the schedule.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the charge cannot
    /// take the payment or persisting fails.
    pub fn make_charge_payment(
        &self,
        command: ChargePaymentCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::ChargePayment, loan.id()));
        let snapshot = Snapshot::of(&loan);

        let transaction = LoanTransaction::charge_payment(
            loan.loan_ref(),
            Money::of(loan.currency(), command.transaction_amount),
            command.payment_detail,
            command.transaction_date,
            command.external_id,
        )?;
        let transaction_id = transaction.id();
        let changed = if loan.charge(command.loan_charge_id)?.is_disbursement_charge() {
            loan.pay_disbursement_charge(command.loan_charge_id, transaction, business_date)?;
            None
        } else {
            let holiday = self.holiday_detail(&loan, command.transaction_date)?;
            loan.make_charge_payment(command.loan_charge_id, transaction, Some(&holiday), business_date)?
        };

        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_changed(&loan, changed.as_ref())?;
        self.save_note(&loan, Some(transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(
            &snapshot.existing,
            &snapshot.reversed,
            command.is_account_transfer,
        ))?;
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::ChargePayment,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);

        info!(
            loan_id = %loan.id(),
            transaction_id = %transaction_id,
            loan_charge_id = %command.loan_charge_id,
            amount = %command.transaction_amount,
            "charge payment posted"
        );
        self.transaction_result(&loan, transaction_id)
    }

    // ========== Refunds ==========

    /// Refunds part of the overpaid balance.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan is not
    /// overpaid by at least the amount or persisting fails.
    pub fn make_refund(
        &self,
        command: TransactionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::Refund, loan.id()));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        let transaction = LoanTransaction::refund(
            loan.loan_ref(),
            Money::of(loan.currency(), command.transaction_amount),
            command.payment_detail,
            command.transaction_date,
            command.external_id,
        )?;
        let transaction_id = transaction.id();
        loan.make_refund(transaction, business_date)?;

        self.persist_refund(&mut loan, &snapshot, transaction_id, command.note, command.is_account_transfer)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::Refund,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, amount = %command.transaction_amount, "refund posted");
        self.transaction_result(&loan, transaction_id)
    }

    /// Hands back payments made on an active loan.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan is not
    /// active, the amount exceeds what was paid or persisting fails.
    pub fn make_refund_for_active_loan(
        &self,
        command: TransactionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::RefundForActiveLoan, loan.id()));
        let snapshot = Snapshot::of(&loan);

        let transaction = LoanTransaction::refund_for_active_loan(
            loan.loan_ref(),
            Money::of(loan.currency(), command.transaction_amount),
            command.payment_detail,
            command.transaction_date,
            command.external_id,
        )?;
        let transaction_id = transaction.id();
        let holiday = self.holiday_detail(&loan, command.transaction_date)?;
        let changed = loan.make_refund_for_active_loan(transaction, Some(&holiday), business_date)?;

        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_changed(&loan, changed.as_ref())?;
        self.save_note(&loan, Some(transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(
            &snapshot.existing,
            &snapshot.reversed,
            command.is_account_transfer,
        ))?;
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::RefundForActiveLoan,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, amount = %command.transaction_amount, "refund for active loan posted");
        self.transaction_result(&loan, transaction_id)
    }

    /// Pays the credit balance back to the borrower. Allowed whatever the
    /// state of the client or group.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the loan is not overpaid by at least the
    /// amount or persisting fails.
    pub fn credit_balance_refund(
        &self,
        command: TransactionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::CreditBalanceRefund, loan.id()));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        let transaction = LoanTransaction::credit_balance_refund(
            loan.loan_ref(),
            Money::of(loan.currency(), command.transaction_amount),
            command.transaction_date,
            command.external_id,
            command.payment_detail,
        )?;
        let transaction_id = transaction.id();
        loan.credit_balance_refund(transaction, business_date)?;

        self.persist_refund(&mut loan, &snapshot, transaction_id, command.note, command.is_account_transfer)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::CreditBalanceRefund,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, amount = %command.transaction_amount, "credit balance refund posted");
        self.transaction_result(&loan, transaction_id)
    }

    fn persist_refund(
        &self,
        loan: &mut Loan,
        snapshot: &Snapshot,
        transaction_id: LoanTransactionId,
        note: Option<String>,
        is_account_transfer: bool,
    ) -> Result<(), LoanError> {
        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(loan)?;
        self.save_note(loan, Some(transaction_id), note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(
            &snapshot.existing,
            &snapshot.reversed,
            is_account_transfer,
        ))
    }

    // ========== Foreclosure ==========

    /// Closes the loan early, collecting everything due up to the date.
    ///
    /// With periodic accrual, income is first accrued up to the foreclosure
    /// date. The payoff repayment is omitted when nothing is owed. The
    /// result lists the transactions posted and reports the principal
    /// settled as a negative event amount.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan is not
    /// active, the loan cannot be foreclosed on that date or persisting fails.
    /// An overpaid loan must be refunded first.
    pub fn fore_close_loan(
        &self,
        command: ForeclosureCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let date = command.transaction_date;
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        loan.status().transition(LoanEvent::ForeClosure)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::ForeClosure, loan.id()));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        // 1. Catch-up accrual
        let accrual_id = loan.foreclosure_accrual(date, business_date)?;

        // 2. Payoff
        let detail = loan.fetch_foreclosure_detail(date);
        let payoff = if detail.total() > Decimal::ZERO {
            Some(LoanTransaction::repayment(
                loan.loan_ref(),
                Money::of(loan.currency(), detail.total()),
                None,
                date,
                command.external_id,
            )?)
        } else {
            None
        };
        let payoff_id = loan.handle_foreclosure(date, payoff, business_date)?;

        // 3. Persist
        self.save_touched(&loan, &snapshot)?;
        self.save_loan(&mut loan)?;
        self.save_note(&loan, payoff_id, command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, false))?;
        self.update_delinquency(&loan, business_date)?;

        // 4. Post-events
        let event = payoff_id.map_or_else(
            || LoanBusinessEvent::loan(LoanEventKind::ForeClosure, loan.id()),
            |id| LoanBusinessEvent::transaction(LoanEventKind::ForeClosure, loan.id(), id),
        );
        events.notify_post_business_event(&event);
        Self::notify_balance_changed(&loan, events);
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        let transaction_ids: Vec<LoanTransactionId> = accrual_id.into_iter().chain(payoff_id).collect();
        info!(
            loan_id = %loan.id(),
            %date,
            principal = %detail.principal,
            payoff = %detail.total(),
            transactions = transaction_ids.len(),
            "loan foreclosed"
        );
        Ok(CommandProcessingResult::builder(&loan)
            .with_transaction_ids(transaction_ids)
            .with_change("transactionDate", date.to_string())
            .with_event_amount(settled_principal(detail.principal))
            .build())
    }

    // ========== Waivers and write-off ==========

    /// Waives outstanding interest. With periodic accrual, the part never
    /// accrued is booked as unrecognized income.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the waiver exceeds
    /// the interest outstanding or persisting fails.
    pub fn waive_interest(
        &self,
        command: WaiveInterestCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::WaiveInterest, loan.id()));
        let snapshot = Snapshot::of(&loan);

        let currency = loan.currency();
        let unrecognized = loan.unrecognized_waiver_income(command.transaction_amount, command.transaction_date);
        let transaction = LoanTransaction::waiver(
            loan.loan_ref(),
            Money::of(currency, command.transaction_amount),
            command.transaction_date,
            Money::of(currency, unrecognized),
            command.external_id,
        )?;
        let transaction_id = transaction.id();
        let changed = loan.waive_interest(transaction, business_date)?;

        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_changed(&loan, changed.as_ref())?;
        self.save_note(&loan, Some(transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, false))?;
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::WaiveInterest,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, amount = %command.transaction_amount, %unrecognized, "interest waived");
        self.transaction_result(&loan, transaction_id)
    }

    /// Writes off everything outstanding.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the client is inactive, the loan is not
    /// active or persisting fails.
    pub fn write_off(
        &self,
        command: WriteOffCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        events.notify_pre_business_event(&LoanBusinessEvent::loan(LoanEventKind::WriteOff, loan.id()));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        let transaction_id = loan.write_off(command.transaction_date, command.external_id, business_date)?;

        self.save_transaction(loan.transaction(transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_note(&loan, Some(transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, false))?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::WriteOff,
            loan.id(),
            transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        info!(loan_id = %loan.id(), transaction_id = %transaction_id, "loan written off");
        self.transaction_result(&loan, transaction_id)
    }

    // ========== Reversal ==========

    /// Reverses a transaction, replaying history when it touched the schedule.
    ///
    /// # Errors
    ///
    /// Returns `LoanError` when the transaction does not exist, a later
    /// charge refund forbids the reversal or persisting fails.
    pub fn reverse_transaction(
        &self,
        command: ReverseTransactionCommand,
        events: &dyn BusinessEventNotifier,
    ) -> Result<CommandProcessingResult, LoanError> {
        let business_date = self.business_date();
        let mut loan = self.load(command.loan_id)?;
        Self::check_client_and_group_active(&loan)?;
        loan.validate_transaction_date(command.transaction_date, business_date)?;
        events.notify_pre_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::TransactionReversal,
            loan.id(),
            command.transaction_id,
        ));
        let snapshot = Snapshot::of(&loan);
        let status_before = loan.status();

        let changed =
            loan.reverse_transaction(command.transaction_id, command.transaction_date, command.reversal_external_id)?;

        self.save_transaction(loan.transaction(command.transaction_id)?)?;
        self.save_loan(&mut loan)?;
        self.save_changed(&loan, changed.as_ref())?;
        self.save_note(&loan, Some(command.transaction_id), command.note)?;
        self.post_journal(&loan.derive_accounting_bridge_data(&snapshot.existing, &snapshot.reversed, false))?;
        self.recalculate_accruals(&mut loan)?;
        self.update_delinquency(&loan, business_date)?;
        events.notify_post_business_event(&LoanBusinessEvent::transaction(
            LoanEventKind::TransactionReversal,
            loan.id(),
            command.transaction_id,
        ));
        Self::notify_balance_changed(&loan, events);
        self.disable_standing_instructions_if_closed(&loan, status_before)?;

        let transaction = loan.transaction(command.transaction_id)?;
        info!(loan_id = %loan.id(), transaction_id = %command.transaction_id, "transaction reversed");
        let mut builder = CommandProcessingResult::builder(&loan)
            .with_transaction(command.transaction_id, transaction.reversal_external_id());
        if let Some(changed) = &changed {
            builder = builder.with_transaction_ids(changed.new_transaction_mappings().iter().map(|(_, t)| t.id()));
        }
        Ok(builder.build())
    }

    // ========== Shared steps ==========

    /// Business date: the configured override, else the provider's.
    pub(super) fn business_date(&self) -> NaiveDate {
        self.config
            .business_date
            .unwrap_or_else(|| self.collaborators.business_dates.business_date())
    }

    pub(super) fn load(&self, loan_id: LoanId) -> Result<Loan, LoanError> {
        self.store
            .find_loan(loan_id)
            .map_err(translate)?
            .ok_or(LoanError::LoanNotFound(loan_id))
    }

    pub(super) fn check_client_and_group_active(loan: &Loan) -> Result<(), LoanError> {
        if let Some(client) = loan.client()
            && !client.active
        {
            return Err(LoanError::ClientNotActive(client.id));
        }
        if let Some(group) = loan.group()
            && !group.active
        {
            return Err(LoanError::GroupNotActive(group.id));
        }
        Ok(())
    }

    fn holiday_detail(&self, loan: &Loan, date: NaiveDate) -> Result<HolidayDetail, LoanError> {
        Ok(HolidayDetail {
            holidays: self.collaborators.calendar.holidays_from(loan.office_id(), date),
            working_days: WorkingDays::from_rrule(&self.config.working_days)?,
            allow_transactions_on_holiday: self.config.allow_transactions_on_holiday,
            allow_transactions_on_non_working_day: self.config.allow_transactions_on_non_working_day,
        })
    }

    pub(super) fn save_transaction(&self, transaction: &LoanTransaction) -> Result<(), LoanError> {
        self.store.save_transaction(transaction).map_err(translate)
    }

    pub(super) fn save_loan(&self, loan: &mut Loan) -> Result<(), LoanError> {
        let version = self.store.save_loan(loan).map_err(translate)?;
        loan.mark_persisted(version);
        Ok(())
    }

    /// Persists replaced transactions one at a time: the reversed original
    /// first so its external id is free for the replacement.
    fn save_changed(&self, loan: &Loan, changed: Option<&ChangedTransactionDetail>) -> Result<(), LoanError> {
        let Some(changed) = changed else {
            return Ok(());
        };
        for (superseded, replacement) in changed.new_transaction_mappings() {
            self.save_transaction(loan.transaction(*superseded)?)?;
            self.save_transaction(loan.transaction(replacement.id())?)?;
            self.store
                .relink_transfers(*superseded, replacement.id())
                .map_err(translate)?;
        }
        Ok(())
    }

    /// Persists every transaction reversed or added since `snapshot`, reversals first.
    pub(super) fn save_touched(&self, loan: &Loan, snapshot: &Snapshot) -> Result<(), LoanError> {
        let newly_reversed = loan
            .transactions()
            .iter()
            .filter(|t| snapshot.existing.contains(&t.id()) && t.is_reversed() && !snapshot.reversed.contains(&t.id()));
        let added = loan.transactions().iter().filter(|t| !snapshot.existing.contains(&t.id()));
        for transaction in newly_reversed.chain(added) {
            self.save_transaction(transaction)?;
        }
        Ok(())
    }

    pub(super) fn save_note(
        &self,
        loan: &Loan,
        transaction_id: Option<LoanTransactionId>,
        text: Option<String>,
    ) -> Result<(), LoanError> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(());
        };
        let note = Note {
            id: NoteId::new(),
            loan_id: loan.id(),
            transaction_id,
            text,
        };
        self.store.save_note(&note).map_err(translate)
    }

    pub(super) fn post_journal(&self, bridge: &AccountingBridgeData) -> Result<(), LoanError> {
        if !bridge.has_transactions() {
            return Ok(());
        }
        self.collaborators.journal.create_journal_entries(bridge)
    }

    pub(super) fn update_delinquency(&self, loan: &Loan, business_date: NaiveDate) -> Result<(), LoanError> {
        let age = loan.age_of_overdue_days(business_date);
        if age > 0 {
            self.collaborators.delinquency.apply_delinquency_tag(loan.id(), age)
        } else {
            self.collaborators.delinquency.remove_delinquency_tag(loan.id())
        }
    }

    pub(super) fn notify_balance_changed(loan: &Loan, events: &dyn BusinessEventNotifier) {
        events.notify_post_business_event(&LoanBusinessEvent::loan(LoanEventKind::BalanceChanged, loan.id()));
    }

    fn disable_standing_instructions_if_closed(
        &self,
        loan: &Loan,
        status_before: crate::loan::status::LoanStatus,
    ) -> Result<(), LoanError> {
        if status_before.is_closed() || !loan.status().is_closed() {
            return Ok(());
        }
        let disabled = self
            .store
            .disable_standing_instructions(loan.id())
            .map_err(translate)?;
        if disabled > 0 {
            info!(loan_id = %loan.id(), disabled, "standing instructions disabled");
        }
        Ok(())
    }

    /// Walks the installments the transaction paid into, in order, and
    /// marks each one's post-dated check paid or pending. Stops at the first
    /// installment without a check.
    fn update_post_dated_checks(&self, loan: &Loan, transaction_id: LoanTransactionId) -> Result<(), LoanError> {
        for mapping in loan.transaction(transaction_id)?.installment_mappings() {
            let Some(check) = self
                .store
                .find_check(loan.id(), mapping.installment_number)
                .map_err(translate)?
            else {
                break;
            };
            let paid = loan
                .installments()
                .iter()
                .find(|i| i.number == mapping.installment_number)
                .is_some_and(|i| i.is_fully_paid());
            let status = if paid {
                PostDatedCheckStatus::Paid
            } else {
                PostDatedCheckStatus::Pending
            };
            self.store.update_check_status(check.id, status).map_err(translate)?;
        }
        Ok(())
    }

    fn transaction_result(
        &self,
        loan: &Loan,
        transaction_id: LoanTransactionId,
    ) -> Result<CommandProcessingResult, LoanError> {
        let transaction = loan.transaction(transaction_id)?;
        Ok(CommandProcessingResult::builder(loan)
            .with_transaction(transaction_id, transaction.external_id())
            .with_change("transactionAmount", transaction.amount().to_string())
            .with_change("transactionDate", transaction.transaction_date().to_string())
            .build())
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::loan::aggregate::tests::{active_loan, application, date, principal_settled_loan};
    use crate::loan::aggregate::{ClientRef, LoanType};
    use crate::loan::product::AccountingRule;
    use crate::loan::status::LoanStatus;
    use crate::servicing::memory::InMemoryLoanStore;
    use crate::servicing::ports::{
        AccountTransfer, LoanRepository, MockBusinessDateProvider,
        MockBusinessEventNotifier, MockDelinquencyTagger, MockHolidayCalendar, MockJournalEntryPoster, PostDatedCheck,
        StandingInstruction,
    };
    use crate::transaction::allocation::ChargeRefundChargeType;
    use crate::transaction::types::LoanTransactionType;
    use loanbook_shared::types::{AccountTransferId, ClientId, ExternalId, PostDatedCheckId};
    use rust_decimal_macros::dec;

    pub(crate) fn collaborators(business_date: NaiveDate) -> Collaborators {
        let mut journal = MockJournalEntryPoster::new();
        journal.expect_create_journal_entries().returning(|_| Ok(()));
        let mut delinquency = MockDelinquencyTagger::new();
        delinquency.expect_apply_delinquency_tag().returning(|_, _| Ok(()));
        delinquency.expect_remove_delinquency_tag().returning(|_| Ok(()));
        let mut calendar = MockHolidayCalendar::new();
        calendar.expect_holidays_from().returning(|_, _| Vec::new());
        let mut business_dates = MockBusinessDateProvider::new();
        business_dates.expect_business_date().return_const(business_date);
        Collaborators {
            journal: Arc::new(journal),
            delinquency: Arc::new(delinquency),
            calendar: Arc::new(calendar),
            business_dates: Arc::new(business_dates),
        }
    }

    pub(crate) fn quiet_events() -> MockBusinessEventNotifier {
        let mut events = MockBusinessEventNotifier::new();
        events.expect_notify_pre_business_event().return_const(());
        events.expect_notify_post_business_event().return_const(());
        events
    }

    pub(crate) fn service_with(loan: &Loan, business_date: NaiveDate) -> LoanAccountDomainService<InMemoryLoanStore> {
        let store = InMemoryLoanStore::new();
        store.save_loan(loan).unwrap();
        LoanAccountDomainService::new(store, collaborators(business_date), ServicingConfig::default())
    }

    fn repayment(loan_id: LoanId, amount: Decimal, on: NaiveDate) -> RepaymentCommand {
        RepaymentCommand {
            loan_id,
            transaction_type: LoanTransactionType::Repayment,
            transaction_amount: amount,
            transaction_date: on,
            external_id: None,
            payment_detail: None,
            charge_refund_charge_type: None,
            note: None,
            is_account_transfer: false,
            is_loan_to_loan_transfer: false,
            is_holiday_validation_done: false,
        }
    }

    #[test]
    fn test_inactive_client_rejected_before_any_event() {
        let mut app = application(AccountingRule::None);
        app.client = Some(ClientRef {
            id: ClientId::new(),
            active: false,
        });
        let mut loan = Loan::submit(app).unwrap();
        loan.approve(date(1, 1)).unwrap();
        loan.disburse(date(1, 1), None, None, date(1, 1)).unwrap();
        let service = service_with(&loan, date(3, 1));

        let mut events = MockBusinessEventNotifier::new();
        events.expect_notify_pre_business_event().times(0);
        events.expect_notify_post_business_event().times(0);
        let err = service
            .make_repayment(repayment(loan.id(), dec!(100), date(1, 31)), &events)
            .unwrap_err();
        assert!(matches!(err, LoanError::ClientNotActive(_)));
        assert_eq!(service.store().transaction_count(), 0);
    }

    #[test]
    fn test_repayment_persists_and_notifies() {
        let loan = active_loan(AccountingRule::Cash);
        let service = service_with(&loan, date(3, 1));
        let mut events = MockBusinessEventNotifier::new();
        events
            .expect_notify_pre_business_event()
            .withf(|e| e.kind == LoanEventKind::Repayment && e.transaction_id.is_none())
            .times(1)
            .return_const(());
        events
            .expect_notify_post_business_event()
            .withf(|e| e.kind == LoanEventKind::Repayment)
            .times(1)
            .return_const(());
        events
            .expect_notify_post_business_event()
            .withf(|e| e.kind == LoanEventKind::BalanceChanged)
            .times(1)
            .return_const(());

        let mut command = repayment(loan.id(), dec!(1000), date(1, 31));
        command.note = Some("first instalment".into());
        let result = service.make_repayment(command, &events).unwrap();

        let id = result.transaction_ids[0];
        let stored = service.store().transaction(id).unwrap();
        assert_eq!(stored.principal_portion(), Some(dec!(900)));
        assert_eq!(stored.interest_portion(), Some(dec!(100)));
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.principal_outstanding(), dec!(9100));
        assert_eq!(reloaded.version(), 2);
        assert_eq!(service.store().notes_for(loan.id()).len(), 1);
    }

    #[test]
    fn test_duplicate_external_id_keeps_first_posting() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let events = quiet_events();

        let mut first = repayment(loan.id(), dec!(100), date(1, 31));
        first.external_id = ExternalId::parse("rcpt-1");
        service.make_repayment(first.clone(), &events).unwrap();

        let err = service.make_repayment(first, &events).unwrap_err();
        assert_eq!(err.parameter(), Some("externalId"));
        assert_eq!(
            err.error_code(),
            "validation.msg.loan.transaction.externalId.value.must.be.unique"
        );
        assert_eq!(service.store().transaction_count(), 1);
    }

    #[test]
    fn test_back_dated_repayment_replaces_and_relinks() {
        let loan = active_loan(AccountingRule::Cash);
        let service = service_with(&loan, date(3, 1));
        let events = quiet_events();

        let mut later = repayment(loan.id(), dec!(2000), date(3, 1));
        later.external_id = ExternalId::parse("late");
        let later_id = service.make_repayment(later, &events).unwrap().transaction_ids[0];
        let transfer = AccountTransfer {
            id: AccountTransferId::new(),
            from_loan_transaction: None,
            to_loan_transaction: Some(later_id),
            amount: dec!(2000),
        };
        service.store().add_transfer(transfer.clone());

        service
            .make_repayment(repayment(loan.id(), dec!(1000), date(1, 31)), &events)
            .unwrap();

        let original = service.store().transaction(later_id).unwrap();
        assert!(original.is_reversed());
        assert_eq!(original.external_id(), None);
        let relinked = service.store().transfer(transfer.id).unwrap().to_loan_transaction.unwrap();
        assert_ne!(relinked, later_id);
        let replacement = service.store().transaction(relinked).unwrap();
        assert!(replacement.is_not_reversed());
        assert_eq!(replacement.external_id().map(ExternalId::as_str), Some("late"));
        assert_eq!(replacement.amount(), dec!(2000));
    }

    #[test]
    fn test_full_repayment_closes_and_stops_standing_instructions() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let instruction = StandingInstruction {
            id: AccountTransferId::new(),
            loan_id: loan.id(),
            active: true,
        };
        service.store().add_standing_instruction(instruction.clone());

        service
            .make_repayment(repayment(loan.id(), loan.total_outstanding(), date(2, 1)), &quiet_events())
            .unwrap();

        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.status(), LoanStatus::ClosedObligationsMet);
        assert!(!service.store().standing_instruction(instruction.id).unwrap().active);
    }

    #[test]
    fn test_post_dated_checks_follow_paid_installments() {
        let loan = active_loan(AccountingRule::None);
        assert_eq!(loan.loan_type(), LoanType::Individual);
        let service = service_with(&loan, date(3, 1));
        let first = PostDatedCheck {
            id: PostDatedCheckId::new(),
            loan_id: loan.id(),
            installment_number: 1,
            amount: dec!(1000),
            status: PostDatedCheckStatus::Pending,
        };
        service.store().add_post_dated_check(first.clone());

        let due = loan.installments()[0].total_outstanding();
        service
            .make_repayment(repayment(loan.id(), due + dec!(10), date(1, 31)), &quiet_events())
            .unwrap();

        assert_eq!(service.store().check(first.id).unwrap().status, PostDatedCheckStatus::Paid);
    }

    #[test]
    fn test_charge_refund_skips_post_event_but_reports_balance() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let mut events = MockBusinessEventNotifier::new();
        events.expect_notify_pre_business_event().return_const(());
        events
            .expect_notify_post_business_event()
            .withf(|e| e.kind == LoanEventKind::ChargeRefund)
            .times(0);
        events
            .expect_notify_post_business_event()
            .withf(|e| e.kind == LoanEventKind::BalanceChanged)
            .times(1)
            .return_const(());

        let mut command = repayment(loan.id(), dec!(50), date(1, 31));
        command.transaction_type = LoanTransactionType::ChargeRefund;
        command.charge_refund_charge_type = Some(ChargeRefundChargeType::Fee);
        service.make_repayment(command, &events).unwrap();
    }

    #[test]
    fn test_non_repayment_type_is_rejected() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let mut command = repayment(loan.id(), dec!(50), date(1, 31));
        command.transaction_type = LoanTransactionType::Disbursement;
        let err = service.make_repayment(command, &quiet_events()).unwrap_err();
        assert_eq!(err.parameter(), Some("transactionType"));
    }

    #[test]
    fn test_journal_failure_rolls_back_unit_of_work() {
        let loan = active_loan(AccountingRule::Cash);
        let store = InMemoryLoanStore::new();
        store.save_loan(&loan).unwrap();
        let mut collaborators = collaborators(date(3, 1));
        let mut journal = MockJournalEntryPoster::new();
        journal
            .expect_create_journal_entries()
            .returning(|_| Err(LoanError::JournalPosting("ledger closed".into())));
        collaborators.journal = Arc::new(journal);
        let service = LoanAccountDomainService::new(store, collaborators, ServicingConfig::default());

        let err = service
            .store()
            .in_transaction(|_| service.make_repayment(repayment(loan.id(), dec!(100), date(1, 31)), &quiet_events()))
            .unwrap_err();
        assert_eq!(err.error_code(), "error.msg.journal.entry.posting.failed");
        assert_eq!(service.store().transaction_count(), 0);
        assert_eq!(service.store().find_loan(loan.id()).unwrap().unwrap().version(), 1);
    }

    #[test]
    fn test_delinquency_tagged_when_overdue() {
        let loan = active_loan(AccountingRule::None);
        let store = InMemoryLoanStore::new();
        store.save_loan(&loan).unwrap();
        let mut collaborators = collaborators(date(3, 1));
        let mut delinquency = MockDelinquencyTagger::new();
        delinquency
            .expect_apply_delinquency_tag()
            .withf(|_, age| *age == 29)
            .times(1)
            .returning(|_, _| Ok(()));
        delinquency.expect_remove_delinquency_tag().times(0);
        collaborators.delinquency = Arc::new(delinquency);
        let service = LoanAccountDomainService::new(store, collaborators, ServicingConfig::default());

        service
            .make_repayment(repayment(loan.id(), dec!(100), date(1, 31)), &quiet_events())
            .unwrap();
    }

    #[test]
    fn test_foreclosure_reports_negative_principal() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let principal = loan.principal_outstanding();
        let instruction = StandingInstruction {
            id: AccountTransferId::new(),
            loan_id: loan.id(),
            active: true,
        };
        service.store().add_standing_instruction(instruction.clone());

        let result = service
            .fore_close_loan(
                ForeclosureCommand {
                    loan_id: loan.id(),
                    transaction_date: date(2, 15),
                    external_id: None,
                    note: None,
                },
                &quiet_events(),
            )
            .unwrap();

        assert_eq!(result.event_amount, Some(-principal));
        assert_eq!(result.transaction_ids.len(), 1);
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.status(), LoanStatus::ClosedObligationsMet);
        assert!(!service.store().standing_instruction(instruction.id).unwrap().active);
    }

    #[test]
    fn test_foreclosure_without_payoff_reports_zero_principal() {
        let loan = principal_settled_loan(date(2, 1));
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.fetch_foreclosure_detail(date(2, 1)).total(), dec!(0));
        let service = service_with(&loan, date(3, 1));

        let result = service
            .fore_close_loan(
                ForeclosureCommand {
                    loan_id: loan.id(),
                    transaction_date: date(2, 1),
                    external_id: None,
                    note: None,
                },
                &quiet_events(),
            )
            .unwrap();

        assert!(result.transaction_ids.is_empty());
        let event_amount = result.event_amount.unwrap();
        assert_eq!(event_amount, Decimal::ZERO);
        assert!(!event_amount.is_sign_negative());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["eventAmount"], serde_json::Value::from("0"));
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.status(), LoanStatus::ClosedObligationsMet);
    }

    #[test]
    fn test_overpaid_loan_keeps_credit_balance_when_foreclosure_refused() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        service
            .make_repayment(repayment(loan.id(), loan.total_outstanding() + dec!(300), date(2, 1)), &quiet_events())
            .unwrap();

        let mut events = MockBusinessEventNotifier::new();
        events.expect_notify_pre_business_event().times(0);
        events.expect_notify_post_business_event().times(0);
        let err = service
            .fore_close_loan(
                ForeclosureCommand {
                    loan_id: loan.id(),
                    transaction_date: date(2, 10),
                    external_id: None,
                    note: None,
                },
                &events,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LoanError::InvalidStatusTransition {
                from: LoanStatus::Overpaid,
                ..
            }
        ));
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.status(), LoanStatus::Overpaid);

        service
            .credit_balance_refund(
                TransactionCommand {
                    loan_id: loan.id(),
                    transaction_amount: dec!(300),
                    transaction_date: date(2, 10),
                    external_id: None,
                    payment_detail: None,
                    note: None,
                    is_account_transfer: false,
                },
                &quiet_events(),
            )
            .unwrap();
        assert_eq!(
            service.store().find_loan(loan.id()).unwrap().unwrap().status(),
            LoanStatus::ClosedObligationsMet
        );
    }

    #[test]
    fn test_overpayment_refund_and_credit_balance_refund() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        let events = quiet_events();
        service
            .make_repayment(repayment(loan.id(), loan.total_outstanding() + dec!(300), date(2, 1)), &events)
            .unwrap();
        assert_eq!(
            service.store().find_loan(loan.id()).unwrap().unwrap().status(),
            LoanStatus::Overpaid
        );

        let refund = |amount| TransactionCommand {
            loan_id: loan.id(),
            transaction_amount: amount,
            transaction_date: date(2, 10),
            external_id: None,
            payment_detail: None,
            note: None,
            is_account_transfer: false,
        };
        service.make_refund(refund(dec!(100)), &events).unwrap();
        let err = service.credit_balance_refund(refund(dec!(500)), &events).unwrap_err();
        assert!(matches!(err, LoanError::RefundExceedsOverpaid { .. }));
        service.credit_balance_refund(refund(dec!(200)), &events).unwrap();
        assert_eq!(
            service.store().find_loan(loan.id()).unwrap().unwrap().status(),
            LoanStatus::ClosedObligationsMet
        );
    }

    #[test]
    fn test_reversal_restores_balance() {
        let loan = active_loan(AccountingRule::Cash);
        let service = service_with(&loan, date(3, 1));
        let events = quiet_events();
        let id = service
            .make_repayment(repayment(loan.id(), dec!(1000), date(1, 31)), &events)
            .unwrap()
            .transaction_ids[0];

        let result = service
            .reverse_transaction(
                ReverseTransactionCommand {
                    loan_id: loan.id(),
                    transaction_id: id,
                    transaction_date: date(2, 1),
                    reversal_external_id: ExternalId::parse("rev-1"),
                    note: Some("bounced".into()),
                },
                &events,
            )
            .unwrap();

        assert_eq!(result.resource_external_id.as_ref().map(ExternalId::as_str), Some("rev-1"));
        assert!(service.store().transaction(id).unwrap().is_reversed());
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.principal_outstanding(), dec!(10000));
    }

    #[test]
    fn test_write_off_closes_loan() {
        let loan = active_loan(AccountingRule::None);
        let service = service_with(&loan, date(3, 1));
        service
            .write_off(
                WriteOffCommand {
                    loan_id: loan.id(),
                    transaction_date: date(2, 20),
                    external_id: None,
                    note: None,
                },
                &quiet_events(),
            )
            .unwrap();
        let reloaded = service.store().find_loan(loan.id()).unwrap().unwrap();
        assert_eq!(reloaded.status(), LoanStatus::ClosedWrittenOff);

        let mut recovery = repayment(loan.id(), dec!(250), date(2, 25));
        recovery.transaction_type = LoanTransactionType::RecoveryRepayment;
        service.make_repayment(recovery, &quiet_events()).unwrap();
    }

    #[test]
    fn test_configured_business_date_wins() {
        let loan = active_loan(AccountingRule::None);
        let store = InMemoryLoanStore::new();
        store.save_loan(&loan).unwrap();
        let config = ServicingConfig {
            business_date: Some(date(1, 15)),
            ..ServicingConfig::default()
        };
        let service = LoanAccountDomainService::new(store, collaborators(date(3, 1)), config);
        let err = service
            .make_repayment(repayment(loan.id(), dec!(100), date(1, 31)), &quiet_events())
            .unwrap_err();
        assert!(matches!(err, LoanError::TransactionDateInFuture { .. }));
    }
}
