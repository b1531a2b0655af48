//! The loan aggregate.
//!
//! A `Loan` owns its schedule, charges and transactions. Callers hold it
//! exclusively for the duration of one operation; every mutation goes
//! through a method here that validates first and returns what changed.

mod accrual;
mod foreclosure;
mod posting;
mod replay;

use std::collections::HashSet;

use chrono::NaiveDate;
use loanbook_shared::types::{
    ClientId, ExternalId, GroupId, LoanChargeId, LoanId, LoanProductId, LoanTransactionId, MonetaryCurrency, Money,
    OfficeId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use foreclosure::ForeclosureDetail;
pub use posting::ReceivableIncome;

use crate::error::LoanError;
use crate::loan::charge::LoanCharge;
use crate::loan::product::{AccountingRule, LoanProductTerms};
use crate::loan::schedule::{RepaymentInstallment, ScheduleGenerator};
use crate::loan::status::{LoanEvent, LoanStatus};
use crate::transaction::allocation::PaymentDetail;
use crate::transaction::bridge::{AccountingBridgeData, LoanTransactionBridgeData};
use crate::transaction::record::{LoanRef, LoanTransaction};

/// Borrower client as seen by the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    /// Client id.
    pub id: ClientId,
    /// Whether the client is active.
    pub active: bool,
}

/// Borrower group as seen by the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Group id.
    pub id: GroupId,
    /// Whether the group is active.
    pub active: bool,
}

/// Who the loan is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanType {
    /// A single client.
    Individual,
    /// A group.
    Group,
    /// A client within a joint-liability group.
    Jlg,
}

/// Secondary status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanSubStatus {
    /// Closed early through foreclosure.
    ForeClosed,
}

/// Input to [`Loan::submit`].
#[derive(Debug, Clone)]
pub struct LoanApplication {
    /// Unique account number.
    pub account_no: String,
    /// Optional external id.
    pub external_id: Option<ExternalId>,
    /// Office.
    pub office_id: OfficeId,
    /// Borrower client.
    pub client: Option<ClientRef>,
    /// Borrower group.
    pub group: Option<GroupRef>,
    /// Loan type.
    pub loan_type: LoanType,
    /// Product terms.
    pub terms: LoanProductTerms,
    /// Submission date.
    pub submitted_on: NaiveDate,
    /// Expected disbursement date.
    pub expected_disbursement_on: NaiveDate,
    /// Charges attached at submission.
    pub charges: Vec<LoanCharge>,
}

/// A loan account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    account_no: String,
    external_id: Option<ExternalId>,
    office_id: OfficeId,
    client: Option<ClientRef>,
    group: Option<GroupRef>,
    loan_type: LoanType,
    terms: LoanProductTerms,
    status: LoanStatus,
    sub_status: Option<LoanSubStatus>,
    submitted_on: NaiveDate,
    expected_disbursement_on: NaiveDate,
    approved_on: Option<NaiveDate>,
    disbursed_on: Option<NaiveDate>,
    closed_on: Option<NaiveDate>,
    written_off_on: Option<NaiveDate>,
    accrued_till: Option<NaiveDate>,
    interest_calculated_from: Option<NaiveDate>,
    installments: Vec<RepaymentInstallment>,
    charges: Vec<LoanCharge>,
    transactions: Vec<LoanTransaction>,
    version: u64,
}

impl Loan {
    // ========== Lifecycle ==========

    /// Opens a loan application.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank account number, a
    /// non-positive principal, zero installments, an expected disbursement
    /// before submission, or a charge in another currency's scale.
    pub fn submit(application: LoanApplication) -> Result<Self, LoanError> {
        if application.account_no.trim().is_empty() {
            return Err(LoanError::validation("loan", "accountNo", "cannot.be.blank", None));
        }
        if application.terms.principal <= Decimal::ZERO {
            return Err(LoanError::validation(
                "loan",
                "principal",
                "must.be.greater.than.zero",
                Some(application.terms.principal.to_string()),
            ));
        }
        if application.terms.number_of_repayments == 0 {
            return Err(LoanError::validation(
                "loan",
                "numberOfRepayments",
                "must.be.greater.than.zero",
                Some("0".into()),
            ));
        }
        if application.expected_disbursement_on < application.submitted_on {
            return Err(LoanError::validation(
                "loan",
                "expectedDisbursementDate",
                "cannot.be.before.submittal.date",
                Some(application.expected_disbursement_on.to_string()),
            ));
        }

        Ok(Self {
            id: LoanId::new(),
            account_no: application.account_no.trim().to_string(),
            external_id: application.external_id,
            office_id: application.office_id,
            client: application.client,
            group: application.group,
            loan_type: application.loan_type,
            terms: application.terms,
            status: LoanStatus::SubmittedAndPendingApproval,
            sub_status: None,
            submitted_on: application.submitted_on,
            expected_disbursement_on: application.expected_disbursement_on,
            approved_on: None,
            disbursed_on: None,
            closed_on: None,
            written_off_on: None,
            accrued_till: None,
            interest_calculated_from: None,
            installments: Vec::new(),
            charges: application.charges,
            transactions: Vec::new(),
            version: 0,
        })
    }

    /// Approves the application.
    pub fn approve(&mut self, approved_on: NaiveDate) -> Result<(), LoanError> {
        if approved_on < self.submitted_on {
            return Err(LoanError::validation(
                "loan",
                "approvedOnDate",
                "cannot.be.before.submittal.date",
                Some(approved_on.to_string()),
            ));
        }
        self.status = self.status.transition(LoanEvent::Approved)?;
        self.approved_on = Some(approved_on);
        Ok(())
    }

    /// Rejects the application.
    pub fn reject(&mut self, rejected_on: NaiveDate) -> Result<(), LoanError> {
        self.close_application(LoanEvent::Rejected, rejected_on, "rejectedOnDate")
    }

    /// Withdraws the application on the applicant's behalf.
    pub fn withdraw(&mut self, withdrawn_on: NaiveDate) -> Result<(), LoanError> {
        self.close_application(LoanEvent::Withdrawn, withdrawn_on, "withdrawnOnDate")
    }

    fn close_application(&mut self, event: LoanEvent, on: NaiveDate, parameter: &str) -> Result<(), LoanError> {
        if on < self.submitted_on {
            return Err(LoanError::validation(
                "loan",
                parameter,
                "cannot.be.before.submittal.date",
                Some(on.to_string()),
            ));
        }
        self.status = self.status.transition(event)?;
        self.closed_on = Some(on);
        Ok(())
    }

    /// Disburses the approved principal, generating the schedule.
    ///
    /// Specified-due-date charges land in the installment covering their due
    /// date; disbursement charges fall due on the disbursement date.
    ///
    /// # Errors
    ///
    /// Fails when the status does not allow disbursement, the date is in the
    /// future or before approval, or the schedule cannot be generated.
    pub fn disburse(
        &mut self,
        disbursed_on: NaiveDate,
        payment_detail: Option<PaymentDetail>,
        external_id: Option<ExternalId>,
        business_date: NaiveDate,
    ) -> Result<LoanTransactionId, LoanError> {
        let next = self.status.transition(LoanEvent::Disbursed)?;
        if disbursed_on > business_date {
            return Err(LoanError::TransactionDateInFuture {
                date: disbursed_on,
                business_date,
            });
        }
        if self.approved_on.is_some_and(|approved| disbursed_on < approved) {
            return Err(LoanError::validation(
                "loan",
                "actualDisbursementDate",
                "cannot.be.before.approval.date",
                Some(disbursed_on.to_string()),
            ));
        }

        let principal = self.terms.principal;
        self.installments = ScheduleGenerator::generate(&self.terms, principal, disbursed_on)?;
        for index in 0..self.charges.len() {
            if self.charges[index].is_disbursement_charge() {
                self.charges[index].set_due_date(disbursed_on);
            } else {
                let charge = self.charges[index].clone();
                self.add_charge_to_schedule(&charge);
            }
        }

        let mut transaction = LoanTransaction::disbursement(
            self.loan_ref(),
            Money::of(self.currency(), principal),
            payment_detail,
            disbursed_on,
            external_id,
        )?;
        transaction.update_outstanding_loan_balance(principal);
        let id = transaction.id();
        self.transactions.push(transaction);

        self.status = next;
        self.disbursed_on = Some(disbursed_on);
        self.interest_calculated_from = None;
        Ok(id)
    }

    /// Attaches a charge. On a disbursed loan it is added to the schedule immediately.
    pub fn add_charge(&mut self, mut charge: LoanCharge) -> Result<LoanChargeId, LoanError> {
        if self.status.is_closed() || matches!(self.status, LoanStatus::Rejected | LoanStatus::WithdrawnByClient) {
            return Err(LoanError::validation(
                "loan.charge",
                "status",
                "loan.is.not.open",
                Some(self.status.to_string()),
            ));
        }
        if charge.amount() <= Decimal::ZERO {
            return Err(LoanError::validation(
                "loan.charge",
                "amount",
                "must.be.greater.than.zero",
                Some(charge.amount().to_string()),
            ));
        }
        let id = charge.id();
        if let Some(disbursed_on) = self.disbursed_on {
            if charge.is_disbursement_charge() {
                charge.set_due_date(disbursed_on);
            } else {
                self.add_charge_to_schedule(&charge);
            }
        }
        self.charges.push(charge);
        Ok(id)
    }

    fn add_charge_to_schedule(&mut self, charge: &LoanCharge) {
        let target = self
            .installments
            .iter()
            .position(|i| charge.is_due_in_installment(i.from_date, i.due_date, i.number == 1))
            .or_else(|| self.installments.len().checked_sub(1));
        if let Some(position) = target {
            let installment = &mut self.installments[position];
            if charge.is_penalty() {
                installment.penalty_charges_charged += charge.amount();
            } else {
                installment.fee_charges_charged += charge.amount();
            }
            installment.obligations_met_on = None;
        }
    }

    /// Records the version assigned by the store after a save.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }

    // ========== Queries ==========

    /// Loan id.
    #[must_use]
    pub const fn id(&self) -> LoanId {
        self.id
    }

    /// Account number.
    #[must_use]
    pub fn account_no(&self) -> &str {
        &self.account_no
    }

    /// External id.
    #[must_use]
    pub const fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }

    /// Office.
    #[must_use]
    pub const fn office_id(&self) -> OfficeId {
        self.office_id
    }

    /// Borrower client.
    #[must_use]
    pub const fn client(&self) -> Option<ClientRef> {
        self.client
    }

    /// Borrower group.
    #[must_use]
    pub const fn group(&self) -> Option<GroupRef> {
        self.group
    }

    /// Loan type.
    #[must_use]
    pub const fn loan_type(&self) -> LoanType {
        self.loan_type
    }

    /// Individual (single-client) loan.
    #[must_use]
    pub const fn is_individual(&self) -> bool {
        matches!(self.loan_type, LoanType::Individual)
    }

    /// Product terms.
    #[must_use]
    pub const fn terms(&self) -> &LoanProductTerms {
        &self.terms
    }

    /// Product id.
    #[must_use]
    pub const fn product_id(&self) -> LoanProductId {
        self.terms.product_id
    }

    /// Currency.
    #[must_use]
    pub const fn currency(&self) -> MonetaryCurrency {
        self.terms.currency
    }

    /// Accounting basis.
    #[must_use]
    pub const fn accounting_rule(&self) -> AccountingRule {
        self.terms.accounting_rule
    }

    /// Periodic accrual accounting is on.
    #[must_use]
    pub const fn is_periodic_accrual(&self) -> bool {
        self.terms.accounting_rule.is_periodic_accrual()
    }

    /// Interest recalculation is on.
    #[must_use]
    pub const fn is_interest_recalculation_enabled(&self) -> bool {
        self.terms.interest_recalculation_enabled
    }

    /// Status.
    #[must_use]
    pub const fn status(&self) -> LoanStatus {
        self.status
    }

    /// Secondary status.
    #[must_use]
    pub const fn sub_status(&self) -> Option<LoanSubStatus> {
        self.sub_status
    }

    /// Submission date.
    #[must_use]
    pub const fn submitted_on(&self) -> NaiveDate {
        self.submitted_on
    }

    /// Expected disbursement date.
    #[must_use]
    pub const fn expected_disbursement_on(&self) -> NaiveDate {
        self.expected_disbursement_on
    }

    /// Approval date.
    #[must_use]
    pub const fn approved_on(&self) -> Option<NaiveDate> {
        self.approved_on
    }

    /// Disbursement date.
    #[must_use]
    pub const fn disbursed_on(&self) -> Option<NaiveDate> {
        self.disbursed_on
    }

    /// Closure date.
    #[must_use]
    pub const fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_on
    }

    /// Write-off date.
    #[must_use]
    pub const fn written_off_on(&self) -> Option<NaiveDate> {
        self.written_off_on
    }

    /// Accrual watermark.
    #[must_use]
    pub const fn accrued_till(&self) -> Option<NaiveDate> {
        self.accrued_till
    }

    /// Optimistic-lock version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Repayment schedule.
    #[must_use]
    pub fn installments(&self) -> &[RepaymentInstallment] {
        &self.installments
    }

    /// Charges.
    #[must_use]
    pub fn charges(&self) -> &[LoanCharge] {
        &self.charges
    }

    /// One charge.
    pub fn charge(&self, id: LoanChargeId) -> Result<&LoanCharge, LoanError> {
        self.charges
            .iter()
            .find(|c| c.id() == id)
            .ok_or(LoanError::LoanChargeNotFound(id))
    }

    /// Transactions in posting order, reversed ones included.
    #[must_use]
    pub fn transactions(&self) -> &[LoanTransaction] {
        &self.transactions
    }

    /// One transaction.
    pub fn transaction(&self, id: LoanTransactionId) -> Result<&LoanTransaction, LoanError> {
        self.transactions
            .iter()
            .find(|t| t.id() == id)
            .ok_or(LoanError::TransactionNotFound(id))
    }

    /// Identity handed to transaction factories.
    #[must_use]
    pub const fn loan_ref(&self) -> LoanRef {
        LoanRef {
            loan_id: self.id,
            office_id: self.office_id,
            currency: self.terms.currency,
        }
    }

    /// Principal still owed across the schedule.
    #[must_use]
    pub fn principal_outstanding(&self) -> Decimal {
        self.installments.iter().map(RepaymentInstallment::principal_outstanding).sum()
    }

    /// Everything still owed across the schedule.
    #[must_use]
    pub fn total_outstanding(&self) -> Decimal {
        self.installments.iter().map(RepaymentInstallment::total_outstanding).sum()
    }

    /// Everything paid into the schedule.
    #[must_use]
    pub fn total_paid(&self) -> Decimal {
        self.installments.iter().map(RepaymentInstallment::total_paid).sum()
    }

    /// Interest still owed across the schedule.
    #[must_use]
    pub fn interest_outstanding(&self) -> Decimal {
        self.installments.iter().map(RepaymentInstallment::interest_outstanding).sum()
    }

    /// Credit held for the borrower: overpayments received minus what has
    /// been refunded or re-disbursed from them.
    #[must_use]
    pub fn total_overpaid(&self) -> Decimal {
        let overpaid: Decimal = self
            .transactions
            .iter()
            .filter(|t| t.is_not_reversed())
            .map(|t| {
                let kind = t.transaction_type();
                let overpayment = t.overpayment_portion().unwrap_or_default();
                if kind.is_repayment_type() || kind.is_repayment_at_disbursement() || kind.is_charge_payment() {
                    overpayment
                } else if kind.is_refund() {
                    -t.amount()
                } else if kind.is_credit_balance_refund() || kind.is_disbursement() {
                    -overpayment
                } else {
                    Decimal::ZERO
                }
            })
            .sum();
        overpaid.max(Decimal::ZERO)
    }

    /// Days since the oldest unpaid installment fell due; zero when nothing is overdue.
    #[must_use]
    pub fn age_of_overdue_days(&self, business_date: NaiveDate) -> i64 {
        self.installments
            .iter()
            .find(|i| !i.is_fully_paid() && i.due_date < business_date)
            .map_or(0, |i| (business_date - i.due_date).num_days())
    }

    /// Ids of every transaction currently on the loan.
    #[must_use]
    pub fn existing_transaction_ids(&self) -> HashSet<LoanTransactionId> {
        self.transactions.iter().map(LoanTransaction::id).collect()
    }

    /// Ids of every reversed transaction currently on the loan.
    #[must_use]
    pub fn existing_reversed_transaction_ids(&self) -> HashSet<LoanTransactionId> {
        self.transactions
            .iter()
            .filter(|t| t.is_reversed())
            .map(LoanTransaction::id)
            .collect()
    }

    /// Journal payload for transactions added or reversed since the given snapshots.
    #[must_use]
    pub fn derive_accounting_bridge_data(
        &self,
        existing_ids: &HashSet<LoanTransactionId>,
        existing_reversed_ids: &HashSet<LoanTransactionId>,
        is_account_transfer: bool,
    ) -> AccountingBridgeData {
        let new_loan_transactions = self
            .transactions
            .iter()
            .filter(|t| {
                !existing_ids.contains(&t.id()) || (t.is_reversed() && !existing_reversed_ids.contains(&t.id()))
            })
            .map(LoanTransactionBridgeData::from)
            .collect();
        self.bridge_with(self.terms.accounting_rule, is_account_transfer, new_loan_transactions)
    }

    pub(crate) fn bridge_with(
        &self,
        accounting_rule: AccountingRule,
        is_account_transfer: bool,
        transactions: Vec<LoanTransactionBridgeData>,
    ) -> AccountingBridgeData {
        AccountingBridgeData::new(
            self.id,
            self.terms.product_id,
            self.office_id,
            self.terms.currency.code,
            accounting_rule,
            is_account_transfer,
            false,
            transactions,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::loan::product::{AmortizationMethod, InterestMethod};
    use loanbook_shared::types::{ChargeId, CurrencyCode};
    use rust_decimal_macros::dec;

    pub(crate) fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    pub(crate) fn terms(accounting_rule: AccountingRule) -> LoanProductTerms {
        LoanProductTerms {
            product_id: LoanProductId::new(),
            currency: MonetaryCurrency::new(CurrencyCode::new("USD").unwrap(), 2),
            principal: dec!(10000),
            number_of_repayments: 10,
            repayment_every_months: 1,
            interest_rate_per_period: dec!(1),
            interest_method: InterestMethod::DecliningBalance,
            amortization_method: AmortizationMethod::EqualInstallments,
            accounting_rule,
            interest_recalculation_enabled: false,
        }
    }

    pub(crate) fn application(accounting_rule: AccountingRule) -> LoanApplication {
        LoanApplication {
            account_no: "000000001".into(),
            external_id: None,
            office_id: OfficeId::new(),
            client: Some(ClientRef {
                id: ClientId::new(),
                active: true,
            }),
            group: None,
            loan_type: LoanType::Individual,
            terms: terms(accounting_rule),
            submitted_on: date(1, 1),
            expected_disbursement_on: date(1, 1),
            charges: Vec::new(),
        }
    }

    /// Approved and disbursed on 2024-01-01.
    pub(crate) fn active_loan(accounting_rule: AccountingRule) -> Loan {
        let mut loan = Loan::submit(application(accounting_rule)).unwrap();
        loan.approve(date(1, 1)).unwrap();
        loan.disburse(date(1, 1), None, None, date(1, 1)).unwrap();
        loan
    }

    /// Active loan with every installment's principal collected and interest
    /// settled on installments starting before `from`.
    pub(crate) fn principal_settled_loan(from: NaiveDate) -> Loan {
        let mut loan = active_loan(AccountingRule::None);
        for installment in &mut loan.installments {
            installment.principal_completed = installment.principal;
            if installment.from_date < from {
                installment.interest_paid = installment.interest_charged;
            }
        }
        loan
    }

    pub(crate) fn money(loan: &Loan, amount: Decimal) -> Money {
        Money::of(loan.currency(), amount)
    }

    #[test]
    fn test_lifecycle_to_active() {
        let loan = active_loan(AccountingRule::None);
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.installments().len(), 10);
        assert_eq!(loan.principal_outstanding(), dec!(10000));
        assert_eq!(loan.transactions().len(), 1);
        assert_eq!(loan.transactions()[0].outstanding_loan_balance(), Some(dec!(10000)));
    }

    #[test]
    fn test_submit_validations() {
        let mut app = application(AccountingRule::None);
        app.account_no = "  ".into();
        assert_eq!(Loan::submit(app).unwrap_err().parameter(), Some("accountNo"));

        let mut app = application(AccountingRule::None);
        app.expected_disbursement_on = date(1, 1).pred_opt().unwrap();
        assert_eq!(
            Loan::submit(app).unwrap_err().parameter(),
            Some("expectedDisbursementDate")
        );
    }

    #[test]
    fn test_reject_and_withdraw_from_approved() {
        let mut loan = Loan::submit(application(AccountingRule::None)).unwrap();
        loan.approve(date(1, 1)).unwrap();
        loan.withdraw(date(1, 2)).unwrap();
        assert_eq!(loan.status(), LoanStatus::WithdrawnByClient);
        assert!(loan.disburse(date(1, 3), None, None, date(1, 3)).is_err());

        let mut loan = Loan::submit(application(AccountingRule::None)).unwrap();
        loan.reject(date(1, 2)).unwrap();
        assert_eq!(loan.status(), LoanStatus::Rejected);
        assert_eq!(loan.closed_on(), Some(date(1, 2)));
    }

    #[test]
    fn test_disburse_in_future_is_rejected() {
        let mut loan = Loan::submit(application(AccountingRule::None)).unwrap();
        loan.approve(date(1, 1)).unwrap();
        let err = loan.disburse(date(1, 5), None, None, date(1, 2)).unwrap_err();
        assert!(matches!(err, LoanError::TransactionDateInFuture { .. }));
        assert_eq!(loan.status(), LoanStatus::Approved);
    }

    #[test]
    fn test_charges_land_in_schedule() {
        let mut app = application(AccountingRule::None);
        app.charges = vec![
            LoanCharge::specified_due_date(ChargeId::new(), "fee", dec!(15), date(2, 20), false),
            LoanCharge::disbursement(ChargeId::new(), "processing", dec!(50)),
        ];
        let mut loan = Loan::submit(app).unwrap();
        loan.approve(date(1, 1)).unwrap();
        loan.disburse(date(1, 1), None, None, date(1, 1)).unwrap();

        assert_eq!(loan.installments()[1].fee_charges_charged, dec!(15));
        assert_eq!(loan.charges()[1].due_date(), Some(date(1, 1)));

        let penalty = LoanCharge::specified_due_date(ChargeId::new(), "late", dec!(5), date(1, 15), true);
        loan.add_charge(penalty).unwrap();
        assert_eq!(loan.installments()[0].penalty_charges_charged, dec!(5));
    }

    #[test]
    fn test_age_of_overdue_days() {
        let loan = active_loan(AccountingRule::None);
        assert_eq!(loan.age_of_overdue_days(date(2, 1)), 0);
        assert_eq!(loan.age_of_overdue_days(date(2, 11)), 10);
    }

    #[test]
    fn test_bridge_contains_only_new_transactions() {
        let mut loan = active_loan(AccountingRule::Cash);
        let existing = loan.existing_transaction_ids();
        let reversed = loan.existing_reversed_transaction_ids();

        let repayment = LoanTransaction::repayment(loan.loan_ref(), money(&loan, dec!(500)), None, date(1, 20), None)
            .unwrap();
        let repayment_id = repayment.id();
        loan.make_repayment(repayment, None, date(1, 20), false).unwrap();

        let bridge = loan.derive_accounting_bridge_data(&existing, &reversed, false);
        assert!(bridge.cash_based_accounting_enabled);
        assert_eq!(bridge.new_loan_transactions.len(), 1);
        assert_eq!(bridge.new_loan_transactions[0].id, repayment_id);
    }
}
