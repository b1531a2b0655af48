//! Loanbook simulator.
//!
//! Runs a scripted loan through the servicing engine against the in-memory
//! store and prints the final loan plus every command result as JSON:
//! submission, approval, disbursement, two repayments, a back-dated repayment
//! that forces a replay, an interest waiver and a periodic accrual run.
//!
//! Configuration is read from `config/default.toml` and `LOANBOOK__*`
//! variables; `servicing.business_date` pins the business date, which
//! otherwise defaults to the end of the script.

mod collaborators;

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use loanbook_core::loan::{
    AccountingRule, AmortizationMethod, ClientRef, Holiday, InterestMethod, Loan, LoanApplication, LoanProductTerms,
    LoanType,
};
use loanbook_core::servicing::{
    Collaborators, CommandProcessingResult, DisburseLoanCommand, InMemoryLoanStore, LoanAccountDomainService,
    LoanActionCommand, LoanRepository, RepaymentCommand, WaiveInterestCommand,
};
use loanbook_core::transaction::LoanTransactionType;
use loanbook_shared::AppConfig;
use loanbook_shared::types::{ClientId, ExternalId, LoanId, LoanProductId, OfficeId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collaborators::{LoggingDelinquency, LoggingEvents, LoggingJournal, ScriptedDate, StaticCalendar};

fn date(y: i32, m: u32, d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("invalid date {y}-{m}-{d}"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Step {
    name: &'static str,
    result: CommandProcessingResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    business_date: NaiveDate,
    steps: Vec<Step>,
    journal_batches: usize,
    loan: Loan,
}

fn repayment(loan_id: LoanId, amount: Decimal, on: NaiveDate, external_id: &str) -> RepaymentCommand {
    RepaymentCommand {
        loan_id,
        transaction_type: LoanTransactionType::Repayment,
        transaction_amount: amount,
        transaction_date: on,
        external_id: ExternalId::parse(external_id),
        payment_detail: None,
        charge_refund_charge_type: None,
        note: None,
        is_account_transfer: false,
        is_loan_to_loan_transfer: false,
        is_holiday_validation_done: false,
    }
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "loanbook=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    let business_date = match config.servicing.business_date {
        Some(pinned) => pinned,
        None => date(2024, 6, 3)?,
    };
    let currency = config.currency("USD")?;

    // Wire the engine
    let journal = Arc::new(LoggingJournal::default());
    let collaborators = Collaborators {
        journal: journal.clone(),
        delinquency: Arc::new(LoggingDelinquency),
        calendar: Arc::new(StaticCalendar::new(vec![Holiday {
            name: "Independence Day".into(),
            from_date: date(2024, 7, 4)?,
            to_date: date(2024, 7, 4)?,
        }])),
        business_dates: Arc::new(ScriptedDate(business_date)),
    };
    let service = LoanAccountDomainService::new(InMemoryLoanStore::new(), collaborators, config.servicing.clone());
    let store = service.store();
    let events = LoggingEvents;
    let mut steps = Vec::new();

    // 1. Application
    let application = LoanApplication {
        account_no: "000000001".into(),
        external_id: ExternalId::parse("sim-loan-1"),
        office_id: OfficeId::new(),
        client: Some(ClientRef {
            id: ClientId::new(),
            active: true,
        }),
        group: None,
        loan_type: LoanType::Individual,
        terms: LoanProductTerms {
            product_id: LoanProductId::new(),
            currency,
            principal: dec!(10000),
            number_of_repayments: 10,
            repayment_every_months: 1,
            interest_rate_per_period: dec!(1),
            interest_method: InterestMethod::DecliningBalance,
            amortization_method: AmortizationMethod::EqualInstallments,
            accounting_rule: AccountingRule::AccrualPeriodic,
            interest_recalculation_enabled: false,
        },
        submitted_on: date(2024, 1, 1)?,
        expected_disbursement_on: date(2024, 1, 2)?,
        charges: Vec::new(),
    };
    let submitted = store.in_transaction(|_| service.submit_application(application))?;
    let loan_id = submitted.loan_id.context("submission returned no loan id")?;
    steps.push(Step {
        name: "submit",
        result: submitted,
    });

    // 2. Approval and disbursement
    let approval = LoanActionCommand {
        loan_id,
        action_date: date(2024, 1, 2)?,
        note: Some("approved by credit committee".into()),
    };
    steps.push(Step {
        name: "approve",
        result: store.in_transaction(|_| service.approve_application(approval, &events))?,
    });
    let disbursal = DisburseLoanCommand {
        loan_id,
        actual_disbursement_date: date(2024, 1, 2)?,
        external_id: ExternalId::parse("sim-disb-1"),
        payment_detail: None,
        note: None,
    };
    steps.push(Step {
        name: "disburse",
        result: store.in_transaction(|_| service.disburse_loan(disbursal, &events))?,
    });

    // 3. Repayments, the last one back-dated behind the second
    for (name, amount, on, external_id) in [
        ("repay-february", dec!(1055.82), date(2024, 2, 2)?, "sim-rcpt-1"),
        ("repay-april", dec!(1500), date(2024, 4, 2)?, "sim-rcpt-2"),
        ("repay-march-late-entry", dec!(1055.82), date(2024, 3, 4)?, "sim-rcpt-3"),
    ] {
        let command = repayment(loan_id, amount, on, external_id);
        steps.push(Step {
            name,
            result: store.in_transaction(|_| service.make_repayment(command, &events))?,
        });
    }

    // 4. Waiver and periodic accrual
    let waiver = WaiveInterestCommand {
        loan_id,
        transaction_amount: dec!(20),
        transaction_date: date(2024, 5, 2)?,
        external_id: None,
        note: Some("goodwill".into()),
    };
    steps.push(Step {
        name: "waive-interest",
        result: store.in_transaction(|_| service.waive_interest(waiver, &events))?,
    });
    // Each loan accrues under its own savepoint; the batch is not one unit of work
    let accrued = service.run_periodic_accruals(business_date, &events)?;
    info!(loans = accrued.len(), "accrual run complete");

    // 5. Report
    let loan = store
        .find_loan(loan_id)
        .map_err(loanbook_core::servicing::translate)?
        .context("loan disappeared from the store")?;
    let report = Report {
        business_date,
        steps,
        journal_batches: journal.batches(),
        loan,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
