//! Loan servicing schema.
//!
//! Creates the loan, schedule, charge and transaction tables together with
//! the tables the servicing layer touches on the side: notes, account
//! transfers, standing instructions and post-dated checks. Unique constraints
//! carry the names the integrity translation matches on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: LOAN AND SCHEDULE
        // ============================================================
        db.execute_unprepared(LOAN_SQL).await?;
        db.execute_unprepared(SCHEDULE_SQL).await?;
        db.execute_unprepared(CHARGE_SQL).await?;

        // ============================================================
        // PART 2: TRANSACTIONS
        // ============================================================
        db.execute_unprepared(TRANSACTION_SQL).await?;
        db.execute_unprepared(TRANSACTION_DETAIL_SQL).await?;

        // ============================================================
        // PART 3: SIDE TABLES
        // ============================================================
        db.execute_unprepared(SIDE_TABLES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const LOAN_SQL: &str = r"
CREATE TABLE m_loan (
    id UUID PRIMARY KEY,
    account_no VARCHAR(20) NOT NULL,
    external_id VARCHAR(100),
    office_id UUID NOT NULL,
    client_id UUID,
    group_id UUID,
    loan_type SMALLINT NOT NULL,
    product_id UUID NOT NULL,
    currency_code CHAR(3) NOT NULL,
    currency_digits SMALLINT NOT NULL,
    principal_amount NUMERIC(19,6) NOT NULL,
    number_of_repayments INTEGER NOT NULL,
    repay_every INTEGER NOT NULL,
    nominal_interest_rate_per_period NUMERIC(19,6) NOT NULL,
    interest_method SMALLINT NOT NULL,
    amortization_method SMALLINT NOT NULL,
    accounting_rule SMALLINT NOT NULL,
    interest_recalculation_enabled BOOLEAN NOT NULL DEFAULT FALSE,
    loan_status_id SMALLINT NOT NULL,
    loan_sub_status_id SMALLINT,
    submittedon_date DATE NOT NULL,
    expected_disbursedon_date DATE NOT NULL,
    approvedon_date DATE,
    disbursedon_date DATE,
    closedon_date DATE,
    writtenoffon_date DATE,
    accrued_till DATE,
    interest_calculated_from DATE,
    version BIGINT NOT NULL DEFAULT 0,
    CONSTRAINT loan_account_no_unique UNIQUE (account_no),
    CONSTRAINT uq_loan_external_key UNIQUE (external_id),
    CONSTRAINT chk_loan_party CHECK (client_id IS NOT NULL OR group_id IS NOT NULL)
);

-- Periodic accrual runs scan active loans by accounting rule
CREATE INDEX idx_loan_accrual ON m_loan(accounting_rule, loan_status_id);
";

const SCHEDULE_SQL: &str = r"
CREATE TABLE m_loan_repayment_schedule (
    id BIGSERIAL PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    installment INTEGER NOT NULL,
    fromdate DATE NOT NULL,
    duedate DATE NOT NULL,
    principal_amount NUMERIC(19,6) NOT NULL DEFAULT 0,
    principal_completed_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    principal_writtenoff_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    interest_amount NUMERIC(19,6) NOT NULL DEFAULT 0,
    interest_completed_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    interest_waived_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    interest_writtenoff_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    accrual_interest_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    fee_charges_amount NUMERIC(19,6) NOT NULL DEFAULT 0,
    fee_charges_completed_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    fee_charges_waived_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    fee_charges_writtenoff_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    accrual_fee_charges_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    penalty_charges_amount NUMERIC(19,6) NOT NULL DEFAULT 0,
    penalty_charges_completed_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    penalty_charges_waived_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    penalty_charges_writtenoff_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    accrual_penalty_charges_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    obligations_met_on_date DATE,
    completed_derived BOOLEAN NOT NULL DEFAULT FALSE,
    CONSTRAINT uq_schedule_installment UNIQUE (loan_id, installment)
);
";

const CHARGE_SQL: &str = r"
CREATE TABLE m_loan_charge (
    id UUID PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    charge_id UUID NOT NULL,
    is_penalty BOOLEAN NOT NULL DEFAULT FALSE,
    charge_time_enum SMALLINT NOT NULL,
    due_for_collection_as_of_date DATE,
    amount NUMERIC(19,6) NOT NULL,
    amount_paid_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    amount_waived_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    amount_writtenoff_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    amount_accrued_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    amount_unrecognized_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    is_paid_derived BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE INDEX idx_loan_charge_loan ON m_loan_charge(loan_id);
";

const TRANSACTION_SQL: &str = r"
CREATE TABLE m_loan_transaction (
    id UUID PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    office_id UUID NOT NULL,
    payment_detail_id UUID,
    payment_type_id UUID,
    transaction_type_enum SMALLINT NOT NULL,
    transaction_date DATE NOT NULL,
    submitted_on TIMESTAMPTZ NOT NULL DEFAULT now(),
    amount NUMERIC(19,6) NOT NULL,
    principal_portion_derived NUMERIC(19,6),
    interest_portion_derived NUMERIC(19,6),
    fee_charges_portion_derived NUMERIC(19,6),
    penalty_charges_portion_derived NUMERIC(19,6),
    overpayment_portion_derived NUMERIC(19,6),
    unrecognized_income_portion NUMERIC(19,6),
    outstanding_loan_balance_derived NUMERIC(19,6),
    is_reversed BOOLEAN NOT NULL DEFAULT FALSE,
    reversed_on_date DATE,
    reversal_external_id VARCHAR(100),
    external_id VARCHAR(100),
    manually_adjusted_or_reversed BOOLEAN NOT NULL DEFAULT FALSE,
    charge_refund_charge_type VARCHAR(1),
    CONSTRAINT external_id_unique UNIQUE (external_id),
    CONSTRAINT reversal_external_id_unique UNIQUE (reversal_external_id),
    CONSTRAINT chk_reversal_date CHECK (NOT is_reversed OR reversed_on_date IS NOT NULL),
    CONSTRAINT chk_charge_refund_type CHECK (charge_refund_charge_type IN ('F', 'P'))
);

-- Replay and balance queries walk a loan's transactions in date order
CREATE INDEX idx_loan_transaction_loan ON m_loan_transaction(loan_id, transaction_date, submitted_on);
";

const TRANSACTION_DETAIL_SQL: &str = r"
CREATE TABLE m_loan_charge_paid_by (
    id BIGSERIAL PRIMARY KEY,
    loan_transaction_id UUID NOT NULL REFERENCES m_loan_transaction(id) ON DELETE CASCADE,
    loan_charge_id UUID NOT NULL,
    charge_id UUID NOT NULL,
    amount NUMERIC(19,6) NOT NULL,
    installment_number INTEGER,
    is_penalty BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX idx_charge_paid_by_transaction ON m_loan_charge_paid_by(loan_transaction_id);

CREATE TABLE m_loan_transaction_repayment_schedule_mapping (
    id BIGSERIAL PRIMARY KEY,
    loan_transaction_id UUID NOT NULL REFERENCES m_loan_transaction(id) ON DELETE CASCADE,
    installment_number INTEGER NOT NULL,
    principal_portion_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    interest_portion_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    fee_charges_portion_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    penalty_charges_portion_derived NUMERIC(19,6) NOT NULL DEFAULT 0,
    amount NUMERIC(19,6) NOT NULL DEFAULT 0
);

CREATE INDEX idx_schedule_mapping_transaction
    ON m_loan_transaction_repayment_schedule_mapping(loan_transaction_id);

CREATE TABLE m_loan_transaction_relation (
    id BIGSERIAL PRIMARY KEY,
    from_loan_transaction_id UUID NOT NULL REFERENCES m_loan_transaction(id) ON DELETE CASCADE,
    to_loan_transaction_id UUID NOT NULL REFERENCES m_loan_transaction(id),
    relation_type_enum SMALLINT NOT NULL
);

CREATE INDEX idx_transaction_relation_from ON m_loan_transaction_relation(from_loan_transaction_id);
";

const SIDE_TABLES_SQL: &str = r"
CREATE TABLE m_note (
    id UUID PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    loan_transaction_id UUID REFERENCES m_loan_transaction(id),
    note TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE m_account_transfer_transaction (
    id UUID PRIMARY KEY,
    from_loan_transaction_id UUID REFERENCES m_loan_transaction(id),
    to_loan_transaction_id UUID REFERENCES m_loan_transaction(id),
    amount NUMERIC(19,6) NOT NULL,
    is_reversed BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE m_account_transfer_standing_instructions (
    id UUID PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    status SMALLINT NOT NULL DEFAULT 1
);

CREATE INDEX idx_standing_instructions_loan ON m_account_transfer_standing_instructions(loan_id);

CREATE TABLE m_postdated_checks (
    id UUID PRIMARY KEY,
    loan_id UUID NOT NULL REFERENCES m_loan(id) ON DELETE CASCADE,
    repayment_installment INTEGER NOT NULL,
    amount NUMERIC(19,6) NOT NULL,
    status SMALLINT NOT NULL DEFAULT 1,
    CONSTRAINT uq_postdated_check_installment UNIQUE (loan_id, repayment_installment)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS m_postdated_checks CASCADE;
DROP TABLE IF EXISTS m_account_transfer_standing_instructions CASCADE;
DROP TABLE IF EXISTS m_account_transfer_transaction CASCADE;
DROP TABLE IF EXISTS m_note CASCADE;
DROP TABLE IF EXISTS m_loan_transaction_relation CASCADE;
DROP TABLE IF EXISTS m_loan_transaction_repayment_schedule_mapping CASCADE;
DROP TABLE IF EXISTS m_loan_charge_paid_by CASCADE;
DROP TABLE IF EXISTS m_loan_transaction CASCADE;
DROP TABLE IF EXISTS m_loan_charge CASCADE;
DROP TABLE IF EXISTS m_loan_repayment_schedule CASCADE;
DROP TABLE IF EXISTS m_loan CASCADE;
";
