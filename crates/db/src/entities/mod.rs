//! `SeaORM` entities for the loan transaction tables.

pub mod m_loan_charge_paid_by;
pub mod m_loan_transaction;
pub mod m_loan_transaction_relation;
pub mod m_loan_transaction_repayment_schedule_mapping;
