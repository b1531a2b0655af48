//! Loan transaction writer.
//!
//! Writes a transaction row together with its charge allocations, installment
//! mappings and relations in one database transaction, so a unique violation
//! on any of them leaves nothing behind.

use chrono::NaiveDate;
use loanbook_core::StoreError;
use loanbook_core::transaction::{ChargeRefundChargeType, LoanTransaction};
use loanbook_shared::types::{ExternalId, LoanTransactionId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::entities::{
    m_loan_charge_paid_by, m_loan_transaction, m_loan_transaction_relation,
    m_loan_transaction_repayment_schedule_mapping,
};
use crate::error::store_error;

/// Persisted code of a charge refund bucket.
#[must_use]
pub const fn charge_refund_code(charge_type: ChargeRefundChargeType) -> &'static str {
    match charge_type {
        ChargeRefundChargeType::Fee => "F",
        ChargeRefundChargeType::Penalty => "P",
    }
}

fn narrow<T: TryFrom<U>, U: Copy + std::fmt::Display>(value: U, column: &str) -> Result<T, StoreError> {
    T::try_from(value).map_err(|_| StoreError::Backend(format!("{column} value {value} out of range")))
}

/// Loan transaction writer.
#[derive(Debug, Clone)]
pub struct LoanTransactionWriter {
    db: DatabaseConnection,
}

impl LoanTransactionWriter {
    /// Creates a new writer.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a transaction with its allocations and relations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UniqueViolation` naming the constraint when the
    /// external id or reversal external id is taken, or another store error
    /// if the database operation fails.
    pub async fn insert(&self, transaction: &LoanTransaction) -> Result<m_loan_transaction::Model, StoreError> {
        // 1. Start database transaction
        let txn = self.db.begin().await.map_err(|e| store_error(&e))?;

        // 2. Header row, then the rows hanging off it
        let model = Self::insert_header(&txn, transaction).await?;
        Self::insert_charges_paid(&txn, transaction).await?;
        Self::insert_mappings(&txn, transaction).await?;
        Self::insert_relations(&txn, transaction).await?;

        // 3. Commit
        txn.commit().await.map_err(|e| store_error(&e))?;

        debug!(
            transaction_id = %transaction.id(),
            loan_id = %transaction.loan_id(),
            transaction_type = %transaction.transaction_type(),
            "loan transaction inserted"
        );
        Ok(model)
    }

    /// Marks a stored transaction reversed. The row keeps its external id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UniqueViolation` when the reversal external id
    /// is taken, or another store error if the update fails.
    pub async fn mark_reversed(
        &self,
        id: LoanTransactionId,
        reversed_on: NaiveDate,
        reversal_external_id: Option<&ExternalId>,
    ) -> Result<(), StoreError> {
        self.reverse_row(id, reversed_on, reversal_external_id, false).await
    }

    /// Marks a transaction reversed because a replay replaced it, releasing
    /// its external id for the replacement.
    ///
    /// # Errors
    ///
    /// Returns a store error if the update fails.
    pub async fn mark_replaced(&self, id: LoanTransactionId, reversed_on: NaiveDate) -> Result<(), StoreError> {
        self.reverse_row(id, reversed_on, None, true).await
    }

    async fn reverse_row(
        &self,
        id: LoanTransactionId,
        reversed_on: NaiveDate,
        reversal_external_id: Option<&ExternalId>,
        release_external_id: bool,
    ) -> Result<(), StoreError> {
        let mut row = m_loan_transaction::ActiveModel {
            id: Set(id.into_inner()),
            is_reversed: Set(true),
            reversed_on_date: Set(Some(reversed_on)),
            reversal_external_id: Set(reversal_external_id.map(|e| e.as_str().to_string())),
            manually_adjusted_or_reversed: Set(true),
            ..Default::default()
        };
        if release_external_id {
            row.external_id = Set(None);
        }
        row.update(&self.db).await.map_err(|e| store_error(&e))?;
        debug!(transaction_id = %id, %reversed_on, release_external_id, "loan transaction reversed");
        Ok(())
    }

    /// Finds a transaction row by external id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the database query fails.
    pub async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<m_loan_transaction::Model>, StoreError> {
        m_loan_transaction::Entity::find()
            .filter(m_loan_transaction::Column::ExternalId.eq(external_id.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| store_error(&e))
    }

    async fn insert_header(
        txn: &DatabaseTransaction,
        transaction: &LoanTransaction,
    ) -> Result<m_loan_transaction::Model, StoreError> {
        let payment = transaction.payment_detail();
        let row = m_loan_transaction::ActiveModel {
            id: Set(transaction.id().into_inner()),
            loan_id: Set(transaction.loan_id().into_inner()),
            office_id: Set(transaction.office_id().into_inner()),
            payment_detail_id: Set(payment.map(|p| p.id.into_inner())),
            payment_type_id: Set(payment.and_then(|p| p.payment_type_id).map(|t| t.into_inner())),
            transaction_type_enum: Set(narrow(transaction.transaction_type().code(), "transaction_type_enum")?),
            transaction_date: Set(transaction.transaction_date()),
            submitted_on: Set(transaction.submitted_on().into()),
            amount: Set(transaction.amount()),
            principal_portion_derived: Set(transaction.principal_portion()),
            interest_portion_derived: Set(transaction.interest_portion()),
            fee_charges_portion_derived: Set(transaction.fee_charges_portion()),
            penalty_charges_portion_derived: Set(transaction.penalty_charges_portion()),
            overpayment_portion_derived: Set(transaction.overpayment_portion()),
            unrecognized_income_portion: Set(transaction.unrecognized_income_portion()),
            outstanding_loan_balance_derived: Set(transaction.outstanding_loan_balance()),
            is_reversed: Set(transaction.is_reversed()),
            reversed_on_date: Set(transaction.reversed_on()),
            reversal_external_id: Set(transaction.reversal_external_id().map(|e| e.as_str().to_string())),
            external_id: Set(transaction.external_id().map(|e| e.as_str().to_string())),
            manually_adjusted_or_reversed: Set(transaction.is_manually_adjusted_or_reversed()),
            charge_refund_charge_type: Set(transaction
                .charge_refund_charge_type()
                .map(|c| charge_refund_code(c).to_string())),
        };
        row.insert(txn).await.map_err(|e| store_error(&e))
    }

    async fn insert_charges_paid(txn: &DatabaseTransaction, transaction: &LoanTransaction) -> Result<(), StoreError> {
        for paid in transaction.loan_charges_paid() {
            let installment_number = match paid.installment_number {
                Some(number) => Some(narrow(number, "installment_number")?),
                None => None,
            };
            m_loan_charge_paid_by::ActiveModel {
                loan_transaction_id: Set(transaction.id().into_inner()),
                loan_charge_id: Set(paid.loan_charge_id.into_inner()),
                charge_id: Set(paid.charge_id.into_inner()),
                amount: Set(paid.amount),
                installment_number: Set(installment_number),
                is_penalty: Set(paid.is_penalty),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(|e| store_error(&e))?;
        }
        Ok(())
    }

    async fn insert_mappings(txn: &DatabaseTransaction, transaction: &LoanTransaction) -> Result<(), StoreError> {
        for mapping in transaction.installment_mappings() {
            m_loan_transaction_repayment_schedule_mapping::ActiveModel {
                loan_transaction_id: Set(transaction.id().into_inner()),
                installment_number: Set(narrow(mapping.installment_number, "installment_number")?),
                principal_portion_derived: Set(mapping.principal),
                interest_portion_derived: Set(mapping.interest),
                fee_charges_portion_derived: Set(mapping.fee_charges),
                penalty_charges_portion_derived: Set(mapping.penalty_charges),
                amount: Set(mapping.amount()),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(|e| store_error(&e))?;
        }
        Ok(())
    }

    async fn insert_relations(txn: &DatabaseTransaction, transaction: &LoanTransaction) -> Result<(), StoreError> {
        for relation in transaction.relations() {
            m_loan_transaction_relation::ActiveModel {
                from_loan_transaction_id: Set(transaction.id().into_inner()),
                to_loan_transaction_id: Set(relation.to_transaction_id.into_inner()),
                relation_type_enum: Set(narrow(relation.relation_type.code(), "relation_type_enum")?),
                ..Default::default()
            }
            .insert(txn)
            .await
            .map_err(|e| store_error(&e))?;
        }
        Ok(())
    }
}
