//! `SeaORM` Entity for m_loan_transaction_repayment_schedule_mapping table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m_loan_transaction_repayment_schedule_mapping")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub loan_transaction_id: Uuid,
    pub installment_number: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub principal_portion_derived: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub interest_portion_derived: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub fee_charges_portion_derived: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub penalty_charges_portion_derived: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::m_loan_transaction::Entity",
        from = "Column::LoanTransactionId",
        to = "super::m_loan_transaction::Column::Id"
    )]
    LoanTransaction,
}

impl Related<super::m_loan_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
