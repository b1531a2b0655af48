//! `SeaORM` Entity for m_loan_charge_paid_by table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m_loan_charge_paid_by")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub loan_transaction_id: Uuid,
    pub loan_charge_id: Uuid,
    pub charge_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub amount: Decimal,
    pub installment_number: Option<i32>,
    pub is_penalty: bool,
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
