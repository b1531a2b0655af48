//! `SeaORM` Entity for m_loan_transaction_relation table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m_loan_transaction_relation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_loan_transaction_id: Uuid,
    pub to_loan_transaction_id: Uuid,
    pub relation_type_enum: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::m_loan_transaction::Entity",
        from = "Column::FromLoanTransactionId",
        to = "super::m_loan_transaction::Column::Id"
    )]
    FromTransaction,
}

impl ActiveModelBehavior for ActiveModel {}
