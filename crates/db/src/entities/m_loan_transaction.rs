//! `SeaORM` Entity for m_loan_transaction table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "m_loan_transaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub loan_id: Uuid,
    pub office_id: Uuid,
    pub payment_detail_id: Option<Uuid>,
    pub payment_type_id: Option<Uuid>,
    pub transaction_type_enum: i16,
    pub transaction_date: Date,
    pub submitted_on: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub principal_portion_derived: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub interest_portion_derived: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub fee_charges_portion_derived: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub penalty_charges_portion_derived: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub overpayment_portion_derived: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub unrecognized_income_portion: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub outstanding_loan_balance_derived: Option<Decimal>,
    pub is_reversed: bool,
    pub reversed_on_date: Option<Date>,
    #[sea_orm(unique)]
    pub reversal_external_id: Option<String>,
    #[sea_orm(unique)]
    pub external_id: Option<String>,
    pub manually_adjusted_or_reversed: bool,
    pub charge_refund_charge_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::m_loan_charge_paid_by::Entity")]
    ChargePaidBy,
    #[sea_orm(has_many = "super::m_loan_transaction_repayment_schedule_mapping::Entity")]
    ScheduleMapping,
}

impl Related<super::m_loan_charge_paid_by::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePaidBy.def()
    }
}

impl Related<super::m_loan_transaction_repayment_schedule_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduleMapping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
