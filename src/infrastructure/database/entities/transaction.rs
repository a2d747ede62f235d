//! Transaction entity with billing fields

use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Failed")]
    Failed,
    #[sea_orm(string_value = "Pending")]
    Pending,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Protocol-visible id, copied from `id` on insert
    pub transaction_id: i32,

    pub charge_point_id: i32,
    pub connector_id: i32,
    pub id_tag_id: i32,
    pub id_tag: String,

    /// Register reading at start (Wh)
    pub start_meter_value: f64,

    #[sea_orm(nullable)]
    pub stop_meter_value: Option<f64>,

    pub current_meter_value: f64,
    pub energy_consumed: f64,

    /// Decimal cost, stored as text to keep it exact
    pub total_cost: String,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub stop_time: Option<DateTimeUtc>,

    pub status: TransactionStatus,

    /// Reason for stopping: EmergencyStop, EVDisconnected, HardReset, Local,
    /// Other, PowerLoss, Reboot, Remote, SoftReset, UnlockCommand, DeAuthorized
    #[sea_orm(nullable)]
    pub reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charge_point::Entity",
        from = "Column::ChargePointId",
        to = "super::charge_point::Column::Id"
    )]
    ChargePoint,
}

impl Related<super::charge_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargePoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
