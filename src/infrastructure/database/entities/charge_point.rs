//! ChargePoint entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "charge_points")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Identity from the connection path (e.g. "CP001")
    #[sea_orm(unique)]
    pub code: String,

    pub vendor: String,
    pub model: String,

    #[sea_orm(nullable)]
    pub charge_point_serial_number: Option<String>,

    #[sea_orm(nullable)]
    pub charge_box_serial_number: Option<String>,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,

    #[sea_orm(nullable)]
    pub iccid: Option<String>,

    #[sea_orm(nullable)]
    pub imsi: Option<String>,

    #[sea_orm(nullable)]
    pub meter_type: Option<String>,

    #[sea_orm(nullable)]
    pub meter_serial_number: Option<String>,

    /// Available, Occupied, Faulted, Unavailable, Reserved
    pub status: String,

    #[sea_orm(nullable)]
    pub last_heartbeat: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub last_boot_notification: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::connector::Entity")]
    Connectors,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::connector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connectors.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
