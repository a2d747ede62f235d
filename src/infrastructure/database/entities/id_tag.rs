//! IdTag entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// IdTag status
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum IdTagStatus {
    #[sea_orm(string_value = "Accepted")]
    Accepted,
    #[sea_orm(string_value = "Blocked")]
    Blocked,
    #[sea_orm(string_value = "Expired")]
    Expired,
    #[sea_orm(string_value = "Invalid")]
    Invalid,
    #[sea_orm(string_value = "ConcurrentTx")]
    ConcurrentTx,
}

/// IdTag model - RFID cards/tokens presented for authorization
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "id_tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The tag value (RFID card number)
    #[sea_orm(unique)]
    pub tag: String,

    /// Parent ID tag (for group authorization)
    pub parent_id_tag: Option<String>,

    pub status: IdTagStatus,

    /// Owning user, managed outside this service
    pub user_id: Option<i32>,

    pub expiry_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
