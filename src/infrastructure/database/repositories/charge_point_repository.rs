//! SeaORM implementation of ChargePointRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{
    ChargePoint, ChargePointRepository, ChargePointStatus, DomainError, DomainResult,
};
use crate::infrastructure::database::entities::charge_point;

pub struct SeaOrmChargePointRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargePointRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require(&self, id: i32) -> DomainResult<charge_point::Model> {
        charge_point::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargePoint", "id", id))
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn cp_from_model(model: charge_point::Model) -> ChargePoint {
    ChargePoint {
        id: model.id,
        code: model.code,
        vendor: model.vendor,
        model: model.model,
        charge_point_serial_number: model.charge_point_serial_number,
        charge_box_serial_number: model.charge_box_serial_number,
        firmware_version: model.firmware_version,
        iccid: model.iccid,
        imsi: model.imsi,
        meter_type: model.meter_type,
        meter_serial_number: model.meter_serial_number,
        status: ChargePointStatus::from(model.status.as_str()),
        last_heartbeat: model.last_heartbeat,
        last_boot_notification: model.last_boot_notification,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn active_model(cp: ChargePoint) -> charge_point::ActiveModel {
    charge_point::ActiveModel {
        id: NotSet,
        code: Set(cp.code),
        vendor: Set(cp.vendor),
        model: Set(cp.model),
        charge_point_serial_number: Set(cp.charge_point_serial_number),
        charge_box_serial_number: Set(cp.charge_box_serial_number),
        firmware_version: Set(cp.firmware_version),
        iccid: Set(cp.iccid),
        imsi: Set(cp.imsi),
        meter_type: Set(cp.meter_type),
        meter_serial_number: Set(cp.meter_serial_number),
        status: Set(cp.status.to_string()),
        last_heartbeat: Set(cp.last_heartbeat),
        last_boot_notification: Set(cp.last_boot_notification),
        created_at: Set(cp.created_at),
        updated_at: Set(cp.updated_at),
    }
}

// ── ChargePointRepository impl ──────────────────────────────────

#[async_trait]
impl ChargePointRepository for SeaOrmChargePointRepository {
    async fn insert(&self, cp: ChargePoint) -> DomainResult<ChargePoint> {
        debug!("Inserting charge point: {}", cp.code);
        let model = active_model(cp).insert(&self.db).await?;
        info!("Charge point saved: {} (id {})", model.code, model.id);
        Ok(cp_from_model(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargePoint>> {
        let model = charge_point::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(cp_from_model))
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ChargePoint>> {
        let model = charge_point::Entity::find()
            .filter(charge_point::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        Ok(model.map(cp_from_model))
    }

    async fn update(&self, cp: ChargePoint) -> DomainResult<()> {
        debug!("Updating charge point: {}", cp.code);

        let existing = self.require(cp.id).await?;
        if existing.code != cp.code {
            return Err(DomainError::Validation(format!(
                "charge point {} code is immutable",
                cp.id
            )));
        }

        let mut model = active_model(cp);
        model.id = Set(existing.id);
        model.update(&self.db).await?;
        Ok(())
    }

    async fn update_status(&self, id: i32, status: ChargePointStatus) -> DomainResult<()> {
        debug!("Updating charge point status: {} -> {}", id, status);
        self.require(id).await?;

        let model = charge_point::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn update_heartbeat(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        debug!("Updating heartbeat for charge point {}", id);
        self.require(id).await?;

        let model = charge_point::ActiveModel {
            id: Set(id),
            last_heartbeat: Set(Some(at)),
            updated_at: Set(at),
            ..Default::default()
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = charge_point::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ChargePoint", "id", id));
        }
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        let models = charge_point::Entity::find()
            .order_by_asc(charge_point::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(cp_from_model).collect())
    }
}
