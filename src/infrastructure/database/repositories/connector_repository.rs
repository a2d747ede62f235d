//! SeaORM implementation of ConnectorRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{Connector, ConnectorRepository, ConnectorStatus, DomainError, DomainResult};
use crate::infrastructure::database::entities::connector;

pub struct SeaOrmConnectorRepository {
    db: DatabaseConnection,
}

impl SeaOrmConnectorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn connector_from_model(model: connector::Model) -> Connector {
    Connector {
        id: model.id,
        charge_point_id: model.charge_point_id,
        connector_id: model.connector_id as u32,
        status: ConnectorStatus::from(model.status.as_str()),
        error_code: model.error_code,
        info: model.info,
        vendor_id: model.vendor_id,
        vendor_error_code: model.vendor_error_code,
        updated_at: model.updated_at,
    }
}

fn active_model(c: Connector) -> connector::ActiveModel {
    connector::ActiveModel {
        id: NotSet,
        charge_point_id: Set(c.charge_point_id),
        connector_id: Set(c.connector_id as i32),
        status: Set(c.status.as_str().to_string()),
        error_code: Set(c.error_code),
        info: Set(c.info),
        vendor_id: Set(c.vendor_id),
        vendor_error_code: Set(c.vendor_error_code),
        updated_at: Set(c.updated_at),
    }
}

#[async_trait]
impl ConnectorRepository for SeaOrmConnectorRepository {
    async fn insert(&self, c: Connector) -> DomainResult<Connector> {
        debug!(
            "Inserting connector {} for charge point {}",
            c.connector_id, c.charge_point_id
        );
        let model = active_model(c).insert(&self.db).await?;
        Ok(connector_from_model(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Connector>> {
        let model = connector::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(connector_from_model))
    }

    async fn find_by_charge_point_and_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        let model = connector::Entity::find()
            .filter(connector::Column::ChargePointId.eq(charge_point_id))
            .filter(connector::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await?;
        Ok(model.map(connector_from_model))
    }

    async fn update(&self, c: Connector) -> DomainResult<()> {
        debug!("Updating connector {} ({})", c.id, c.status);

        let existing = connector::Entity::find_by_id(c.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Connector", "id", c.id))?;
        if (existing.charge_point_id, existing.connector_id) != (c.charge_point_id, c.connector_id as i32)
        {
            return Err(DomainError::Validation(format!(
                "connector {} cannot be moved",
                c.id
            )));
        }

        let mut model = active_model(c);
        model.id = Set(existing.id);
        model.update(&self.db).await?;
        Ok(())
    }

    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Connector>> {
        let models = connector::Entity::find()
            .filter(connector::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(connector::Column::ConnectorId)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(connector_from_model).collect())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = connector::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Connector", "id", id));
        }
        Ok(())
    }
}
